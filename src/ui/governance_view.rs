use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use super::status_display::tx_status_line;
use super::utils::{field_line, panel, Palette};
use crate::app::{App, InputField};
use crate::chain::{Proposal, ProposalStatus};
use crate::constants::{MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
use crate::error::Field;
use crate::utils::format_timestamp;

pub fn render(f: &mut Frame, app: &mut App, area: Rect, palette: &Palette) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_proposal_list(f, app, columns[0], palette);
    if app.composing {
        render_compose(f, app, columns[1], palette);
    } else {
        render_details(f, app, columns[1], palette);
    }
}

fn render_proposal_list(f: &mut Frame, app: &mut App, area: Rect, palette: &Palette) {
    let view = app.read(&app.queries.proposals);
    let loading = view.as_ref().map_or(false, |v| v.is_loading);
    let stale = view.as_ref().map_or(false, |v| v.is_error);
    let proposals = view.map(|v| v.proposals().to_vec()).unwrap_or_default();

    let items: Vec<ListItem> = proposals
        .iter()
        .map(|proposal| {
            let gov = &app.governance;
            let marker = if gov.recorded_vote(proposal.id).is_some() {
                "✓"
            } else if gov.can_vote(proposal.id) {
                "◈"
            } else {
                "…"
            };
            ListItem::new(format!("{} #{} {}", marker, proposal.id, proposal.title))
                .style(Style::default().fg(palette.text))
        })
        .collect();

    let title = if loading {
        " PROPOSALS (loading) ".to_string()
    } else if stale {
        " PROPOSALS (stale) ".to_string()
    } else {
        format!(" PROPOSALS ({}) ", proposals.len())
    };
    let list = List::new(items)
        .block(panel(&title, palette.base))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(palette.highlight),
        )
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, area, &mut app.proposals_state);
}

fn tally(proposal: &Proposal) -> String {
    let total = proposal.total_votes();
    let share = |votes: u128| {
        if total == 0 {
            0
        } else {
            votes * 100 / total
        }
    };
    format!(
        "For {} ({}%)  Against {} ({}%)",
        proposal.votes_for,
        share(proposal.votes_for),
        proposal.votes_against,
        share(proposal.votes_against)
    )
}

fn render_details(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let block = panel(" DETAILS ", palette.base);
    let Some(proposal) = app.selected_proposal() else {
        let hint = Paragraph::new("No active proposals. Press C to create one.")
            .style(Style::default().fg(palette.dim))
            .block(block);
        f.render_widget(hint, area);
        return;
    };

    let status = match proposal.status {
        ProposalStatus::Active => "Active",
        ProposalStatus::Closed => "Closed",
    };
    let mut lines = vec![
        Line::from(Span::styled(
            proposal.title.clone(),
            Style::default().fg(palette.highlight).add_modifier(Modifier::BOLD),
        )),
        field_line("Status", status.to_string(), palette),
        field_line("Votes", tally(&proposal), palette),
        field_line("Ends", format_timestamp(proposal.end_time), palette),
        Line::from(""),
    ];

    let width = area.width.saturating_sub(4).max(1) as usize;
    for row in textwrap::wrap(&proposal.description, width) {
        lines.push(Line::from(Span::styled(
            row.into_owned(),
            Style::default().fg(palette.text),
        )));
    }
    lines.push(Line::from(""));

    let gov = &app.governance;
    match (gov.recorded_vote(proposal.id), gov.vote_intent(proposal.id)) {
        (Some(choice), _) => lines.push(field_line("Your vote", choice.to_string(), palette)),
        (None, Some(intent)) => {
            let step = format!("Vote {}", intent.choice);
            lines.push(tx_status_line(&step, Some(&intent.attempt), palette));
        }
        (None, None) => lines.push(Line::from(Span::styled(
            "Press Y to vote for, N to vote against",
            Style::default().fg(palette.dim),
        ))),
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_compose(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(area);

    let gov = &app.governance;
    let error_for = |field: Field| gov.create_error().filter(|err| err.field() == Some(field));
    let field = |input: InputField, which: Field| match (error_for(which), app.focus == Some(input)) {
        (Some(_), focused) => (palette.error, if focused { "█" } else { "" }),
        (None, true) => (palette.highlight, "█"),
        (None, false) => (palette.dim, ""),
    };
    let error_line = |field: Field| {
        error_for(field).map(|err| {
            Line::from(Span::styled(err.to_string(), Style::default().fg(palette.error)))
        })
    };

    let (color, cursor) = field(InputField::Title, Field::Title);
    let heading = format!(" TITLE {}/{} ", gov.title().chars().count(), MAX_TITLE_LEN);
    let mut lines = vec![Line::from(format!("{}{}", gov.title(), cursor))];
    lines.extend(error_line(Field::Title));
    let title = Paragraph::new(lines)
        .style(Style::default().fg(palette.text))
        .block(panel(&heading, color));
    f.render_widget(title, rows[0]);

    let (color, cursor) = field(InputField::Description, Field::Description);
    let width = rows[1].width.saturating_sub(2).max(1) as usize;
    let text = format!("{}{}", gov.description(), cursor);
    let mut wrapped: Vec<Line> = textwrap::wrap(&text, width)
        .into_iter()
        .map(|row| Line::from(row.into_owned()))
        .collect();
    wrapped.extend(error_line(Field::Description));
    let heading = format!(
        " DESCRIPTION {}/{} ",
        gov.description().chars().count(),
        MAX_DESCRIPTION_LEN
    );
    let description = Paragraph::new(wrapped)
        .style(Style::default().fg(palette.text))
        .block(panel(&heading, color));
    f.render_widget(description, rows[1]);

    let status = Paragraph::new(tx_status_line("Create proposal (7 days)", gov.create_attempt(), palette))
        .block(panel(" STATUS ", palette.base));
    f.render_widget(status, rows[2]);
}
