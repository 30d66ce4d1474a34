use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Tabs},
    Frame,
};

use super::utils::{palette, panel, Palette};
use super::{dashboard, governance_view, vault_view};
use crate::app::{App, Tab};
use crate::constants::{MESSAGE_AREA_MARGIN, MESSAGE_HISTORY};
use crate::utils::shorten_id;

/// Render the main application UI
pub fn draw_main(f: &mut Frame, app: &mut App) {
    let palette = palette(app.theme);

    // Full screen border
    let main_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(palette.base));
    f.render_widget(main_block, f.size());

    let banner_height = if app.config_problems.is_empty() {
        0
    } else {
        app.config_problems.len() as u16 + 2
    };

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),             // Network / title / wallet
            Constraint::Length(3),             // Tabs
            Constraint::Length(banner_height), // Configuration problems
            Constraint::Min(8),                // Current tab
            Constraint::Length(MESSAGE_HISTORY as u16 + 2), // Messages
            Constraint::Length(3),             // Controls
        ])
        .split(f.size());

    render_header(f, app, main_layout[0], &palette);
    render_tabs(f, app, main_layout[1], &palette);
    if banner_height > 0 {
        render_config_banner(f, app, main_layout[2], &palette);
    }

    match app.tab {
        Tab::Dashboard => dashboard::render(f, app, main_layout[3], &palette),
        Tab::Deposit | Tab::Withdraw | Tab::Transfer => {
            vault_view::render(f, app, main_layout[3], &palette)
        }
        Tab::Proposals => governance_view::render(f, app, main_layout[3], &palette),
    }

    render_message_area(f, app, main_layout[4], &palette);
    render_help_controls(f, app, main_layout[5], &palette);
}

fn render_header(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(34),
            Constraint::Percentage(33),
        ])
        .split(area);

    let network_color = if app.on_expected_network() {
        palette.base
    } else {
        palette.warning
    };
    let network = Paragraph::new(format!("NETWORK: {}", app.network_label()))
        .style(Style::default().fg(network_color))
        .alignment(Alignment::Center);
    f.render_widget(network, columns[0]);

    let title = Paragraph::new("╔══╡ DAISHIELD ╞══╗")
        .style(Style::default().fg(palette.base).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(title, columns[1]);

    let wallet = match &app.session.address {
        Some(address) => shorten_id(address.as_str()),
        None => "DISCONNECTED".to_string(),
    };
    let wallet = Paragraph::new(format!("WALLET: {}", wallet))
        .style(Style::default().fg(palette.base))
        .alignment(Alignment::Center);
    f.render_widget(wallet, columns[2]);
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .block(panel("", palette.base))
        .select(app.tab.index())
        .style(Style::default().fg(palette.dim))
        .highlight_style(
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::BOLD),
        )
        .divider("│");
    f.render_widget(tabs, area);
}

fn render_config_banner(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let lines: Vec<Line> = app
        .config_problems
        .iter()
        .map(|problem| Line::from(Span::styled(format!("✗ {}", problem), Style::default().fg(palette.error))))
        .collect();
    let banner = Paragraph::new(lines).block(panel(" CONFIGURATION ", palette.error));
    f.render_widget(banner, area);
}

fn render_message_area(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let message_block = panel(" MESSAGES ", palette.base);

    // Available width minus borders and margins
    let available_width = area.width.saturating_sub(MESSAGE_AREA_MARGIN).max(1) as usize;
    let mut lines: Vec<Line> = Vec::new();
    for notification in &app.messages {
        let style = Style::default().fg(palette.message(notification.message_type));
        for row in textwrap::wrap(&notification.message, available_width) {
            lines.push(Line::from(Span::styled(row.into_owned(), style)));
        }
    }

    // Newest at the bottom; older lines scroll out when the area is full
    let visible = area.height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(visible);
    let message_text = Paragraph::new(lines.split_off(skip))
        .alignment(Alignment::Left)
        .block(message_block);
    f.render_widget(message_text, area);
}

fn key<'a>(k: &'a str, label: &'a str, palette: &Palette) -> Vec<Span<'a>> {
    vec![
        Span::styled(k, Style::default().fg(palette.highlight).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::raw(label),
        Span::raw("   "),
    ]
}

fn render_help_controls(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let mut spans = Vec::new();
    match app.tab {
        Tab::Proposals if app.composing => {
            spans.extend(key("↑↓", "FIELD", palette));
            spans.extend(key("ENTER", "CREATE", palette));
            spans.extend(key("ESC", "CANCEL", palette));
        }
        Tab::Proposals => {
            spans.extend(key("↑↓", "SELECT", palette));
            spans.extend(key("Y", "VOTE FOR", palette));
            spans.extend(key("N", "VOTE AGAINST", palette));
            spans.extend(key("C", "NEW PROPOSAL", palette));
        }
        Tab::Deposit | Tab::Withdraw => {
            spans.extend(key("0-9.", "AMOUNT", palette));
            spans.extend(key("ENTER", "SUBMIT", palette));
        }
        Tab::Transfer => {
            spans.extend(key("↑↓", "FIELD", palette));
            spans.extend(key("ENTER", "SUBMIT", palette));
        }
        Tab::Dashboard => {}
    }
    if !app.composing {
        spans.extend(key("TAB", "NEXT TAB", palette));
        spans.extend(key("R", "REFRESH", palette));
        spans.extend(key("T", "THEME", palette));
        spans.extend(key("Q", "QUIT", palette));
    }

    let help = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(palette.dim))
        .alignment(Alignment::Center)
        .block(panel("", palette.dim));
    f.render_widget(help, area);
}
