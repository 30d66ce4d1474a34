use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::dashboard::balance_line;
use super::status_display::tx_status_line;
use super::utils::{panel, Palette};
use crate::app::{App, InputField};
use crate::constants::TOKEN_SYMBOL;
use crate::error::{ClientError, ErrorKind, Field};
use crate::orchestrator::{FlowKind, Phase, VaultFlow};

pub fn render(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let Some(kind) = app.active_flow_kind() else {
        return;
    };
    let flow = app.flow(kind);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let inputs = match kind {
        FlowKind::Transfer => 2,
        FlowKind::Deposit | FlowKind::Withdraw => 1,
    };
    let mut constraints = vec![Constraint::Length(4); inputs];
    constraints.push(Constraint::Min(0));
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(columns[0]);

    let field_error = |field: Field| flow.last_error().filter(|err| err.field() == Some(field));
    render_input(
        f,
        &format!(" AMOUNT ({}) ", TOKEN_SYMBOL),
        flow.amount(),
        app.focus == Some(InputField::Amount),
        field_error(Field::Amount),
        left[0],
        palette,
    );
    if kind == FlowKind::Transfer {
        render_input(
            f,
            " RECIPIENT ",
            flow.recipient(),
            app.focus == Some(InputField::Recipient),
            field_error(Field::Recipient),
            left[1],
            palette,
        );
    }
    render_available(f, app, kind, left[inputs], palette);
    render_progress(f, flow, columns[1], palette);
}

fn render_input(
    f: &mut Frame,
    title: &str,
    value: &str,
    focused: bool,
    error: Option<&ClientError>,
    area: Rect,
    palette: &Palette,
) {
    let color = match (error, focused) {
        (Some(_), _) => palette.error,
        (None, true) => palette.highlight,
        (None, false) => palette.dim,
    };
    let cursor = if focused { "█" } else { "" };
    let mut lines = vec![Line::from(Span::styled(
        format!("{}{}", value, cursor),
        Style::default().fg(palette.text),
    ))];
    if let Some(err) = error {
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(palette.error),
        )));
    }
    f.render_widget(Paragraph::new(lines).block(panel(title, color)), area);
}

fn render_available(f: &mut Frame, app: &App, kind: FlowKind, area: Rect, palette: &Palette) {
    let (label, query) = match kind {
        FlowKind::Deposit => ("Wallet balance", &app.queries.token),
        FlowKind::Withdraw | FlowKind::Transfer => ("Vault balance", &app.queries.vault),
    };
    let mut rows = vec![(label, app.read(query))];
    if kind == FlowKind::Deposit {
        rows.push(("Approved for vault", app.read(&app.queries.allowance)));
    }

    let lines: Vec<Line> = rows
        .into_iter()
        .filter_map(|(label, view)| view.map(|view| (label, view)))
        .map(|(label, view)| {
            let mut spans = vec![
                Span::styled(label, Style::default().fg(palette.highlight).add_modifier(Modifier::BOLD)),
                Span::raw(": "),
            ];
            spans.extend(balance_line(&view, TOKEN_SYMBOL, palette).spans);
            Line::from(spans)
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(panel(" AVAILABLE ", palette.base)), area);
}

fn phase_label(flow: &VaultFlow) -> &'static str {
    match (flow.phase(), flow.kind().is_two_step()) {
        (Phase::Idle, true) => "Enter an amount and press Enter to approve",
        (Phase::Idle, false) => "Enter an amount and press Enter to submit",
        (Phase::Authorizing, _) => "Waiting for the approval to confirm",
        (Phase::Authorized, _) => "Approved. Press Enter to deposit",
        (Phase::Acting, _) => "Waiting for the transaction to confirm",
        (Phase::Done, _) => "Done",
    }
}

fn render_progress(f: &mut Frame, flow: &VaultFlow, area: Rect, palette: &Palette) {
    let title = format!(" {} ", flow.kind().label().to_uppercase());
    let mut lines = vec![
        Line::from(Span::styled(
            phase_label(flow),
            Style::default().fg(palette.highlight).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if flow.kind().is_two_step() {
        lines.push(tx_status_line("Step 1: Approve", flow.authorization(), palette));
        lines.push(tx_status_line("Step 2: Deposit", flow.action(), palette));
    } else {
        lines.push(tx_status_line(flow.kind().label(), flow.action(), palette));
    }
    // Field errors are shown under their input
    if let Some(err) = flow.last_error().filter(|err| err.field().is_none()) {
        let color = match err.kind() {
            ErrorKind::Busy => palette.warning,
            _ => palette.error,
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(err.to_string(), Style::default().fg(color))));
    }
    f.render_widget(Paragraph::new(lines).block(panel(&title, palette.base)), area);
}
