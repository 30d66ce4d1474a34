use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::utils::{field_line, panel, Palette};
use crate::app::App;
use crate::constants::{NATIVE_SYMBOL, TOKEN_SYMBOL};
use crate::ledger::{ReadQuery, ReadView};
use crate::utils::format_token_amount;

pub fn render(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
        .split(area);
    let top = halves(rows[0]);
    let middle = halves(rows[1]);

    render_balance(f, app, &app.queries.native, "NATIVE BALANCE", NATIVE_SYMBOL, top[0], palette);
    render_balance(f, app, &app.queries.token, "WALLET BALANCE", TOKEN_SYMBOL, top[1], palette);
    render_balance(f, app, &app.queries.vault, "SHIELDED IN VAULT", TOKEN_SYMBOL, middle[0], palette);
    render_balance(f, app, &app.queries.allowance, "VAULT ALLOWANCE", TOKEN_SYMBOL, middle[1], palette);

    let proposals = app.read(&app.queries.proposals);
    let active = proposals.as_ref().map_or(0, |view| view.proposals().len());
    let overview = vec![
        field_line("Active proposals", active.to_string(), palette),
        field_line("Refresh interval", format!("{}s", app.config.poll_interval.as_secs()), palette),
    ];
    f.render_widget(Paragraph::new(overview).block(panel(" OVERVIEW ", palette.base)), rows[2]);
}

fn halves(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area)
}

fn render_balance(
    f: &mut Frame,
    app: &App,
    query: &Option<ReadQuery>,
    title: &str,
    symbol: &str,
    area: Rect,
    palette: &Palette,
) {
    let block = panel(title, palette.base);
    let line = match app.read(query) {
        None => Line::from(Span::styled("unavailable", Style::default().fg(palette.dim))),
        Some(view) => balance_line(&view, symbol, palette),
    };
    f.render_widget(Paragraph::new(line).block(block), area);
}

pub(super) fn balance_line<'a>(view: &ReadView, symbol: &str, palette: &Palette) -> Line<'a> {
    if view.is_loading {
        return Line::from(Span::styled("loading...", Style::default().fg(palette.dim)));
    }
    let mut spans = vec![Span::styled(
        format!("{} {}", format_token_amount(view.amount()), symbol),
        Style::default().fg(palette.text),
    )];
    if view.is_error {
        spans.push(Span::styled("  ⚠ stale", Style::default().fg(palette.warning)));
    }
    Line::from(spans)
}
