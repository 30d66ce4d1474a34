use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use super::animations::{dots, spinner};
use super::utils::{palette, Palette};
use crate::app::App;
use crate::orchestrator::Attempt;
use crate::utils::shorten_id;
use crate::wallet::ConnectionStatus;

/// One line describing a submitted write: step name, state and hash
pub fn tx_status_line(step: &str, attempt: Option<&Attempt>, palette: &Palette) -> Line<'static> {
    let Some(attempt) = attempt else {
        return Line::from(vec![
            Span::styled(format!("○ {}", step), Style::default().fg(palette.dim)),
        ]);
    };
    let snapshot = attempt.handle.snapshot();
    let marker = if snapshot.state.is_terminal() {
        "●"
    } else {
        spinner()
    };
    let mut spans = vec![
        Span::styled(
            format!("{} {}", marker, step),
            Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            snapshot.state.label().to_uppercase(),
            Style::default().fg(palette.tx_state(snapshot.state)),
        ),
    ];
    if let Some(hash) = &snapshot.hash {
        spans.push(Span::styled(
            format!("  {}", shorten_id(&hash.0)),
            Style::default().fg(palette.dim),
        ));
    }
    if !snapshot.state.is_terminal() {
        let waited = attempt
            .handle
            .created_at()
            .elapsed()
            .map(|d| d.as_secs())
            .unwrap_or(0);
        spans.push(Span::styled(format!("  {}s", waited), Style::default().fg(palette.dim)));
    }
    Line::from(spans)
}

/// Shown while the wallet is connecting or reconnecting
pub fn draw_connecting(f: &mut Frame, app: &App) {
    let palette = palette(app.theme);
    let main_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(palette.base));
    f.render_widget(main_block, f.size());

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(f.size());

    let verb = match app.session.status {
        ConnectionStatus::Reconnecting => "Reconnecting",
        _ => "Connecting",
    };
    let text = vec![
        Line::from(Span::styled(
            format!("{} wallet{}", verb, dots()),
            Style::default().fg(palette.highlight).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Approve the connection in your wallet",
            Style::default().fg(palette.dim),
        )),
    ];
    let paragraph = Paragraph::new(text).alignment(Alignment::Center);
    f.render_widget(paragraph, layout[1]);
}
