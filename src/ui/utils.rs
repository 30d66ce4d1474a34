use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders},
};

use crate::app::Theme;
use crate::orchestrator::MessageType;
use crate::transactions::TxState;

/// Colors for one theme
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub base: Color,
    pub highlight: Color,
    pub text: Color,
    pub dim: Color,
    pub success: Color,
    pub error: Color,
    pub warning: Color,
}

pub fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            base: Color::Blue,
            highlight: Color::LightBlue,
            text: Color::Black,
            dim: Color::Gray,
            success: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
        },
        Theme::Dark => Palette {
            base: Color::Cyan,
            highlight: Color::LightCyan,
            text: Color::White,
            dim: Color::DarkGray,
            success: Color::LightGreen,
            error: Color::LightRed,
            warning: Color::Yellow,
        },
    }
}

impl Palette {
    pub fn message(&self, message_type: MessageType) -> Color {
        match message_type {
            MessageType::Error => self.error,
            MessageType::Success => self.success,
            MessageType::Info => self.highlight,
        }
    }

    pub fn tx_state(&self, state: TxState) -> Color {
        match state {
            TxState::Unsent => self.dim,
            TxState::Submitted | TxState::Pending => self.warning,
            TxState::Confirmed => self.success,
            TxState::Failed => self.error,
        }
    }
}

pub fn panel(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

/// `label: value` with the label emphasised
pub fn field_line<'a>(label: &'a str, value: String, palette: &Palette) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(palette.highlight).add_modifier(Modifier::BOLD)),
        Span::raw(": "),
        Span::styled(value, Style::default().fg(palette.text)),
    ])
}
