use ratatui::Frame;
use crate::app::App;
use super::{main_view, status_display};

/// Main entry point for UI rendering
/// Shows the connecting screen while the wallet is mid-handshake
pub fn draw(f: &mut Frame, app: &mut App) {
    if app.session.is_transitioning() {
        status_display::draw_connecting(f, app);
    } else {
        main_view::draw_main(f, app);
    }
}
