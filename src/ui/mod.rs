// UI module for the DaiShield terminal client
// This module handles all the terminal UI rendering logic

mod animations;
mod dashboard;
mod draw;
mod governance_view;
mod main_view;
mod status_display;
mod utils;
mod vault_view;

// Re-export the public functions
pub use draw::draw;
