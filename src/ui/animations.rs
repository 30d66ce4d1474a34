use std::time::{SystemTime, UNIX_EPOCH};

const SPINNER_FRAMES: [&str; 4] = ["◐", "◓", "◑", "◒"];
const DOTS_FRAMES: [&str; 4] = ["", ".", "..", "..."];

fn frame_index(period_ms: u128, frames: usize) -> usize {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    ((millis / period_ms) % frames as u128) as usize
}

/// Spinner shown next to transactions that have not settled
pub fn spinner() -> &'static str {
    SPINNER_FRAMES[frame_index(150, SPINNER_FRAMES.len())]
}

pub fn dots() -> &'static str {
    DOTS_FRAMES[frame_index(400, DOTS_FRAMES.len())]
}
