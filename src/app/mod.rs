// module declaration
pub mod core;
pub mod input;
pub mod network;
pub mod preferences;
pub mod ui_state;

// export App and related types
pub use core::App;
pub use input::Control;
pub use preferences::{Preferences, Theme};
pub use ui_state::{InputField, Tab};
