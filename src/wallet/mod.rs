mod types;
mod client;

pub use types::{ConnectionStatus, WalletSession};
pub use client::{LocalWallet, WalletProvider};
