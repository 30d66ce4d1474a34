// Basic type definitions for the wallet module

use crate::chain::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Snapshot of the wallet as the client sees it at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSession {
    pub address: Option<Address>,
    pub status: ConnectionStatus,
    pub chain_id: Option<u64>,
}

impl WalletSession {
    pub fn disconnected() -> Self {
        Self {
            address: None,
            status: ConnectionStatus::Disconnected,
            chain_id: None,
        }
    }

    pub fn connected(address: Address, chain_id: u64) -> Self {
        Self {
            address: Some(address),
            status: ConnectionStatus::Connected,
            chain_id: Some(chain_id),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected && self.address.is_some()
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(
            self.status,
            ConnectionStatus::Connecting | ConnectionStatus::Reconnecting
        )
    }
}
