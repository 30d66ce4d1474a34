use std::sync::{Mutex, MutexGuard};

use tracing::info;

use super::types::{ConnectionStatus, WalletSession};
use crate::chain::Address;
use crate::error::ClientError;

/// Wallet collaborator: who is signing and on which network
pub trait WalletProvider: Send + Sync {
    fn session(&self) -> WalletSession;

    /// Ask the wallet to move to `chain_id`. The switch is observed through later sessions.
    fn switch_network(&self, chain_id: u64) -> Result<(), ClientError>;
}

/// Wallet kept in process memory, standing in for an injected browser wallet
pub struct LocalWallet {
    session: Mutex<WalletSession>,
    switch_requests: Mutex<Vec<u64>>,
}

impl LocalWallet {
    pub fn new(session: WalletSession) -> Self {
        Self {
            session: Mutex::new(session),
            switch_requests: Mutex::new(Vec::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, WalletSession> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn connect(&self, address: Address, chain_id: u64) {
        info!(%address, chain_id, "wallet connected");
        *self.guard() = WalletSession::connected(address, chain_id);
    }

    #[cfg(test)]
    pub fn disconnect(&self) {
        info!("wallet disconnected");
        *self.guard() = WalletSession::disconnected();
    }

    #[cfg(test)]
    pub fn set_status(&self, status: ConnectionStatus) {
        self.guard().status = status;
    }

    /// Simulates the user picking another network in the wallet UI
    #[cfg(test)]
    pub fn set_chain(&self, chain_id: u64) {
        self.guard().chain_id = Some(chain_id);
    }

    #[cfg(test)]
    pub fn switch_requests(&self) -> Vec<u64> {
        self.switch_requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl WalletProvider for LocalWallet {
    fn session(&self) -> WalletSession {
        self.guard().clone()
    }

    fn switch_network(&self, chain_id: u64) -> Result<(), ClientError> {
        let mut session = self.guard();
        if session.status == ConnectionStatus::Disconnected {
            return Err(ClientError::Config(
                "connect a wallet before switching networks".to_string(),
            ));
        }
        info!(from = ?session.chain_id, to = chain_id, "switching wallet network");
        session.chain_id = Some(chain_id);
        drop(session);
        if let Ok(mut requests) = self.switch_requests.lock() {
            requests.push(chain_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EXPECTED_CHAIN_ID;

    fn address() -> Address {
        Address::parse("0xa11ce00000000000000000000000000000000001").unwrap()
    }

    #[test]
    fn switch_requires_connection() {
        let wallet = LocalWallet::new(WalletSession::disconnected());
        assert!(wallet.switch_network(EXPECTED_CHAIN_ID).is_err());
        assert!(wallet.switch_requests().is_empty());
    }

    #[test]
    fn switch_updates_chain() {
        let wallet = LocalWallet::new(WalletSession::connected(address(), 1));
        assert_eq!(wallet.session().chain_id, Some(1));
        wallet.switch_network(EXPECTED_CHAIN_ID).unwrap();
        assert_eq!(wallet.session().chain_id, Some(EXPECTED_CHAIN_ID));
        assert_eq!(wallet.switch_requests(), vec![EXPECTED_CHAIN_ID]);
    }

    #[test]
    fn reconnecting_is_not_connected() {
        let wallet = LocalWallet::new(WalletSession::connected(address(), EXPECTED_CHAIN_ID));
        wallet.set_status(ConnectionStatus::Reconnecting);
        let session = wallet.session();
        assert!(!session.is_connected());
        assert!(session.is_transitioning());
    }
}
