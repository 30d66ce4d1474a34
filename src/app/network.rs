use tracing::{info, warn};

use crate::app::core::App;
use crate::constants::EXPECTED_CHAIN_NAME;
use crate::orchestrator::MessageType;
use crate::wallet::WalletSession;

impl App {
    /// Request a switch to the expected chain, once per observed mismatch
    pub(crate) fn enforce_network(&mut self, session: &WalletSession) {
        let observed = match (session.is_connected(), session.chain_id) {
            (true, Some(id)) => id,
            _ => {
                self.switch_requested_for = None;
                return;
            }
        };
        let expected = self.config.expected_chain_id;
        if observed == expected {
            self.switch_requested_for = None;
            return;
        }
        if self.switch_requested_for == Some(observed) {
            return;
        }
        self.switch_requested_for = Some(observed);

        match self.wallet.switch_network(expected) {
            Ok(()) => {
                info!(observed, expected, "requested network switch");
                self.set_message(
                    MessageType::Info,
                    format!(
                        "Wallet is on chain {}. Requested a switch to {}.",
                        observed,
                        EXPECTED_CHAIN_NAME.to_uppercase()
                    ),
                );
            }
            Err(e) => {
                warn!(observed, expected, error = %e, "network switch request failed");
                self.set_message(MessageType::Error, format!("Failed to switch network: {}", e));
            }
        }
    }

    pub fn on_expected_network(&self) -> bool {
        self.session.chain_id == Some(self.config.expected_chain_id)
    }

    pub fn network_label(&self) -> String {
        match self.session.chain_id {
            Some(id) if id == self.config.expected_chain_id => EXPECTED_CHAIN_NAME.to_uppercase(),
            Some(id) => format!("CHAIN {} (WRONG NETWORK)", id),
            None => "NOT CONNECTED".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crate::app::core::fixtures::{test_app, TestApp};
    use crate::constants::EXPECTED_CHAIN_ID;

    #[tokio::test]
    async fn mismatch_requests_one_switch() {
        let TestApp {
            mut app, wallet, ..
        } = test_app(None);
        let now = Instant::now();
        app.tick(now);
        assert!(wallet.switch_requests().is_empty());

        wallet.set_chain(1);
        app.tick(now);
        assert_eq!(wallet.switch_requests(), vec![EXPECTED_CHAIN_ID]);
        assert!(!app.on_expected_network());

        // The switch shows up in the next session
        app.tick(now);
        assert!(app.on_expected_network());
        assert_eq!(app.switch_requested_for, None);

        // The user moves away again and keeps refusing: one request for that mismatch
        wallet.set_chain(1);
        app.tick(now);
        wallet.set_chain(1);
        app.tick(now);
        app.tick(now);
        assert_eq!(wallet.switch_requests().len(), 2);
    }

    #[tokio::test]
    async fn disconnected_wallet_is_left_alone() {
        let TestApp {
            mut app, wallet, ..
        } = test_app(None);
        wallet.disconnect();
        app.tick(Instant::now());
        assert!(wallet.switch_requests().is_empty());
        assert_eq!(app.network_label(), "NOT CONNECTED");
    }
}
