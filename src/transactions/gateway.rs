use std::sync::Arc;

use tracing::{info, warn};

use super::handle::{TransactionHandle, TxTracker};
use crate::chain::{Address, CallArg, ContractCaller, ReceiptStatus};
use crate::config::{ClientConfig, ContractKind};
use crate::error::ClientError;
use crate::wallet::WalletProvider;

/// Submits contract writes on behalf of the connected wallet
#[derive(Clone)]
pub struct ContractGateway {
    config: Arc<ClientConfig>,
    wallet: Arc<dyn WalletProvider>,
    caller: Arc<dyn ContractCaller>,
}

impl ContractGateway {
    pub fn new(
        config: Arc<ClientConfig>,
        wallet: Arc<dyn WalletProvider>,
        caller: Arc<dyn ContractCaller>,
    ) -> Self {
        Self {
            config,
            wallet,
            caller,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Local checks that must pass before anything touches the network
    fn preflight(&self, contract: ContractKind) -> Result<(Address, Address), ClientError> {
        let session = self.wallet.session();
        let from = match (&session.address, session.is_connected()) {
            (Some(address), true) => address.clone(),
            _ => return Err(ClientError::Config("wallet is not connected".to_string())),
        };
        if session.chain_id != Some(self.config.expected_chain_id) {
            return Err(ClientError::Config(format!(
                "wallet is on chain {}; switch to chain {}",
                session
                    .chain_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                self.config.expected_chain_id
            )));
        }
        let target = self.config.contract(contract)?;
        Ok((from, target))
    }

    /// Submit `function(args)` on `contract`.
    ///
    /// The returned handle is already `Submitted`, or `Failed` if a local check rejected the
    /// write. Broadcast and confirmation happen on a spawned task; watch the handle for them.
    pub fn submit(
        &self,
        contract: ContractKind,
        function: &str,
        args: Vec<CallArg>,
    ) -> TransactionHandle {
        let (tracker, handle) = TransactionHandle::channel(function);

        let (from, target) = match self.preflight(contract) {
            Ok(pair) => pair,
            Err(err) => {
                warn!(handle = %handle.id(), function, %err, "write rejected before submission");
                tracker.fail(err);
                return handle;
            }
        };

        tracker.submitted();
        info!(
            handle = %handle.id(),
            %contract,
            function,
            args = ?args.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "write submitted"
        );

        let caller = Arc::clone(&self.caller);
        let function = function.to_string();
        let id = handle.id();
        tokio::spawn(async move {
            drive(caller, tracker, from, target, function, args, id).await;
        });
        handle
    }
}

async fn drive(
    caller: Arc<dyn ContractCaller>,
    tracker: TxTracker,
    from: Address,
    target: Address,
    function: String,
    args: Vec<CallArg>,
    id: super::handle::HandleId,
) {
    let hash = match caller.send(&from, &target, &function, &args).await {
        Ok(hash) => hash,
        Err(err) => {
            warn!(handle = %id, %function, %err, "broadcast failed");
            tracker.fail(err);
            return;
        }
    };
    info!(handle = %id, %hash, "transaction pending");
    tracker.pending(hash.clone());

    match caller.wait_for_receipt(&hash).await {
        Ok(receipt) => match receipt.status {
            ReceiptStatus::Success => {
                info!(handle = %id, %hash, "transaction confirmed");
                tracker.confirm();
            }
            ReceiptStatus::Reverted(reason) => {
                warn!(handle = %id, %hash, %reason, "transaction reverted");
                tracker.fail(ClientError::Reverted(reason));
            }
        },
        Err(err) => {
            warn!(handle = %id, %hash, %err, "no receipt for transaction");
            tracker.fail(err);
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::time::Duration;

    use super::*;
    use crate::chain::simulated::{fixtures as chain, SimulatedChain};
    use crate::config::ContractAddresses;
    use crate::constants::EXPECTED_CHAIN_ID;
    use crate::wallet::{LocalWallet, WalletSession};

    pub fn config_for(chain: &SimulatedChain) -> Arc<ClientConfig> {
        let c = chain.contracts();
        Arc::new(ClientConfig::new(
            ContractAddresses {
                vault: Some(c.vault.to_string()),
                governance: Some(c.governance.to_string()),
                token: Some(c.token.to_string()),
            },
            Duration::from_secs(10),
        ))
    }

    pub struct Harness {
        pub chain: Arc<SimulatedChain>,
        pub wallet: Arc<LocalWallet>,
        pub gateway: ContractGateway,
    }

    pub fn harness() -> Harness {
        let chain = chain::manual_chain();
        let wallet = Arc::new(LocalWallet::new(WalletSession::connected(
            chain::alice(),
            EXPECTED_CHAIN_ID,
        )));
        let gateway = ContractGateway::new(
            config_for(&chain),
            wallet.clone() as Arc<dyn WalletProvider>,
            chain.clone() as Arc<dyn ContractCaller>,
        );
        Harness {
            chain,
            wallet,
            gateway,
        }
    }

    /// Let spawned gateway and cache tasks run to their next await point
    pub async fn drain_tasks() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::fixtures::*;
    use super::*;
    use crate::chain::simulated::fixtures::UNIT;
    use crate::config::ContractAddresses;
    use crate::constants::{FN_APPROVE, FN_WITHDRAW};
    use crate::transactions::TxState;

    #[tokio::test]
    async fn submit_walks_through_pending_to_confirmed() {
        let h = harness();
        let vault = h.chain.contracts().vault.clone();
        let mut handle = h.gateway.submit(
            ContractKind::Token,
            FN_APPROVE,
            vec![CallArg::Address(vault), CallArg::Uint(UNIT)],
        );
        assert_eq!(handle.state(), TxState::Submitted);

        assert_eq!(handle.reached(TxState::Pending).await, TxState::Pending);
        assert!(handle.hash().is_some());

        h.chain.settle_next();
        assert_eq!(handle.settled().await, TxState::Confirmed);
    }

    #[tokio::test]
    async fn disconnected_wallet_fails_without_network_call() {
        let h = harness();
        h.wallet.disconnect();
        let handle = h
            .gateway
            .submit(ContractKind::Vault, FN_WITHDRAW, vec![CallArg::Uint(1)]);
        assert_eq!(handle.state(), TxState::Failed);
        assert!(matches!(handle.error(), Some(ClientError::Config(_))));
        drain_tasks().await;
        assert!(h.chain.sent_calls().is_empty());
    }

    #[tokio::test]
    async fn wrong_chain_and_bad_address_are_config_errors() {
        let h = harness();
        h.wallet.set_chain(1);
        let handle = h
            .gateway
            .submit(ContractKind::Vault, FN_WITHDRAW, vec![CallArg::Uint(1)]);
        assert!(matches!(handle.error(), Some(ClientError::Config(_))));

        let broken = ContractGateway::new(
            Arc::new(ClientConfig::new(
                ContractAddresses {
                    vault: Some("0xnot-an-address".to_string()),
                    ..ContractAddresses::default()
                },
                Duration::from_secs(10),
            )),
            Arc::new(crate::wallet::LocalWallet::new(crate::wallet::WalletSession::connected(
                crate::chain::simulated::fixtures::alice(),
                crate::constants::EXPECTED_CHAIN_ID,
            ))),
            h.chain.clone(),
        );
        let handle = broken.submit(ContractKind::Vault, FN_WITHDRAW, vec![CallArg::Uint(1)]);
        assert_eq!(handle.state(), TxState::Failed);
        assert!(matches!(handle.error(), Some(ClientError::Config(_))));
        drain_tasks().await;
        assert!(h.chain.sent_calls().is_empty());
    }

    #[tokio::test]
    async fn signing_rejection_is_terminal_submission_error() {
        let h = harness();
        h.chain.reject_next_send("User rejected the request");
        let mut handle = h
            .gateway
            .submit(ContractKind::Vault, FN_WITHDRAW, vec![CallArg::Uint(1)]);
        assert_eq!(handle.settled().await, TxState::Failed);
        assert_eq!(
            handle.error(),
            Some(ClientError::Submission("User rejected the request".to_string()))
        );
        assert_eq!(handle.hash(), None);
    }

    #[tokio::test]
    async fn revert_is_reported_as_confirmation_error() {
        let h = harness();
        let mut handle = h
            .gateway
            .submit(ContractKind::Vault, FN_WITHDRAW, vec![CallArg::Uint(5 * UNIT)]);
        handle.reached(TxState::Pending).await;
        h.chain.settle_next();
        assert_eq!(handle.settled().await, TxState::Failed);
        assert_eq!(
            handle.error(),
            Some(ClientError::Reverted("Insufficient vault balance".to_string()))
        );
    }

    #[tokio::test]
    async fn independent_handles_settle_independently() {
        let h = harness();
        let mut first = h
            .gateway
            .submit(ContractKind::Vault, FN_WITHDRAW, vec![CallArg::Uint(1)]);
        let mut second = h
            .gateway
            .submit(ContractKind::Vault, FN_WITHDRAW, vec![CallArg::Uint(2)]);
        futures::join!(
            first.reached(TxState::Pending),
            second.reached(TxState::Pending)
        );

        h.chain.revert_next("boom");
        assert_eq!(first.settled().await, TxState::Failed);
        assert_eq!(second.state(), TxState::Pending);

        h.chain.revert_next("boom");
        assert_eq!(second.settled().await, TxState::Failed);
    }
}
