use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use super::caller::ContractCaller;
use super::types::{
    Address, CallArg, LedgerValue, Proposal, ProposalStatus, Receipt, ReceiptStatus, TxHash,
};
use crate::constants::{
    FN_ALLOWANCE, FN_APPROVE, FN_BALANCE_OF, FN_CREATE_PROPOSAL, FN_DEPOSIT,
    FN_GET_ACTIVE_PROPOSALS, FN_GET_BALANCE, FN_PRIVATE_TRANSACTION, FN_VOTE, FN_WITHDRAW,
};
use crate::error::ClientError;

/// How broadcast transactions get mined
#[derive(Debug, Clone, Copy)]
pub enum SettleMode {
    /// Mined automatically after the given delay
    Auto(Duration),
    /// Mined only when the owner calls [`SimulatedChain::settle_next`]
    #[cfg(test)]
    Manual,
}

/// Deployed contract addresses the simulated ledger answers for
#[derive(Debug, Clone)]
pub struct SimulatedContracts {
    pub token: Address,
    pub vault: Address,
    pub governance: Address,
}

/// A write as the node saw it, kept for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCall {
    pub hash: TxHash,
    pub from: Address,
    pub target: Address,
    pub function: String,
    pub args: Vec<CallArg>,
}

#[derive(Default)]
struct LedgerState {
    token_balances: HashMap<String, u128>,
    native_balances: HashMap<String, u128>,
    allowances: HashMap<(String, String), u128>,
    vault_balances: HashMap<String, u128>,
    proposals: Vec<Proposal>,
    voters: HashSet<(u64, String)>,
    next_proposal_id: u64,
    nonce: u64,
    pending: VecDeque<SentCall>,
    receipts: HashMap<TxHash, watch::Sender<Option<Receipt>>>,
    sent: Vec<SentCall>,
    reject_next_send: Option<String>,
    read_failure: Option<String>,
}

/// In-process stand-in for the vault, token and governance contracts
pub struct SimulatedChain {
    contracts: SimulatedContracts,
    mode: SettleMode,
    state: Arc<Mutex<LedgerState>>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn lock(state: &Mutex<LedgerState>) -> MutexGuard<'_, LedgerState> {
    // A panic while holding the lock leaves plain data behind; keep serving it
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimulatedChain {
    pub fn new(contracts: SimulatedContracts, mode: SettleMode) -> Self {
        let state = LedgerState {
            next_proposal_id: 1,
            ..LedgerState::default()
        };
        Self {
            contracts,
            mode,
            state: Arc::new(Mutex::new(state)),
        }
    }

    #[cfg(test)]
    pub fn contracts(&self) -> &SimulatedContracts {
        &self.contracts
    }

    pub fn mint(&self, account: &Address, amount: u128) {
        let mut state = lock(&self.state);
        *state.token_balances.entry(account.normalized()).or_default() += amount;
    }

    pub fn fund_native(&self, account: &Address, amount: u128) {
        let mut state = lock(&self.state);
        *state.native_balances.entry(account.normalized()).or_default() += amount;
    }

    /// Insert an already-mined proposal
    pub fn seed_proposal(&self, title: &str, description: &str, duration_secs: u64) -> u64 {
        let mut state = lock(&self.state);
        let id = state.next_proposal_id;
        state.next_proposal_id += 1;
        state.proposals.push(Proposal {
            id,
            title: title.to_string(),
            description: description.to_string(),
            status: ProposalStatus::Active,
            votes_for: 0,
            votes_against: 0,
            end_time: unix_now() + duration_secs,
        });
        id
    }

    /// Make the next `send` fail as if the user rejected the signature
    #[cfg(test)]
    pub fn reject_next_send(&self, reason: &str) {
        lock(&self.state).reject_next_send = Some(reason.to_string());
    }

    /// Make every read fail until cleared with `None`
    #[cfg(test)]
    pub fn fail_reads(&self, reason: Option<&str>) {
        lock(&self.state).read_failure = reason.map(str::to_string);
    }

    #[cfg(test)]
    pub fn sent_calls(&self) -> Vec<SentCall> {
        lock(&self.state).sent.clone()
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Mine the oldest pending transaction, applying contract rules
    #[cfg(test)]
    pub fn settle_next(&self) -> Option<TxHash> {
        let mut state = lock(&self.state);
        let tx = state.pending.pop_front()?;
        let status = state.apply(&self.contracts, &tx);
        state.publish(&tx.hash, status);
        Some(tx.hash)
    }

    /// Mine the oldest pending transaction as reverted without touching balances
    #[cfg(test)]
    pub fn revert_next(&self, reason: &str) -> Option<TxHash> {
        let mut state = lock(&self.state);
        let tx = state.pending.pop_front()?;
        state.publish(&tx.hash, ReceiptStatus::Reverted(reason.to_string()));
        Some(tx.hash)
    }

    fn settle_hash(state: &Mutex<LedgerState>, contracts: &SimulatedContracts, hash: &TxHash) {
        let mut state = lock(state);
        let Some(pos) = state.pending.iter().position(|tx| &tx.hash == hash) else {
            return;
        };
        if let Some(tx) = state.pending.remove(pos) {
            let status = state.apply(contracts, &tx);
            state.publish(&tx.hash, status);
        }
    }
}

impl LedgerState {
    fn publish(&mut self, hash: &TxHash, status: ReceiptStatus) {
        debug!(%hash, ?status, "simulated transaction mined");
        if let Some(sender) = self.receipts.get(hash) {
            sender.send_replace(Some(Receipt {
                hash: hash.clone(),
                status,
            }));
        }
    }

    fn apply(&mut self, contracts: &SimulatedContracts, tx: &SentCall) -> ReceiptStatus {
        match self.execute(contracts, tx) {
            Ok(()) => ReceiptStatus::Success,
            Err(reason) => ReceiptStatus::Reverted(reason),
        }
    }

    fn execute(&mut self, contracts: &SimulatedContracts, tx: &SentCall) -> Result<(), String> {
        let from = tx.from.normalized();
        let arg_uint = |i: usize| {
            tx.args
                .get(i)
                .and_then(CallArg::as_uint)
                .ok_or_else(|| format!("argument {} must be uint", i))
        };
        let arg_address = |i: usize| {
            tx.args
                .get(i)
                .and_then(CallArg::as_address)
                .map(Address::normalized)
                .ok_or_else(|| format!("argument {} must be address", i))
        };
        let arg_str = |i: usize| {
            tx.args
                .get(i)
                .and_then(CallArg::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("argument {} must be string", i))
        };

        if tx.target == contracts.token && tx.function == FN_APPROVE {
            let spender = arg_address(0)?;
            let amount = arg_uint(1)?;
            self.allowances.insert((from, spender), amount);
            return Ok(());
        }

        if tx.target == contracts.vault {
            let vault = contracts.vault.normalized();
            return match tx.function.as_str() {
                FN_DEPOSIT => {
                    let amount = arg_uint(0)?;
                    let allowance = self
                        .allowances
                        .get(&(from.clone(), vault.clone()))
                        .copied()
                        .unwrap_or(0);
                    if allowance < amount {
                        return Err("ERC20: insufficient allowance".to_string());
                    }
                    let balance = self.token_balances.get(&from).copied().unwrap_or(0);
                    if balance < amount {
                        return Err("ERC20: transfer amount exceeds balance".to_string());
                    }
                    self.allowances.insert((from.clone(), vault), allowance - amount);
                    self.token_balances.insert(from.clone(), balance - amount);
                    *self.vault_balances.entry(from).or_default() += amount;
                    Ok(())
                }
                FN_WITHDRAW => {
                    let amount = arg_uint(0)?;
                    let held = self.vault_balances.get(&from).copied().unwrap_or(0);
                    if held < amount {
                        return Err("Insufficient vault balance".to_string());
                    }
                    self.vault_balances.insert(from.clone(), held - amount);
                    *self.token_balances.entry(from).or_default() += amount;
                    Ok(())
                }
                FN_PRIVATE_TRANSACTION => {
                    let recipient = arg_address(0)?;
                    let amount = arg_uint(1)?;
                    let held = self.vault_balances.get(&from).copied().unwrap_or(0);
                    if held < amount {
                        return Err("Insufficient vault balance".to_string());
                    }
                    self.vault_balances.insert(from, held - amount);
                    *self.vault_balances.entry(recipient).or_default() += amount;
                    Ok(())
                }
                other => Err(format!("vault has no function {}", other)),
            };
        }

        if tx.target == contracts.governance {
            return match tx.function.as_str() {
                FN_CREATE_PROPOSAL => {
                    let title = arg_str(0)?;
                    let description = arg_str(1)?;
                    let duration = arg_uint(2)? as u64;
                    let id = self.next_proposal_id;
                    self.next_proposal_id += 1;
                    self.proposals.push(Proposal {
                        id,
                        title,
                        description,
                        status: ProposalStatus::Active,
                        votes_for: 0,
                        votes_against: 0,
                        end_time: unix_now() + duration,
                    });
                    Ok(())
                }
                FN_VOTE => {
                    let id = arg_uint(0)? as u64;
                    let support = tx
                        .args
                        .get(1)
                        .and_then(CallArg::as_bool)
                        .ok_or_else(|| "argument 1 must be bool".to_string())?;
                    if self.voters.contains(&(id, from.clone())) {
                        return Err("Already voted".to_string());
                    }
                    let proposal = self
                        .proposals
                        .iter_mut()
                        .find(|p| p.id == id)
                        .ok_or_else(|| "Proposal does not exist".to_string())?;
                    if proposal.status != ProposalStatus::Active || proposal.end_time <= unix_now() {
                        return Err("Voting period has ended".to_string());
                    }
                    if support {
                        proposal.votes_for += 1;
                    } else {
                        proposal.votes_against += 1;
                    }
                    self.voters.insert((id, from));
                    Ok(())
                }
                other => Err(format!("governance has no function {}", other)),
            };
        }

        Err(format!("no contract at {}", tx.target))
    }

    fn read(
        &self,
        contracts: &SimulatedContracts,
        target: &Address,
        function: &str,
        args: &[CallArg],
    ) -> Result<LedgerValue, ClientError> {
        let address_arg = |i: usize| {
            args.get(i)
                .and_then(CallArg::as_address)
                .map(Address::normalized)
                .ok_or_else(|| ClientError::Read(format!("{}: argument {} must be address", function, i)))
        };

        if target == &contracts.token && function == FN_BALANCE_OF {
            let owner = address_arg(0)?;
            return Ok(LedgerValue::Amount(
                self.token_balances.get(&owner).copied().unwrap_or(0),
            ));
        }
        if target == &contracts.token && function == FN_ALLOWANCE {
            let key = (address_arg(0)?, address_arg(1)?);
            return Ok(LedgerValue::Amount(
                self.allowances.get(&key).copied().unwrap_or(0),
            ));
        }
        if target == &contracts.vault && function == FN_GET_BALANCE {
            let owner = address_arg(0)?;
            return Ok(LedgerValue::Amount(
                self.vault_balances.get(&owner).copied().unwrap_or(0),
            ));
        }
        if target == &contracts.governance && function == FN_GET_ACTIVE_PROPOSALS {
            let now = unix_now();
            let active = self
                .proposals
                .iter()
                .filter(|p| p.status == ProposalStatus::Active && p.end_time > now)
                .cloned()
                .collect();
            return Ok(LedgerValue::Proposals(active));
        }

        Err(ClientError::Read(format!(
            "execution reverted: {} is not a view function of {}",
            function, target
        )))
    }
}

#[async_trait]
impl ContractCaller for SimulatedChain {
    async fn call(
        &self,
        target: &Address,
        function: &str,
        args: &[CallArg],
    ) -> Result<LedgerValue, ClientError> {
        let state = lock(&self.state);
        if let Some(reason) = &state.read_failure {
            return Err(ClientError::Read(reason.clone()));
        }
        state.read(&self.contracts, target, function, args)
    }

    async fn native_balance(&self, account: &Address) -> Result<u128, ClientError> {
        let state = lock(&self.state);
        if let Some(reason) = &state.read_failure {
            return Err(ClientError::Read(reason.clone()));
        }
        Ok(state
            .native_balances
            .get(&account.normalized())
            .copied()
            .unwrap_or(0))
    }

    async fn send(
        &self,
        from: &Address,
        target: &Address,
        function: &str,
        args: &[CallArg],
    ) -> Result<TxHash, ClientError> {
        let hash = {
            let mut state = lock(&self.state);
            if let Some(reason) = state.reject_next_send.take() {
                return Err(ClientError::Submission(reason));
            }
            state.nonce += 1;
            let hash = TxHash(format!("0x{:064x}", 0x5e90_1a00_u64 + state.nonce));
            let call = SentCall {
                hash: hash.clone(),
                from: from.clone(),
                target: target.clone(),
                function: function.to_string(),
                args: args.to_vec(),
            };
            let (sender, _) = watch::channel(None);
            state.receipts.insert(hash.clone(), sender);
            state.sent.push(call.clone());
            state.pending.push_back(call);
            hash
        };
        info!(%hash, function, target = %target, "simulated transaction broadcast");

        match self.mode {
            SettleMode::Auto(delay) => {
                let state = Arc::clone(&self.state);
                let contracts = self.contracts.clone();
                let mined = hash.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    SimulatedChain::settle_hash(&state, &contracts, &mined);
                });
            }
            #[cfg(test)]
            SettleMode::Manual => {}
        }
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: &TxHash) -> Result<Receipt, ClientError> {
        let mut receiver = {
            let state = lock(&self.state);
            state
                .receipts
                .get(hash)
                .map(watch::Sender::subscribe)
                .ok_or_else(|| ClientError::Submission(format!("unknown transaction {}", hash)))?
        };
        let receipt = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ClientError::Submission("node dropped the transaction".to_string()))?
            .clone();
        receipt.ok_or_else(|| ClientError::Submission("missing receipt".to_string()))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const UNIT: u128 = 1_000_000_000_000_000_000;

    pub fn contracts() -> SimulatedContracts {
        SimulatedContracts {
            token: Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
            vault: Address::parse("0x2222222222222222222222222222222222222222").unwrap(),
            governance: Address::parse("0x3333333333333333333333333333333333333333").unwrap(),
        }
    }

    pub fn alice() -> Address {
        Address::parse("0xa11ce00000000000000000000000000000000001").unwrap()
    }

    pub fn bob() -> Address {
        Address::parse("0xb0b0000000000000000000000000000000000002").unwrap()
    }

    pub fn manual_chain() -> Arc<SimulatedChain> {
        let chain = SimulatedChain::new(contracts(), SettleMode::Manual);
        chain.mint(&alice(), 1_000 * UNIT);
        Arc::new(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn deposit_without_allowance_reverts() {
        let chain = manual_chain();
        let c = chain.contracts().clone();
        let hash = chain
            .send(&alice(), &c.vault, FN_DEPOSIT, &[CallArg::Uint(10 * UNIT)])
            .await
            .unwrap();
        chain.settle_next();
        let receipt = chain.wait_for_receipt(&hash).await.unwrap();
        assert_eq!(
            receipt.status,
            ReceiptStatus::Reverted("ERC20: insufficient allowance".to_string())
        );
    }

    #[tokio::test]
    async fn approve_then_deposit_moves_funds() {
        let chain = manual_chain();
        let c = chain.contracts().clone();
        chain
            .send(
                &alice(),
                &c.token,
                FN_APPROVE,
                &[CallArg::Address(c.vault.clone()), CallArg::Uint(10 * UNIT)],
            )
            .await
            .unwrap();
        chain.settle_next();
        let hash = chain
            .send(&alice(), &c.vault, FN_DEPOSIT, &[CallArg::Uint(10 * UNIT)])
            .await
            .unwrap();
        chain.settle_next();
        assert!(chain.wait_for_receipt(&hash).await.unwrap().status == ReceiptStatus::Success);

        let vault = chain
            .call(&c.vault, FN_GET_BALANCE, &[CallArg::Address(alice())])
            .await
            .unwrap();
        assert_eq!(vault, LedgerValue::Amount(10 * UNIT));
        let wallet = chain
            .call(&c.token, FN_BALANCE_OF, &[CallArg::Address(alice())])
            .await
            .unwrap();
        assert_eq!(wallet, LedgerValue::Amount(990 * UNIT));
    }

    #[tokio::test]
    async fn second_vote_from_same_account_reverts() {
        let chain = manual_chain();
        let c = chain.contracts().clone();
        let id = chain.seed_proposal("Raise cap", "More deposits", 3600);
        let args = [CallArg::Uint(id as u128), CallArg::Bool(true)];
        chain.send(&alice(), &c.governance, FN_VOTE, &args).await.unwrap();
        chain.settle_next();
        let again = chain.send(&alice(), &c.governance, FN_VOTE, &args).await.unwrap();
        chain.settle_next();
        let receipt = chain.wait_for_receipt(&again).await.unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Reverted("Already voted".to_string()));
    }

    #[tokio::test]
    async fn injected_failures() {
        let chain = manual_chain();
        let c = chain.contracts().clone();
        chain.reject_next_send("User rejected the request");
        let err = chain
            .send(&alice(), &c.vault, FN_WITHDRAW, &[CallArg::Uint(1)])
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::Submission("User rejected the request".to_string()));
        assert_eq!(chain.pending_count(), 0);

        chain.fail_reads(Some("node unreachable"));
        assert!(chain.native_balance(&alice()).await.is_err());
        chain.fail_reads(None);
        assert_eq!(chain.native_balance(&alice()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn auto_mode_mines_after_delay() {
        let chain = SimulatedChain::new(contracts(), SettleMode::Auto(Duration::from_millis(5)));
        chain.mint(&alice(), UNIT);
        let c = chain.contracts().clone();
        let hash = chain
            .send(
                &alice(),
                &c.token,
                FN_APPROVE,
                &[CallArg::Address(c.vault.clone()), CallArg::Uint(UNIT)],
            )
            .await
            .unwrap();
        let receipt = chain.wait_for_receipt(&hash).await.unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Success);
    }
}
