use tracing::{debug, info};

use super::notify::{Notifier, OperationKey, Outcome};
use super::Attempt;
use crate::chain::{Address, CallArg};
use crate::config::ContractKind;
use crate::constants::{FN_APPROVE, FN_DEPOSIT, FN_PRIVATE_TRANSACTION, FN_WITHDRAW, TOKEN_SYMBOL};
use crate::error::{ClientError, Field};
use crate::ledger::{LedgerCache, ReadQuery};
use crate::transactions::{ContractGateway, TransactionHandle, TxState};
use crate::utils::{format_token_amount, parse_amount, shorten_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Deposit,
    Withdraw,
    Transfer,
}

impl FlowKind {
    /// Deposits need the vault to be approved as spender first
    pub fn is_two_step(self) -> bool {
        matches!(self, FlowKind::Deposit)
    }

    pub fn label(self) -> &'static str {
        match self {
            FlowKind::Deposit => "Deposit",
            FlowKind::Withdraw => "Withdraw",
            FlowKind::Transfer => "Private transfer",
        }
    }

    fn function(self) -> &'static str {
        match self {
            FlowKind::Deposit => FN_DEPOSIT,
            FlowKind::Withdraw => FN_WITHDRAW,
            FlowKind::Transfer => FN_PRIVATE_TRANSACTION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Authorizing,
    Authorized,
    Acting,
    Done,
}

/// One vault operation driven from amount entry to confirmation.
///
/// The flow is advanced by the UI loop: [`primary_action`](Self::primary_action) on user input
/// and [`sync`](Self::sync) every tick to fold in handle transitions. Only handles the flow
/// still holds are observed, so a discarded attempt can confirm later without effect.
#[derive(Debug)]
pub struct VaultFlow {
    kind: FlowKind,
    amount: String,
    recipient: String,
    phase: Phase,
    authorization: Option<Attempt>,
    action: Option<Attempt>,
    authorized_amount: Option<u128>,
    last_error: Option<ClientError>,
    refresh: Vec<ReadQuery>,
}

impl VaultFlow {
    /// `refresh` lists the reads to invalidate once a write of this flow confirms
    pub fn new(kind: FlowKind, refresh: Vec<ReadQuery>) -> Self {
        Self {
            kind,
            amount: String::new(),
            recipient: String::new(),
            phase: Phase::Idle,
            authorization: None,
            action: None,
            authorized_amount: None,
            last_error: None,
            refresh,
        }
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn authorization(&self) -> Option<&Attempt> {
        self.authorization.as_ref()
    }

    pub fn action(&self) -> Option<&Attempt> {
        self.action.as_ref()
    }

    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    pub fn attempt_keys(&self) -> impl Iterator<Item = OperationKey> + '_ {
        self.authorization
            .iter()
            .chain(self.action.iter())
            .map(|attempt| attempt.key)
    }

    pub fn is_busy(&self) -> bool {
        match self.phase {
            Phase::Acting => true,
            Phase::Authorizing => self.authorization.as_ref().map_or(false, Attempt::is_live),
            _ => false,
        }
    }

    pub fn set_amount(&mut self, value: &str) {
        if value == self.amount {
            return;
        }
        self.amount = value.to_string();
        self.last_error = None;
        if self.phase != Phase::Idle {
            self.reset("amount changed");
        }
    }

    pub fn set_recipient(&mut self, value: &str) {
        if value == self.recipient {
            return;
        }
        self.recipient = value.to_string();
        self.last_error = None;
        if self.phase != Phase::Idle {
            self.reset("recipient changed");
        }
    }

    /// Drop both handles. Their writes may still land on chain, but this flow stops listening.
    fn reset(&mut self, reason: &str) {
        debug!(flow = self.kind.label(), phase = ?self.phase, reason, "flow reset");
        self.phase = Phase::Idle;
        self.authorization = None;
        self.action = None;
        self.authorized_amount = None;
    }

    fn authorization_confirmed(&self) -> bool {
        self.authorization
            .as_ref()
            .map_or(false, |attempt| attempt.state() == TxState::Confirmed)
    }

    /// The button press: authorize, act, or reject with the reason
    pub fn primary_action(
        &mut self,
        gateway: &ContractGateway,
        notifier: &mut Notifier,
    ) -> Result<(), ClientError> {
        let result = self.advance(gateway, notifier);
        if let Err(err) = &result {
            notifier.error(err.to_string());
            self.last_error = Some(err.clone());
        }
        result
    }

    fn advance(
        &mut self,
        gateway: &ContractGateway,
        notifier: &mut Notifier,
    ) -> Result<(), ClientError> {
        if self.is_busy() {
            return Err(ClientError::InFlight);
        }
        if self.phase == Phase::Authorized {
            return match self.authorized_amount {
                Some(amount) if self.authorization_confirmed() => {
                    self.submit_action(gateway, notifier, amount)
                }
                _ => Err(ClientError::InFlight),
            };
        }

        let amount = parse_amount(&self.amount)?;
        if self.kind.is_two_step() {
            self.submit_authorization(gateway, notifier, amount)
        } else {
            self.submit_action(gateway, notifier, amount)
        }
    }

    fn submit_authorization(
        &mut self,
        gateway: &ContractGateway,
        notifier: &mut Notifier,
        amount: u128,
    ) -> Result<(), ClientError> {
        let spender = gateway.config().contract(ContractKind::Vault)?;
        let handle = gateway.submit(
            ContractKind::Token,
            FN_APPROVE,
            vec![CallArg::Address(spender), CallArg::Uint(amount)],
        );
        rejected_locally(&handle)?;

        self.authorization = Some(Attempt::new(notifier.next_key(), handle));
        self.action = None;
        self.authorized_amount = Some(amount);
        self.last_error = None;
        self.phase = Phase::Authorizing;
        info!(flow = self.kind.label(), amount = %format_token_amount(amount), "authorization submitted");
        notifier.info(format!(
            "Approval for {} {} submitted",
            format_token_amount(amount),
            TOKEN_SYMBOL
        ));
        Ok(())
    }

    fn submit_action(
        &mut self,
        gateway: &ContractGateway,
        notifier: &mut Notifier,
        amount: u128,
    ) -> Result<(), ClientError> {
        let args = match self.kind {
            FlowKind::Transfer => {
                let recipient = Address::parse_field(&self.recipient, Field::Recipient)?;
                vec![CallArg::Address(recipient), CallArg::Uint(amount)]
            }
            FlowKind::Deposit | FlowKind::Withdraw => vec![CallArg::Uint(amount)],
        };
        let handle = gateway.submit(ContractKind::Vault, self.kind.function(), args);
        rejected_locally(&handle)?;

        self.action = Some(Attempt::new(notifier.next_key(), handle));
        self.last_error = None;
        self.phase = Phase::Acting;
        info!(flow = self.kind.label(), amount = %format_token_amount(amount), "action submitted");
        notifier.info(format!("{} transaction submitted", self.kind.label()));
        Ok(())
    }

    /// Fold handle transitions into the phase. Safe to call any number of times.
    pub fn sync(&mut self, notifier: &mut Notifier, cache: &mut LedgerCache) {
        match self.phase {
            Phase::Authorizing => self.sync_authorization(notifier, cache),
            Phase::Acting => self.sync_action(notifier, cache),
            Phase::Idle | Phase::Authorized | Phase::Done => {}
        }
    }

    fn sync_authorization(&mut self, notifier: &mut Notifier, cache: &mut LedgerCache) {
        let Some(attempt) = &self.authorization else {
            return;
        };
        match attempt.state() {
            TxState::Confirmed => {
                self.phase = Phase::Authorized;
                info!(flow = self.kind.label(), "authorization confirmed");
                let amount = self.authorized_amount.map(format_token_amount).unwrap_or_default();
                notifier.fire_once(
                    attempt.key,
                    Outcome::Confirmed,
                    format!("Approval confirmed. You can now deposit {amount} {TOKEN_SYMBOL}"),
                );
                self.invalidate_all(cache);
            }
            TxState::Failed => {
                self.phase = Phase::Idle;
                self.authorized_amount = None;
                let err = attempt.handle.error();
                info!(flow = self.kind.label(), error = ?err, "authorization failed");
                notifier.fire_once(attempt.key, Outcome::Failed, failure_message("Approval", err.as_ref()));
                self.last_error = err;
            }
            TxState::Unsent | TxState::Submitted | TxState::Pending => {}
        }
    }

    fn sync_action(&mut self, notifier: &mut Notifier, cache: &mut LedgerCache) {
        let Some(attempt) = &self.action else {
            return;
        };
        match attempt.state() {
            TxState::Confirmed => {
                let message = self.success_message(attempt);
                notifier.fire_once(attempt.key, Outcome::Confirmed, message);
                info!(flow = self.kind.label(), "action confirmed");
                self.phase = Phase::Done;
                self.amount.clear();
                self.authorized_amount = None;
                self.invalidate_all(cache);
            }
            TxState::Failed => {
                let err = attempt.handle.error();
                notifier.fire_once(
                    attempt.key,
                    Outcome::Failed,
                    failure_message(self.kind.label(), err.as_ref()),
                );
                // A confirmed approval stays usable; the user retries the action only
                self.phase = if self.kind.is_two_step() && self.authorization_confirmed() {
                    Phase::Authorized
                } else {
                    Phase::Idle
                };
                info!(flow = self.kind.label(), error = ?err, phase = ?self.phase, "action failed");
                self.last_error = err;
            }
            TxState::Unsent | TxState::Submitted | TxState::Pending => {}
        }
    }

    fn success_message(&self, attempt: &Attempt) -> String {
        let amount = parse_amount(&self.amount)
            .map(format_token_amount)
            .unwrap_or_else(|_| self.amount.clone());
        let hash = attempt
            .handle
            .hash()
            .map(|h| format!(" ({})", shorten_id(&h.0)))
            .unwrap_or_default();
        match self.kind {
            FlowKind::Deposit => format!("Deposited {amount} {TOKEN_SYMBOL}{hash}"),
            FlowKind::Withdraw => format!("Withdrew {amount} {TOKEN_SYMBOL}{hash}"),
            FlowKind::Transfer => format!(
                "Sent {amount} {TOKEN_SYMBOL} privately to {}{hash}",
                shorten_id(self.recipient.trim())
            ),
        }
    }

    fn invalidate_all(&self, cache: &mut LedgerCache) {
        for query in &self.refresh {
            cache.invalidate(query);
        }
    }
}

/// Configuration problems fail the handle before anything is broadcast
fn rejected_locally(handle: &TransactionHandle) -> Result<(), ClientError> {
    match handle.error() {
        Some(err @ ClientError::Config(_)) => Err(err),
        _ => Ok(()),
    }
}

fn failure_message(what: &str, err: Option<&ClientError>) -> String {
    match err {
        Some(err) => format!("{what} failed: {err}"),
        None => format!("{what} failed"),
    }
}
