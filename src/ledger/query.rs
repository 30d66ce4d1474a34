use crate::chain::{Address, CallArg, ContractCaller, LedgerValue};
use crate::config::{ClientConfig, ContractKind};
use crate::constants::{FN_ALLOWANCE, FN_BALANCE_OF, FN_GET_ACTIVE_PROPOSALS, FN_GET_BALANCE};
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewFunction {
    NativeBalance,
    TokenBalance,
    VaultBalance,
    Allowance,
    ActiveProposals,
}

impl ViewFunction {
    pub fn abi_name(self) -> &'static str {
        match self {
            ViewFunction::NativeBalance => "eth_getBalance",
            ViewFunction::TokenBalance => FN_BALANCE_OF,
            ViewFunction::VaultBalance => FN_GET_BALANCE,
            ViewFunction::Allowance => FN_ALLOWANCE,
            ViewFunction::ActiveProposals => FN_GET_ACTIVE_PROPOSALS,
        }
    }

    /// What a query shows before its first successful fetch
    pub fn default_value(self) -> LedgerValue {
        match self {
            ViewFunction::ActiveProposals => LedgerValue::Proposals(Vec::new()),
            _ => LedgerValue::Amount(0),
        }
    }
}

/// Identifies one on-chain read: view function, target contract and arguments.
/// Owner addresses are part of the key, so a new account means a new query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadQuery {
    pub function: ViewFunction,
    pub target: Option<Address>,
    pub args: Vec<CallArg>,
}

impl ReadQuery {
    pub fn native_balance(owner: &Address) -> Self {
        Self {
            function: ViewFunction::NativeBalance,
            target: None,
            args: vec![CallArg::Address(owner.clone())],
        }
    }

    pub fn token_balance(config: &ClientConfig, owner: &Address) -> Result<Self, ClientError> {
        Ok(Self {
            function: ViewFunction::TokenBalance,
            target: Some(config.contract(ContractKind::Token)?),
            args: vec![CallArg::Address(owner.clone())],
        })
    }

    pub fn vault_balance(config: &ClientConfig, owner: &Address) -> Result<Self, ClientError> {
        Ok(Self {
            function: ViewFunction::VaultBalance,
            target: Some(config.contract(ContractKind::Vault)?),
            args: vec![CallArg::Address(owner.clone())],
        })
    }

    /// How much of `owner`'s token the vault may pull
    pub fn allowance(config: &ClientConfig, owner: &Address) -> Result<Self, ClientError> {
        let spender = config.contract(ContractKind::Vault)?;
        Ok(Self {
            function: ViewFunction::Allowance,
            target: Some(config.contract(ContractKind::Token)?),
            args: vec![CallArg::Address(owner.clone()), CallArg::Address(spender)],
        })
    }

    pub fn active_proposals(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            function: ViewFunction::ActiveProposals,
            target: Some(config.contract(ContractKind::Governance)?),
            args: Vec::new(),
        })
    }

    pub async fn fetch(&self, caller: &dyn ContractCaller) -> Result<LedgerValue, ClientError> {
        match (&self.target, self.function) {
            (None, ViewFunction::NativeBalance) => {
                let owner = self
                    .args
                    .first()
                    .and_then(CallArg::as_address)
                    .ok_or_else(|| ClientError::Read("balance query without account".to_string()))?;
                caller.native_balance(owner).await.map(LedgerValue::Amount)
            }
            (Some(target), function) => caller.call(target, function.abi_name(), &self.args).await,
            (None, function) => Err(ClientError::Read(format!(
                "{} needs a target contract",
                function.abi_name()
            ))),
        }
    }
}
