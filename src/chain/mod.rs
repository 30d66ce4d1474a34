//! Network collaborator: the caller trait, its wire-level types, and the simulated ledger.

mod caller;
pub mod simulated;
mod types;

pub use caller::ContractCaller;
pub use types::{
    Address, CallArg, LedgerValue, Proposal, ProposalStatus, ReceiptStatus, TxHash, VoteChoice,
};
