//! Write submission and per-transaction status tracking.

mod gateway;
mod handle;

pub use gateway::ContractGateway;
pub use handle::{TransactionHandle, TxState};

#[cfg(test)]
pub(crate) use gateway::fixtures;
