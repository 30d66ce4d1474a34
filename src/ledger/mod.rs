//! Cached, polled view of on-chain reads.

mod cache;
mod query;

pub use cache::{LedgerCache, ReadView};
pub use query::ReadQuery;
