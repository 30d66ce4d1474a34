use async_trait::async_trait;

use super::types::{Address, CallArg, LedgerValue, Receipt, TxHash};
use crate::error::ClientError;

/// Everything the client needs from the network.
///
/// Reads go through [`call`](ContractCaller::call) and
/// [`native_balance`](ContractCaller::native_balance). A write is split in two halves:
/// [`send`](ContractCaller::send) resolves once the node accepted the broadcast, and
/// [`wait_for_receipt`](ContractCaller::wait_for_receipt) resolves once it was mined.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    async fn call(
        &self,
        target: &Address,
        function: &str,
        args: &[CallArg],
    ) -> Result<LedgerValue, ClientError>;

    async fn native_balance(&self, account: &Address) -> Result<u128, ClientError>;

    async fn send(
        &self,
        from: &Address,
        target: &Address,
        function: &str,
        args: &[CallArg],
    ) -> Result<TxHash, ClientError>;

    async fn wait_for_receipt(&self, hash: &TxHash) -> Result<Receipt, ClientError>;
}
