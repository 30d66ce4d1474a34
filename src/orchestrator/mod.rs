mod governance;
mod notify;
mod vault;

pub use governance::GovernanceFlow;
pub use notify::{MessageType, Notification, Notifier, OperationKey};
pub use vault::{FlowKind, Phase, VaultFlow};

use crate::transactions::{TransactionHandle, TxState};

/// One submission attempt: the handle being observed and the key its outcome is reported under
#[derive(Debug, Clone)]
pub struct Attempt {
    pub key: OperationKey,
    pub handle: TransactionHandle,
}

impl Attempt {
    pub fn new(key: OperationKey, handle: TransactionHandle) -> Self {
        Self { key, handle }
    }

    pub fn state(&self) -> TxState {
        self.handle.state()
    }

    pub fn is_live(&self) -> bool {
        !self.handle.is_terminal()
    }
}
