use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use tokio::sync::watch;

use crate::chain::TxHash;
use crate::error::ClientError;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxState {
    Unsent,
    Submitted,
    Pending,
    Confirmed,
    Failed,
}

impl TxState {
    // Confirmed and Failed share a rank: neither can follow the other
    fn rank(self) -> u8 {
        match self {
            TxState::Unsent => 0,
            TxState::Submitted => 1,
            TxState::Pending => 2,
            TxState::Confirmed | TxState::Failed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TxState::Confirmed | TxState::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            TxState::Unsent => "unsent",
            TxState::Submitted => "awaiting signature",
            TxState::Pending => "pending",
            TxState::Confirmed => "confirmed",
            TxState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSnapshot {
    pub hash: Option<TxHash>,
    pub state: TxState,
    pub error: Option<ClientError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

/// Write side of a handle. Only ever moves a handle forward.
pub struct TxTracker {
    sender: watch::Sender<TxSnapshot>,
}

impl TxTracker {
    pub fn advance(&self, state: TxState, hash: Option<TxHash>, error: Option<ClientError>) -> bool {
        self.sender.send_if_modified(|snapshot| {
            if state.rank() <= snapshot.state.rank() {
                return false;
            }
            snapshot.state = state;
            if hash.is_some() {
                snapshot.hash = hash;
            }
            snapshot.error = error;
            true
        })
    }

    pub fn submitted(&self) -> bool {
        self.advance(TxState::Submitted, None, None)
    }

    pub fn pending(&self, hash: TxHash) -> bool {
        self.advance(TxState::Pending, Some(hash), None)
    }

    pub fn confirm(&self) -> bool {
        self.advance(TxState::Confirmed, None, None)
    }

    pub fn fail(&self, error: ClientError) -> bool {
        self.advance(TxState::Failed, None, Some(error))
    }
}

/// Read side of one submitted write. Cheap to clone; clones observe the same transaction.
#[derive(Debug, Clone)]
pub struct TransactionHandle {
    id: HandleId,
    function: String,
    created_at: SystemTime,
    receiver: watch::Receiver<TxSnapshot>,
}

impl TransactionHandle {
    /// A fresh `Unsent` handle and the tracker that drives it
    pub fn channel(function: &str) -> (TxTracker, TransactionHandle) {
        let (sender, receiver) = watch::channel(TxSnapshot {
            hash: None,
            state: TxState::Unsent,
            error: None,
        });
        let handle = TransactionHandle {
            id: HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)),
            function: function.to_string(),
            created_at: SystemTime::now(),
            receiver,
        };
        (TxTracker { sender }, handle)
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn snapshot(&self) -> TxSnapshot {
        self.receiver.borrow().clone()
    }

    pub fn state(&self) -> TxState {
        self.receiver.borrow().state
    }

    pub fn hash(&self) -> Option<TxHash> {
        self.receiver.borrow().hash.clone()
    }

    pub fn error(&self) -> Option<ClientError> {
        self.receiver.borrow().error.clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Resolve once the handle reached `target` or anything after it
    #[cfg(test)]
    pub async fn reached(&mut self, target: TxState) -> TxState {
        let _ = self
            .receiver
            .wait_for(|snapshot| snapshot.state.rank() >= target.rank())
            .await;
        self.state()
    }

    #[cfg(test)]
    pub async fn settled(&mut self) -> TxState {
        self.reached(TxState::Confirmed).await
    }
}
