use std::collections::{HashSet, VecDeque};
use std::fmt;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Error,
    Info,
    Success,
}

/// One logical operation instance: a single submission attempt.
/// Retries and new operations always get a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationKey(u64);

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Confirmed,
    Failed,
}

impl Outcome {
    fn message_type(self) -> MessageType {
        match self {
            Outcome::Confirmed => MessageType::Success,
            Outcome::Failed => MessageType::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message_type: MessageType,
    pub message: String,
}

/// Toast queue with at-most-once delivery per operation outcome
#[derive(Debug, Default)]
pub struct Notifier {
    next_key: u64,
    fired: HashSet<OperationKey>,
    outbox: VecDeque<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_key(&mut self) -> OperationKey {
        self.next_key += 1;
        OperationKey(self.next_key)
    }

    /// Queue `message` unless `key` already produced a terminal notification.
    /// Returns whether the message was queued.
    pub fn fire_once(&mut self, key: OperationKey, outcome: Outcome, message: impl Into<String>) -> bool {
        if !self.fired.insert(key) {
            return false;
        }
        let message = message.into();
        debug!(%key, ?outcome, %message, "notification fired");
        self.outbox.push_back(Notification {
            message_type: outcome.message_type(),
            message,
        });
        true
    }

    #[cfg(test)]
    pub fn has_fired(&self, key: OperationKey) -> bool {
        self.fired.contains(&key)
    }

    /// Forget outcomes of attempts nobody observes any more. Only a held attempt can be
    /// re-observed, so this keeps the set as small as the live attempts.
    pub fn retain_fired(&mut self, held: impl IntoIterator<Item = OperationKey>) {
        let held: HashSet<OperationKey> = held.into_iter().collect();
        let before = self.fired.len();
        self.fired.retain(|key| held.contains(key));
        if self.fired.len() < before {
            debug!(dropped = before - self.fired.len(), "forgot settled operations");
        }
    }

    /// Immediate feedback for a user action; not deduplicated
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(MessageType::Info, message.into());
    }

    /// Local rejection such as a validation or configuration error
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(MessageType::Error, message.into());
    }

    fn push(&mut self, message_type: MessageType, message: String) {
        self.outbox.push_back(Notification {
            message_type,
            message,
        });
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        self.outbox.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_key_however_often_observed() {
        let mut notifier = Notifier::new();
        let key = notifier.next_key();
        let delivered = (0..5)
            .filter(|_| notifier.fire_once(key, Outcome::Confirmed, "Deposited 50 mDAI"))
            .count();
        assert_eq!(delivered, 1);
        assert!(notifier.has_fired(key));

        let queued = notifier.drain();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].message_type, MessageType::Success);
        assert!(notifier.drain().is_empty());
    }

    #[test]
    fn distinct_attempts_get_distinct_keys() {
        let mut notifier = Notifier::new();
        let first = notifier.next_key();
        let retry = notifier.next_key();
        assert_ne!(first, retry);
        assert!(notifier.fire_once(first, Outcome::Failed, "Vote failed"));
        assert!(notifier.fire_once(retry, Outcome::Failed, "Vote failed"));
        assert!(!notifier.fire_once(first, Outcome::Confirmed, "late"));
        assert_eq!(notifier.drain().len(), 2);
    }

    #[test]
    fn retain_keeps_only_held_keys() {
        let mut notifier = Notifier::new();
        let dropped = notifier.next_key();
        let held = notifier.next_key();
        notifier.fire_once(dropped, Outcome::Failed, "Withdraw failed");
        notifier.fire_once(held, Outcome::Confirmed, "Proposal created");

        notifier.retain_fired([held]);
        assert!(!notifier.has_fired(dropped));
        assert!(notifier.has_fired(held));
        assert!(!notifier.fire_once(held, Outcome::Confirmed, "Proposal created"));
    }

    #[test]
    fn info_is_not_deduplicated() {
        let mut notifier = Notifier::new();
        notifier.info("Approval transaction submitted");
        notifier.info("Approval transaction submitted");
        assert_eq!(notifier.drain().len(), 2);
    }
}
