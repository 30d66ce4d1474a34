use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::query::ReadQuery;
use crate::chain::{ContractCaller, LedgerValue, Proposal};
use crate::error::ClientError;

/// What the UI gets for one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadView {
    pub value: LedgerValue,
    pub is_loading: bool,
    pub is_error: bool,
    pub error: Option<String>,
}

impl ReadView {
    pub fn amount(&self) -> u128 {
        self.value.amount().unwrap_or(0)
    }

    pub fn proposals(&self) -> &[Proposal] {
        self.value.proposals().unwrap_or(&[])
    }
}

#[derive(Debug, Default)]
struct CacheEntry {
    value: Option<LedgerValue>,
    error: Option<String>,
    in_flight: bool,
    /// Invalidated while a fetch was running; read again as soon as it lands
    dirty: bool,
    /// `None` means due immediately
    next_due: Option<Instant>,
}

struct FetchResult {
    query: ReadQuery,
    generation: u64,
    outcome: Result<LedgerValue, ClientError>,
}

/// Polled view of on-chain reads.
///
/// Fetches run on spawned tasks and report back over a channel that [`poll`](Self::poll)
/// drains, so the UI loop never waits on the network. Values are replaced whole.
pub struct LedgerCache {
    caller: Arc<dyn ContractCaller>,
    interval: Duration,
    entries: HashMap<ReadQuery, CacheEntry>,
    generation: u64,
    results_tx: mpsc::UnboundedSender<FetchResult>,
    results_rx: mpsc::UnboundedReceiver<FetchResult>,
}

impl LedgerCache {
    pub fn new(caller: Arc<dyn ContractCaller>, interval: Duration) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            caller,
            interval,
            entries: HashMap::new(),
            generation: 0,
            results_tx,
            results_rx,
        }
    }

    /// Register a query for polling. New queries are due immediately.
    pub fn watch(&mut self, query: &ReadQuery) {
        if !self.entries.contains_key(query) {
            debug!(function = query.function.abi_name(), "watching query");
            self.entries.insert(query.clone(), CacheEntry::default());
        }
    }

    pub fn read(&self, query: &ReadQuery) -> ReadView {
        match self.entries.get(query) {
            Some(entry) => ReadView {
                value: entry
                    .value
                    .clone()
                    .unwrap_or_else(|| query.function.default_value()),
                is_loading: entry.value.is_none() && entry.error.is_none(),
                is_error: entry.error.is_some(),
                error: entry.error.clone(),
            },
            None => ReadView {
                value: query.function.default_value(),
                is_loading: true,
                is_error: false,
                error: None,
            },
        }
    }

    /// Re-read `query` on the next poll instead of waiting for its interval
    pub fn invalidate(&mut self, query: &ReadQuery) {
        let entry = self.entries.entry(query.clone()).or_default();
        if entry.in_flight {
            entry.dirty = true;
        } else {
            entry.next_due = None;
        }
        debug!(function = query.function.abi_name(), "query invalidated");
    }

    /// Forget everything; used when the account or network changes.
    /// Fetches already running land in the old generation and are dropped.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn is_fetching(&self, query: &ReadQuery) -> bool {
        self.entries.get(query).map(|e| e.in_flight).unwrap_or(false)
    }

    /// Apply finished fetches and start the ones that are due. Returns how many started.
    pub fn poll(&mut self, now: Instant) -> usize {
        while let Ok(result) = self.results_rx.try_recv() {
            self.apply(result, now);
        }

        let due: Vec<ReadQuery> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.in_flight && entry.next_due.map_or(true, |at| at <= now))
            .map(|(query, _)| query.clone())
            .collect();

        for query in &due {
            if let Some(entry) = self.entries.get_mut(query) {
                entry.in_flight = true;
            }
            self.spawn_fetch(query.clone());
        }
        due.len()
    }

    fn spawn_fetch(&self, query: ReadQuery) {
        let caller = Arc::clone(&self.caller);
        let results = self.results_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let outcome = query.fetch(caller.as_ref()).await;
            // Receiver gone means the cache was dropped; nothing left to update
            let _ = results.send(FetchResult {
                query,
                generation,
                outcome,
            });
        });
    }

    fn apply(&mut self, result: FetchResult, now: Instant) {
        if result.generation != self.generation {
            return;
        }
        let Some(entry) = self.entries.get_mut(&result.query) else {
            return;
        };
        entry.in_flight = false;
        match result.outcome {
            Ok(value) => {
                entry.value = Some(value);
                entry.error = None;
            }
            Err(err) => {
                if entry.error.is_none() {
                    warn!(function = result.query.function.abi_name(), %err, "read failed; serving last value");
                }
                entry.error = Some(err.to_string());
            }
        }
        entry.next_due = if entry.dirty {
            None
        } else {
            Some(now + self.interval)
        };
        entry.dirty = false;
    }

    /// Wait for one fetch to land and apply it
    #[cfg(test)]
    pub async fn settle_one(&mut self, now: Instant) {
        if let Some(result) = self.results_rx.recv().await {
            self.apply(result, now);
        }
    }
}
