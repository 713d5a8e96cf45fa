//! Optimistic list state reconciled against the backend.
//!
//! Every mutation is applied locally at call time and tagged with a request
//! sequence number. It stays pending until its own request resolves. When the
//! backend answers, its canonical list replaces the confirmed state only if no
//! later request has been applied yet, and every still-pending mutation is
//! replayed on top of it. A successful add or complete whose answer arrives
//! after a later one was applied triggers a refresh.

use std::{
    collections::BTreeMap,
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::{
    domain::{Item, ItemId},
    protocol::CanonicalList,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, TodoBackend};

const EVENT_CAPACITY: usize = 256;

/// What happens to an optimistic mutation whose request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Rollback,
    KeepOptimistic,
}

/// A backend request that can be issued again through
/// [`ListSynchronizer::retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Add(Item),
    Complete(ItemId),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Fetch => f.write_str("fetch items"),
            Operation::Add(item) => write!(f, "add '{}'", item.label),
            Operation::Complete(item_id) => write!(f, "complete item {item_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    ItemsChanged(Vec<Item>),
    SyncFailed { operation: Operation, message: String },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("list synchronizer is already initialized")]
    AlreadyInitialized,
    #[error("{operation} failed: {source}")]
    Backend {
        operation: Operation,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Clone)]
enum Mutation {
    Append(Item),
    Remove(ItemId),
}

impl Mutation {
    fn apply(&self, items: &mut Vec<Item>) {
        match self {
            Mutation::Append(item) => items.push(item.clone()),
            Mutation::Remove(item_id) => items.retain(|item| item.id.as_ref() != Some(item_id)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Applied,
    Stale,
}

#[derive(Debug, Default)]
struct SyncState {
    /// Last canonical list applied, plus kept failures under `KeepOptimistic`.
    confirmed: Vec<Item>,
    /// `confirmed` with pending mutations replayed; what the UI renders.
    items: Vec<Item>,
    pending: BTreeMap<u64, Mutation>,
    next_seq: u64,
    applied_seq: u64,
    initialized: bool,
}

impl SyncState {
    fn begin(&mut self, mutation: Option<Mutation>) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        if let Some(mutation) = mutation {
            mutation.apply(&mut self.items);
            self.pending.insert(seq, mutation);
        }
        seq
    }

    /// Settles request `seq`. Its canonical list is only adopted when no later
    /// request has been applied yet.
    fn replace_all(&mut self, seq: u64, canonical: CanonicalList) -> Resolution {
        self.pending.remove(&seq);
        let resolution = if seq > self.applied_seq {
            self.applied_seq = seq;
            self.confirmed = canonical;
            Resolution::Applied
        } else {
            Resolution::Stale
        };
        self.recompute();
        resolution
    }

    /// Returns true when the rendered list changed.
    fn abandon(&mut self, seq: u64, policy: FailurePolicy) -> bool {
        let Some(mutation) = self.pending.remove(&seq) else {
            return false;
        };
        match policy {
            FailurePolicy::Rollback => {
                self.recompute();
                true
            }
            FailurePolicy::KeepOptimistic => {
                mutation.apply(&mut self.confirmed);
                false
            }
        }
    }

    fn recompute(&mut self) {
        let mut items = self.confirmed.clone();
        for mutation in self.pending.values() {
            mutation.apply(&mut items);
        }
        self.items = items;
    }
}

pub struct ListSynchronizer {
    backend: Arc<dyn TodoBackend>,
    policy: FailurePolicy,
    state: Mutex<SyncState>,
    events: broadcast::Sender<SyncEvent>,
}

impl ListSynchronizer {
    pub fn new(backend: Arc<dyn TodoBackend>) -> Self {
        Self::with_policy(backend, FailurePolicy::default())
    }

    pub fn with_policy(backend: Arc<dyn TodoBackend>, policy: FailurePolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            policy,
            state: Mutex::new(SyncState::default()),
            events,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn items(&self) -> Vec<Item> {
        self.lock().items.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Loads the canonical list. Only the first call is accepted; the claim
    /// is taken at call time, not when the future is first polled.
    pub fn initialize(&self) -> impl Future<Output = Result<(), SyncError>> + Send + '_ {
        let first = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.initialized, true)
        };
        async move {
            if !first {
                return Err(SyncError::AlreadyInitialized);
            }
            self.refresh().await
        }
    }

    pub async fn refresh(&self) -> Result<(), SyncError> {
        let seq = self.lock().begin(None);
        let result = self.backend.fetch_items().await;
        self.finish(seq, Operation::Fetch, result).map(|_| ())
    }

    /// Appends `item` before returning; the future performs the request.
    pub fn add(&self, item: Item) -> impl Future<Output = Result<(), SyncError>> + Send + '_ {
        let seq = self.begin(Mutation::Append(item.clone()));
        async move {
            let result = self.backend.add_item(&item).await;
            let resolution = self.finish(seq, Operation::Add(item), result)?;
            self.catch_up(resolution).await
        }
    }

    /// Drops every item with `item_id` before returning; the future asks the
    /// backend to complete it.
    pub fn remove(
        &self,
        item_id: ItemId,
    ) -> impl Future<Output = Result<(), SyncError>> + Send + '_ {
        let seq = self.begin(Mutation::Remove(item_id.clone()));
        async move {
            let result = self.backend.complete_item(&item_id).await;
            let resolution = self.finish(seq, Operation::Complete(item_id), result)?;
            self.catch_up(resolution).await
        }
    }

    pub async fn retry(&self, operation: Operation) -> Result<(), SyncError> {
        info!(%operation, "retrying");
        match operation {
            Operation::Fetch => self.refresh().await,
            Operation::Add(item) => self.add(item).await,
            Operation::Complete(item_id) => self.remove(item_id).await,
        }
    }

    /// The backend accepted a change whose answer lost the race; fetch again so
    /// the list reflects it.
    async fn catch_up(&self, resolution: Resolution) -> Result<(), SyncError> {
        match resolution {
            Resolution::Applied => Ok(()),
            Resolution::Stale => self.refresh().await,
        }
    }

    fn begin(&self, mutation: Mutation) -> u64 {
        let mut state = self.lock();
        let seq = state.begin(Some(mutation));
        self.emit(SyncEvent::ItemsChanged(state.items.clone()));
        seq
    }

    fn finish(
        &self,
        seq: u64,
        operation: Operation,
        result: Result<CanonicalList, BackendError>,
    ) -> Result<Resolution, SyncError> {
        let mut state = self.lock();
        match result {
            Ok(canonical) => {
                let resolution = state.replace_all(seq, canonical);
                match resolution {
                    Resolution::Applied => {
                        debug!(
                            seq,
                            %operation,
                            items = state.items.len(),
                            "applied canonical list"
                        );
                    }
                    Resolution::Stale => {
                        debug!(
                            seq,
                            applied_seq = state.applied_seq,
                            %operation,
                            "discarding stale response"
                        );
                    }
                }
                self.emit(SyncEvent::ItemsChanged(state.items.clone()));
                Ok(resolution)
            }
            Err(source) => {
                warn!(
                    seq,
                    %operation,
                    error = %source,
                    policy = ?self.policy,
                    "backend request failed"
                );
                if state.abandon(seq, self.policy) {
                    self.emit(SyncEvent::ItemsChanged(state.items.clone()));
                }
                self.emit(SyncEvent::SyncFailed {
                    operation: operation.clone(),
                    message: source.to_string(),
                });
                Err(SyncError::Backend { operation, source })
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
