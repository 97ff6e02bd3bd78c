use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::event::Event;
use crate::machine::StateMachine;
use crate::snapshot::SnapshotOf;
use crate::store::{EventStore, SnapshotStore, StoreError};

/// A store keeping events and snapshots in memory, shared behind a [`Mutex`].
///
/// Wrap it in an [`std::sync::Arc`] to share it between several actors or an
/// [`crate::AggregateManager`].
pub struct InMemoryStore<M>
where
    M: StateMachine,
{
    events: Mutex<Vec<Event>>,
    snapshots: Mutex<HashMap<String, SnapshotOf<M>>>,
}

impl<M> InMemoryStore<M>
where
    M: StateMachine,
{
    pub fn new() -> Self {
        Self {
            events: Mutex::new(vec![]),
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Every event appended so far, across all aggregates, in append order.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    /// Number of aggregates having at least one snapshot.
    pub fn snapshot_count(&self) -> usize {
        lock(&self.snapshots).len()
    }
}

impl<M> Default for InMemoryStore<M>
where
    M: StateMachine,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for InMemoryStore<M>
where
    M: StateMachine,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("name", &M::NAME)
            .field("events", &lock(&self.events).len())
            .field("snapshots", &lock(&self.snapshots).len())
            .finish()
    }
}

// A panic while holding the lock leaves the data consistent: every mutation is a single push or insert.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl<M> EventStore for InMemoryStore<M>
where
    M: StateMachine,
{
    async fn append_event(&self, event: &Event) -> Result<(), StoreError> {
        let aggregate_id = event
            .aggregate_id
            .as_deref()
            .ok_or(StoreError::MissingAggregateId(event.id))?;

        let mut events = lock(&self.events);
        let last = events
            .iter()
            .filter(|stored| stored.aggregate_id.as_deref() == Some(aggregate_id))
            .map(|stored| stored.sequence_number)
            .max()
            .unwrap_or(0);

        if event.sequence_number != last + 1 {
            return Err(StoreError::Conflict {
                aggregate_id: aggregate_id.to_string(),
                sequence_number: event.sequence_number,
            });
        }

        events.push(event.clone());
        Ok(())
    }

    async fn by_aggregate_id(&self, aggregate_id: &str) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = lock(&self.events)
            .iter()
            .filter(|event| event.aggregate_id.as_deref() == Some(aggregate_id))
            .cloned()
            .collect();

        events.sort_by_key(|event| event.sequence_number);
        Ok(events)
    }
}

#[async_trait]
impl<M> SnapshotStore<M> for InMemoryStore<M>
where
    M: StateMachine,
{
    async fn save_snapshot(&self, aggregate_id: &str, snapshot: &SnapshotOf<M>) -> Result<(), StoreError> {
        let mut snapshots = lock(&self.snapshots);

        match snapshots.get(aggregate_id) {
            Some(stored) if stored.version() > snapshot.version() => {
                tracing::debug!(
                    aggregate_id,
                    stored = stored.version(),
                    received = snapshot.version(),
                    "ignoring stale snapshot"
                );
            }
            _ => {
                let _ = snapshots.insert(aggregate_id.to_string(), snapshot.clone());
            }
        }

        Ok(())
    }

    async fn load_snapshot(&self, aggregate_id: &str) -> Result<Option<SnapshotOf<M>>, StoreError> {
        Ok(lock(&self.snapshots).get(aggregate_id).cloned())
    }
}
