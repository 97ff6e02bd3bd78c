use std::ops::Deref;

use async_trait::async_trait;
use uuid::Uuid;

use crate::event::Event;
use crate::machine::StateMachine;
use crate::snapshot::SnapshotOf;
use crate::types::SequenceNumber;

pub use memory::InMemoryStore;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

/// An `EventStore` is responsible for persisting the events an aggregate emits, and loading the
/// events that represent an aggregate's history.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a single event. The event's sequence number must directly follow the last one
    /// persisted for its aggregate, otherwise [`StoreError::Conflict`] is returned.
    async fn append_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Loads the events that an aggregate instance has emitted in the past, ordered by sequence
    /// number.
    async fn by_aggregate_id(&self, aggregate_id: &str) -> Result<Vec<Event>, StoreError>;
}

/// A `SnapshotStore` keeps the latest snapshot of each aggregate instance.
#[async_trait]
pub trait SnapshotStore<M>: Send + Sync
where
    M: StateMachine,
{
    /// Saves a snapshot. A snapshot older than the one already stored is ignored.
    async fn save_snapshot(&self, aggregate_id: &str, snapshot: &SnapshotOf<M>) -> Result<(), StoreError>;

    /// Loads the latest snapshot of an aggregate instance, if any.
    async fn load_snapshot(&self, aggregate_id: &str) -> Result<Option<SnapshotOf<M>>, StoreError>;
}

/// Blanket implementation making an [`EventStore`] every (smart) pointer to an [`EventStore`],
/// e.g. `&Store`, `Box<Store>`, `Arc<Store>`.
#[async_trait]
impl<T, S> EventStore for T
where
    S: EventStore + ?Sized,
    T: Deref<Target = S> + Send + Sync,
{
    /// Deref call to [`EventStore::append_event`].
    async fn append_event(&self, event: &Event) -> Result<(), StoreError> {
        self.deref().append_event(event).await
    }

    /// Deref call to [`EventStore::by_aggregate_id`].
    async fn by_aggregate_id(&self, aggregate_id: &str) -> Result<Vec<Event>, StoreError> {
        self.deref().by_aggregate_id(aggregate_id).await
    }
}

/// Blanket implementation making a [`SnapshotStore`] every (smart) pointer to a [`SnapshotStore`].
#[async_trait]
impl<M, T, S> SnapshotStore<M> for T
where
    M: StateMachine,
    S: SnapshotStore<M> + ?Sized,
    T: Deref<Target = S> + Send + Sync,
{
    /// Deref call to [`SnapshotStore::save_snapshot`].
    async fn save_snapshot(&self, aggregate_id: &str, snapshot: &SnapshotOf<M>) -> Result<(), StoreError> {
        self.deref().save_snapshot(aggregate_id, snapshot).await
    }

    /// Deref call to [`SnapshotStore::load_snapshot`].
    async fn load_snapshot(&self, aggregate_id: &str) -> Result<Option<SnapshotOf<M>>, StoreError> {
        self.deref().load_snapshot(aggregate_id).await
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Another event already holds this sequence number, or the one before it is missing.
    #[error("sequence number {sequence_number} of aggregate `{aggregate_id}` is not the next one")]
    Conflict {
        aggregate_id: String,
        sequence_number: SequenceNumber,
    },
    /// Events emitted before the aggregate is identified cannot be stored by aggregate.
    #[error("event {0} carries no aggregate id")]
    MissingAggregateId(Uuid),
    /// Serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Sql error
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    /// Error raised by any other storage technology.
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}
