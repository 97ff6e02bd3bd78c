use std::sync::Arc;

use async_trait::async_trait;

use crate::event::Event;
use crate::machine::StateMachine;
use crate::snapshot::SnapshotOf;
use crate::store::{EventStore, SnapshotStore, StoreError};
use crate::types::SequenceNumber;

/// This trait is used to implement a `TransitionObserver`. An observer is awaited by the
/// [`crate::Actor`] after every accepted transition, with the emitted event and the resulting
/// snapshot, before `send` returns to its caller.
///
/// Observers are where persistence happens. A returned error is surfaced to the caller of `send`,
/// but the in-memory aggregate has already advanced and is never rolled back.
#[async_trait]
pub trait TransitionObserver<M>: Send + Sync
where
    M: StateMachine,
{
    /// Handle an accepted transition. Called exactly once per transition, in acceptance order.
    async fn on_transition(&self, event: &Event, snapshot: &SnapshotOf<M>) -> Result<(), StoreError>;

    /// The name of the observer. By default, this is the type name of the observer, but it can be
    /// overridden to provide a custom name. This name is used as part of tracing spans.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// An observer that does nothing. Used by freshly created, replayed and restored actors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl<M> TransitionObserver<M> for NoopObserver
where
    M: StateMachine,
{
    async fn on_transition(&self, _event: &Event, _snapshot: &SnapshotOf<M>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl<M, O> TransitionObserver<M> for Arc<O>
where
    M: StateMachine,
    O: TransitionObserver<M> + ?Sized,
{
    /// Deref call to [`TransitionObserver::on_transition`].
    async fn on_transition(&self, event: &Event, snapshot: &SnapshotOf<M>) -> Result<(), StoreError> {
        self.as_ref().on_transition(event, snapshot).await
    }

    /// Deref call to [`TransitionObserver::name`].
    fn name(&self) -> &'static str {
        self.as_ref().name()
    }
}

#[async_trait]
impl<M, O> TransitionObserver<M> for Box<O>
where
    M: StateMachine,
    O: TransitionObserver<M> + ?Sized,
{
    /// Deref call to [`TransitionObserver::on_transition`].
    async fn on_transition(&self, event: &Event, snapshot: &SnapshotOf<M>) -> Result<(), StoreError> {
        self.as_ref().on_transition(event, snapshot).await
    }

    /// Deref call to [`TransitionObserver::name`].
    fn name(&self) -> &'static str {
        self.as_ref().name()
    }
}

/// How often a [`PersistingObserver`] saves a snapshot next to the event it appends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnapshotCadence {
    /// A snapshot after every accepted event.
    #[default]
    EveryEvent,
    /// A snapshot every `n` accepted events. `Every(0)` never snapshots.
    Every(SequenceNumber),
    /// Events only.
    Never,
}

impl SnapshotCadence {
    /// Whether the snapshot reached at `version` should be saved.
    pub const fn is_due(self, version: SequenceNumber) -> bool {
        match self {
            Self::EveryEvent => true,
            Self::Every(n) => n > 0 && version % n == 0,
            Self::Never => false,
        }
    }
}

/// Observer forwarding every accepted transition to a store: the event is appended first, then
/// the snapshot is saved if the [`SnapshotCadence`] says so.
#[derive(Debug, Clone)]
pub struct PersistingObserver<S> {
    store: S,
    cadence: SnapshotCadence,
}

impl<S> PersistingObserver<S> {
    pub const fn new(store: S) -> Self {
        Self {
            store,
            cadence: SnapshotCadence::EveryEvent,
        }
    }

    pub fn with_cadence(self, cadence: SnapshotCadence) -> Self {
        Self { cadence, ..self }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn cadence(&self) -> SnapshotCadence {
        self.cadence
    }
}

#[async_trait]
impl<M, S> TransitionObserver<M> for PersistingObserver<S>
where
    M: StateMachine,
    S: EventStore + SnapshotStore<M>,
{
    async fn on_transition(&self, event: &Event, snapshot: &SnapshotOf<M>) -> Result<(), StoreError> {
        self.store.append_event(event).await?;

        if !self.cadence.is_due(snapshot.version()) {
            return Ok(());
        }

        match event.aggregate_id.as_deref() {
            Some(aggregate_id) => self.store.save_snapshot(aggregate_id, snapshot).await,
            None => Err(StoreError::MissingAggregateId(event.id)),
        }
    }
}
