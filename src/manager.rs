use std::marker::PhantomData;
use std::sync::Arc;

use typed_builder::TypedBuilder;

use crate::actor::Actor;
use crate::event::Event;
use crate::machine::StateMachine;
use crate::observer::{PersistingObserver, SnapshotCadence};
use crate::replay::{ReplayError, ReplayPolicy, Replayed, Replayer};
use crate::snapshot::SnapshotOf;
use crate::store::{EventStore, SnapshotStore, StoreError};

/// Settings of an [`AggregateManager`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, TypedBuilder)]
pub struct ManagerConfig {
    /// How loads deal with stored events that do not replay.
    #[builder(default)]
    replay_policy: ReplayPolicy,
    /// How often managed actors save a snapshot next to their events.
    #[builder(default)]
    snapshot_cadence: SnapshotCadence,
}

impl ManagerConfig {
    pub const fn replay_policy(&self) -> ReplayPolicy {
        self.replay_policy
    }

    pub const fn snapshot_cadence(&self) -> SnapshotCadence {
        self.snapshot_cadence
    }
}

/// An actor persisting its transitions through the store of an [`AggregateManager`].
pub type ManagedActor<M, S> = Actor<M, PersistingObserver<Arc<S>>>;

/// The AggregateManager is responsible for coupling a [`StateMachine`] with a store, so that the
/// events can be persisted when accepted, and actors can be recovered from what was persisted.
///
/// The basic APIs are:
/// 1. create
/// 2. load
/// 3. load_from_events
pub struct AggregateManager<M, S>
where
    M: StateMachine,
{
    store: Arc<S>,
    config: ManagerConfig,
    _machine: PhantomData<M>,
}

impl<M, S> AggregateManager<M, S>
where
    M: StateMachine,
    S: EventStore + SnapshotStore<M>,
{
    /// Creates a new instance of an [`AggregateManager`].
    pub fn new(store: S) -> Self {
        Self::shared(Arc::new(store))
    }

    /// Creates a new instance of an [`AggregateManager`] over a store shared with other components.
    pub fn shared(store: Arc<S>) -> Self {
        Self {
            store,
            config: ManagerConfig::default(),
            _machine: PhantomData,
        }
    }

    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the internal store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// A fresh actor persisting through the store.
    pub fn create(&self) -> ManagedActor<M, S> {
        Actor::with_observer(self.observer())
    }

    /// Loads an aggregate instance from the store: its latest snapshot, if any, plus the events
    /// recorded after it, or else its whole history. Returns `None` if the store holds neither.
    ///
    /// A snapshot that does not decode or does not restore is ignored in favour of the full history.
    pub async fn load(&self, aggregate_id: &str) -> Result<Option<ManagedActor<M, S>>, LoadError<M::State>> {
        let snapshot: Option<SnapshotOf<M>> =
            match SnapshotStore::<M>::load_snapshot(self.store.as_ref(), aggregate_id).await {
                Ok(snapshot) => snapshot,
                Err(StoreError::Json(error)) => {
                    tracing::warn!({
                        aggregate_id = aggregate_id,
                        error = %error,
                    }, "stored snapshot does not decode, replaying the full history");

                    None
                }
                Err(error) => return Err(error.into()),
            };
        let events: Vec<Event> = EventStore::by_aggregate_id(self.store.as_ref(), aggregate_id).await?;

        let replayer = Replayer::new(self.config.replay_policy);

        let replayed: Replayed<M> = match snapshot {
            None if events.is_empty() => return Ok(None),
            None => replayer.replay(&events)?,
            Some(snapshot) => match replayer.replay_from::<M, _>(snapshot, &events) {
                Err(ReplayError::Restore(error)) => {
                    tracing::warn!({
                        aggregate_id = aggregate_id,
                        error = %error,
                    }, "stored snapshot does not restore, replaying the full history");

                    replayer.replay(&events)?
                }
                result => result?,
            },
        };

        Ok(Some(replayed.into_actor().attach(self.observer())))
    }

    /// Loads an aggregate instance by replaying its whole history, ignoring snapshots. Returns
    /// `None` if no event was recorded for it.
    pub async fn load_from_events(
        &self,
        aggregate_id: &str,
    ) -> Result<Option<ManagedActor<M, S>>, LoadError<M::State>> {
        let events: Vec<Event> = EventStore::by_aggregate_id(self.store.as_ref(), aggregate_id).await?;

        if events.is_empty() {
            return Ok(None);
        }

        let replayed: Replayed<M> = Replayer::new(self.config.replay_policy).replay(&events)?;

        Ok(Some(replayed.into_actor().attach(self.observer())))
    }

    fn observer(&self) -> PersistingObserver<Arc<S>> {
        PersistingObserver::new(Arc::clone(&self.store)).with_cadence(self.config.snapshot_cadence)
    }
}

impl<M, S> std::fmt::Debug for AggregateManager<M, S>
where
    M: StateMachine,
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateManager")
            .field("machine", &M::NAME)
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}

/// Errors returned while loading an aggregate through an [`AggregateManager`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError<S>
where
    S: std::fmt::Debug + std::fmt::Display + 'static,
{
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Replay(#[from] ReplayError<S>),
}
