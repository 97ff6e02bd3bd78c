use tracing::Instrument;

use crate::event::{Event, RawCommand};
use crate::machine::{Rejected, StateMachine};
use crate::observer::{NoopObserver, TransitionObserver};
use crate::snapshot::{self, RestoreError, Snapshot, SnapshotOf};
use crate::store::StoreError;
use crate::types::SequenceNumber;

/// The live, stateful instance of a [`StateMachine`]. It holds the current state, context and
/// version, accepts events one at a time and notifies its [`TransitionObserver`] of every accepted
/// transition.
///
/// An actor is an owned value: there is no shared registry of aggregates. Concurrent senders must
/// serialize access themselves, which `send(&mut self, ..)` enforces.
pub struct Actor<M, O = NoopObserver>
where
    M: StateMachine,
{
    snapshot: SnapshotOf<M>,
    observer: O,
}

impl<M> Actor<M>
where
    M: StateMachine,
{
    /// A fresh aggregate in the initial state, with an empty context, at version 0.
    pub fn create() -> Self {
        Self {
            snapshot: snapshot::initial::<M>(),
            observer: NoopObserver,
        }
    }

    /// A fresh aggregate notifying the given observer.
    pub fn with_observer<O>(observer: O) -> Actor<M, O>
    where
        O: TransitionObserver<M>,
    {
        Actor {
            snapshot: snapshot::initial::<M>(),
            observer,
        }
    }

    /// Rebuilds an aggregate straight from a snapshot, without going through the transition table.
    ///
    /// # Errors
    ///
    /// Will return an `Err` if the snapshot could not have been reached by any valid sequence of
    /// transitions.
    pub fn restore(snapshot: SnapshotOf<M>) -> Result<Self, RestoreError> {
        snapshot::validate::<M>(&snapshot)?;

        Ok(Self {
            snapshot,
            observer: NoopObserver,
        })
    }

    /// Same as [`Actor::restore`], from the JSON form of a snapshot.
    pub fn restore_json(value: serde_json::Value) -> Result<Self, RestoreError> {
        Ok(Self {
            snapshot: snapshot::from_json::<M>(value)?,
            observer: NoopObserver,
        })
    }
}

impl<M, O> Actor<M, O>
where
    M: StateMachine,
    O: TransitionObserver<M>,
{
    /// Offers an event to the aggregate.
    ///
    /// When the transition table accepts it, state, context and version move forward together, the
    /// observer is awaited with the emitted [`Event`] and the new snapshot, and the new snapshot is
    /// returned. When it does not, the aggregate is left untouched.
    ///
    /// # Errors
    ///
    /// [`SendError::Rejected`] if the event is not accepted in the current state.
    /// [`SendError::Store`] if the observer failed: the aggregate has advanced regardless.
    pub async fn send(&mut self, event: M::Event) -> Result<SnapshotOf<M>, SendErrorOf<M>> {
        let (machine_state, context) = M::transition(self.snapshot.machine_state, &self.snapshot.context, &event)?;
        let version: SequenceNumber = self.snapshot.version + 1;
        let record: Event = Event::record::<M>(&event, M::aggregate_id(&context), version)?;

        self.snapshot = Snapshot::new(machine_state, context, version);

        let span = tracing::debug_span!(
            "feedback_es.observer",
            event_id = %record.id,
            kind = %record.kind,
            version,
            observer = self.observer.name()
        );

        if let Err(error) = self
            .observer
            .on_transition(&record, &self.snapshot)
            .instrument(span)
            .await
        {
            tracing::error!({
                event_id = %record.id,
                aggregate_id = ?record.aggregate_id,
                version,
                observer = self.observer.name(),
                error = ?error,
            }, "observer failed to handle transition");

            return Err(SendError::Store {
                snapshot: Box::new(self.snapshot.clone()),
                source: error,
            });
        }

        Ok(self.snapshot.clone())
    }

    /// Offers an untyped `{ type, payload }` command to the aggregate. Unknown kinds and malformed
    /// payloads are rejected without touching the aggregate.
    pub async fn send_command(&mut self, command: RawCommand) -> Result<SnapshotOf<M>, SendErrorOf<M>> {
        let event: M::Event = command.parse::<M>().map_err(Rejected::<M::State>::Invalid)?;
        self.send(event).await
    }
}

impl<M, O> Actor<M, O>
where
    M: StateMachine,
{
    /// Returns a copy of the current snapshot. Mutating it has no effect on the aggregate.
    pub fn current_snapshot(&self) -> SnapshotOf<M> {
        self.snapshot.clone()
    }

    pub fn state(&self) -> M::State {
        self.snapshot.machine_state
    }

    pub fn context(&self) -> &M::Context {
        &self.snapshot.context
    }

    pub fn version(&self) -> SequenceNumber {
        self.snapshot.version
    }

    /// The identifier of the aggregate, once known.
    pub fn aggregate_id(&self) -> Option<&str> {
        M::aggregate_id(&self.snapshot.context)
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Swaps the observer, keeping state, context and version.
    pub fn attach<P>(self, observer: P) -> Actor<M, P>
    where
        P: TransitionObserver<M>,
    {
        Actor {
            snapshot: self.snapshot,
            observer,
        }
    }

    /// Detaches the observer and consumes the actor, returning its final snapshot.
    pub fn stop(self) -> SnapshotOf<M> {
        self.snapshot
    }

    /// Applies a historical event without notifying the observer.
    pub(crate) fn apply(&mut self, event: &M::Event) -> Result<(), Rejected<M::State>> {
        let (machine_state, context) = M::transition(self.snapshot.machine_state, &self.snapshot.context, event)?;
        self.snapshot = Snapshot::new(machine_state, context, self.snapshot.version + 1);
        Ok(())
    }

    /// Moves the version to a sequence number taken from the log, keeping state and context.
    pub(crate) fn align_version(&mut self, version: SequenceNumber) {
        self.snapshot.version = version;
    }
}

impl<M, O> std::fmt::Debug for Actor<M, O>
where
    M: StateMachine,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("machine", &M::NAME)
            .field("snapshot", &self.snapshot)
            .field("observer", &std::any::type_name::<O>())
            .finish()
    }
}

/// Errors returned by [`Actor::send`].
#[derive(Debug, thiserror::Error)]
pub enum SendError<S, C>
where
    S: std::fmt::Debug + std::fmt::Display + 'static,
    C: std::fmt::Debug,
{
    /// The event was not accepted. Nothing changed.
    #[error(transparent)]
    Rejected(#[from] Rejected<S>),
    /// The transition was accepted but the observer failed. The aggregate is at `snapshot`.
    #[error("transition to version {} accepted but not observed: {source}", .snapshot.version())]
    Store {
        snapshot: Box<Snapshot<S, C>>,
        source: StoreError,
    },
    /// The event payload could not be serialized. Nothing changed.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// The [`SendError`] type of a given [`StateMachine`].
pub type SendErrorOf<M> = SendError<<M as StateMachine>::State, <M as StateMachine>::Context>;

impl<S, C> SendError<S, C>
where
    S: std::fmt::Debug + std::fmt::Display + 'static,
    C: std::fmt::Debug,
{
    /// Whether the aggregate moved forward despite the error.
    pub const fn advanced(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}
