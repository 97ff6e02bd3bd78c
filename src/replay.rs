use std::borrow::Borrow;

use uuid::Uuid;

use crate::actor::Actor;
use crate::event::Event;
use crate::machine::{Rejected, StateMachine};
use crate::snapshot::{RestoreError, SnapshotOf};
use crate::types::SequenceNumber;

/// What the [`Replayer`] does with a historical event the transition table does not accept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplayPolicy {
    /// The whole replay fails on the first such event.
    #[default]
    FailFast,
    /// The event is skipped, logged and reported in [`Replayed::skipped`].
    SkipAndLog,
}

/// An event left out of a replay run with [`ReplayPolicy::SkipAndLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEvent {
    pub event_id: Uuid,
    pub sequence_number: SequenceNumber,
    pub kind: String,
    pub reason: String,
}

/// A hole in a history replayed with [`ReplayPolicy::SkipAndLog`]: the events from `expected` up to,
/// but excluding, `found` were never handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceGap {
    pub expected: SequenceNumber,
    pub found: SequenceNumber,
}

/// Outcome of a replay: the rebuilt actor, and the events that did not apply.
///
/// The actor's version is the sequence number of the last event handed over, skipped or not, so
/// that it keeps appending right after the history it was rebuilt from.
#[derive(Debug)]
pub struct Replayed<M>
where
    M: StateMachine,
{
    actor: Actor<M>,
    skipped: Vec<SkippedEvent>,
    gaps: Vec<SequenceGap>,
}

impl<M> Replayed<M>
where
    M: StateMachine,
{
    pub fn actor(&self) -> &Actor<M> {
        &self.actor
    }

    pub fn skipped(&self) -> &[SkippedEvent] {
        &self.skipped
    }

    pub fn gaps(&self) -> &[SequenceGap] {
        &self.gaps
    }

    pub fn into_actor(self) -> Actor<M> {
        self.actor
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError<S>
where
    S: std::fmt::Debug + std::fmt::Display + 'static,
{
    #[error("event {event_id} at sequence number {sequence_number} cannot be replayed: {source}")]
    Rejected {
        event_id: Uuid,
        sequence_number: SequenceNumber,
        source: Rejected<S>,
    },
    #[error("event {event_id} has sequence number {found}, expected {expected}")]
    OutOfSequence {
        event_id: Uuid,
        expected: SequenceNumber,
        found: SequenceNumber,
    },
    #[error(transparent)]
    Restore(#[from] RestoreError),
}

/// The [`ReplayError`] type of a given [`StateMachine`].
pub type ReplayErrorOf<M> = ReplayError<<M as StateMachine>::State>;

/// Rebuilds actors from ordered event histories, by feeding every event back through the
/// transition table. Observers are never notified during a replay.
#[derive(Debug, Clone, Copy, Default)]
pub struct Replayer {
    policy: ReplayPolicy,
}

impl Replayer {
    pub const fn new(policy: ReplayPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> ReplayPolicy {
        self.policy
    }

    /// Replays `events`, in the given order, onto a freshly created actor.
    pub fn replay<M, I>(&self, events: I) -> Result<Replayed<M>, ReplayErrorOf<M>>
    where
        M: StateMachine,
        I: IntoIterator,
        I::Item: Borrow<Event>,
    {
        self.run(Actor::create(), events)
    }

    /// Restores `snapshot`, then replays the events of `tail` it does not already account for, that
    /// is the ones with a sequence number above its version.
    pub fn replay_from<M, I>(&self, snapshot: SnapshotOf<M>, tail: I) -> Result<Replayed<M>, ReplayErrorOf<M>>
    where
        M: StateMachine,
        I: IntoIterator,
        I::Item: Borrow<Event>,
    {
        let version: SequenceNumber = snapshot.version();
        let actor: Actor<M> = Actor::restore(snapshot)?;

        let tail = tail
            .into_iter()
            .filter(|event| Borrow::<Event>::borrow(event).sequence_number > version);

        self.run(actor, tail)
    }

    fn run<M, I>(&self, mut actor: Actor<M>, events: I) -> Result<Replayed<M>, ReplayErrorOf<M>>
    where
        M: StateMachine,
        I: IntoIterator,
        I::Item: Borrow<Event>,
    {
        let mut skipped: Vec<SkippedEvent> = vec![];
        let mut gaps: Vec<SequenceGap> = vec![];

        for event in events {
            let event: &Event = event.borrow();
            let expected: SequenceNumber = actor.version() + 1;

            if event.sequence_number != expected {
                if self.policy == ReplayPolicy::FailFast {
                    return Err(ReplayError::OutOfSequence {
                        event_id: event.id,
                        expected,
                        found: event.sequence_number,
                    });
                }

                if event.sequence_number < expected {
                    let reason = format!("sequence number {} already replayed", event.sequence_number);
                    skipped.push(skip(event, reason));
                    continue;
                }

                tracing::warn!({
                    event_id = %event.id,
                    expected = expected,
                    found = event.sequence_number,
                }, "gap in replayed history");

                gaps.push(SequenceGap {
                    expected,
                    found: event.sequence_number,
                });
            }

            let applied: Result<(), Rejected<M::State>> = event
                .decode::<M>()
                .map_err(Rejected::Invalid)
                .and_then(|typed| actor.apply(&typed));

            if let Err(rejected) = applied {
                if self.policy == ReplayPolicy::FailFast {
                    return Err(ReplayError::Rejected {
                        event_id: event.id,
                        sequence_number: event.sequence_number,
                        source: rejected,
                    });
                }

                skipped.push(skip(event, rejected.to_string()));
            }

            // The event holds its sequence number in the log whether it applied or not.
            actor.align_version(event.sequence_number);
        }

        Ok(Replayed { actor, skipped, gaps })
    }
}

fn skip(event: &Event, reason: String) -> SkippedEvent {
    tracing::warn!({
        event_id = %event.id,
        sequence_number = event.sequence_number,
        kind = event.kind.as_str(),
        reason = reason.as_str(),
    }, "skipping event that cannot be replayed");

    SkippedEvent {
        event_id: event.id,
        sequence_number: event.sequence_number,
        kind: event.kind.clone(),
        reason,
    }
}

/// Replays `events` onto a freshly created actor, failing on the first event that does not apply.
pub fn replay<M, I>(events: I) -> Result<Actor<M>, ReplayErrorOf<M>>
where
    M: StateMachine,
    I: IntoIterator,
    I::Item: Borrow<Event>,
{
    Ok(Replayer::default().replay(events)?.into_actor())
}
