use serde::{Deserialize, Serialize};

use crate::machine::StateMachine;
use crate::types::SequenceNumber;

/// A point-in-time, self-contained record of an aggregate: the active machine state, the context
/// and the number of events accepted to reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<S, C> {
    pub(crate) machine_state: S,
    pub(crate) context: C,
    pub(crate) version: SequenceNumber,
}

/// The [`Snapshot`] type of a given [`StateMachine`].
pub type SnapshotOf<M> = Snapshot<<M as StateMachine>::State, <M as StateMachine>::Context>;

impl<S, C> Snapshot<S, C> {
    /// Assembles a snapshot from its parts. Nothing is validated until it is restored.
    pub const fn new(machine_state: S, context: C, version: SequenceNumber) -> Self {
        Self {
            machine_state,
            context,
            version,
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    pub const fn version(&self) -> SequenceNumber {
        self.version
    }
}

impl<S: Copy, C> Snapshot<S, C> {
    pub const fn machine_state(&self) -> S {
        self.machine_state
    }
}

/// The snapshot of a freshly created aggregate.
pub fn initial<M: StateMachine>() -> SnapshotOf<M> {
    Snapshot::new(M::initial_state(), M::Context::default(), 0)
}

/// Checks that a snapshot could have been produced by a valid sequence of transitions of `M`.
pub fn validate<M: StateMachine>(snapshot: &SnapshotOf<M>) -> Result<(), RestoreError> {
    if snapshot.version < 0 {
        return Err(RestoreError::invalid(snapshot, "negative version".to_string()));
    }

    M::validate(snapshot.machine_state, &snapshot.context, snapshot.version)
        .map_err(|reason| RestoreError::invalid(snapshot, reason))
}

/// Deserializes and validates a snapshot of `M` stored as JSON.
pub fn from_json<M: StateMachine>(value: serde_json::Value) -> Result<SnapshotOf<M>, RestoreError> {
    let snapshot: SnapshotOf<M> = serde_json::from_value(value)?;
    validate::<M>(&snapshot)?;
    Ok(snapshot)
}

/// Raised when a snapshot cannot be turned back into an aggregate.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    /// The snapshot is well formed but could not have been reached through the transition table.
    #[error("invalid {state} snapshot at version {version}: {reason}")]
    Invalid {
        state: String,
        version: SequenceNumber,
        reason: String,
    },
    /// The snapshot names an unknown state or lacks required fields.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RestoreError {
    fn invalid<S: std::fmt::Display, C>(snapshot: &Snapshot<S, C>, reason: String) -> Self {
        Self::Invalid {
            state: snapshot.machine_state.to_string(),
            version: snapshot.version,
            reason,
        }
    }
}
