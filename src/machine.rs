use std::fmt::{Debug, Display};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::SequenceNumber;

/// A `StateMachine` is the static definition of an event-sourced aggregate: its states, its
/// context, the events it accepts and the transition table tying them together.
///
/// Implementations must be pure. [`StateMachine::transition`] is called both while handling live
/// commands and while replaying history, and the two paths are required to agree.
pub trait StateMachine: Send + Sync + 'static {
    /// Identifies the event stream of this aggregate type. Every emitted event carries it as its
    /// `eventStoreId`, and stores derive their table names from it.
    const NAME: &'static str;

    /// The closed set of machine states. Exactly one is active at any time.
    type State: Copy + Debug + Display + Eq + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// The data carried alongside the state. `Default` is the context of a fresh aggregate.
    type Context: Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// The tagged union of events accepted by the machine.
    type Event: MachineEvent;

    /// The state a freshly created aggregate starts in.
    fn initial_state() -> Self::State;

    /// Looks up the transition table. Returns the next state and context, or [`Rejected`] if the
    /// event is not accepted in the given state. Must never mutate anything.
    fn transition(
        state: Self::State,
        context: &Self::Context,
        event: &Self::Event,
    ) -> Result<(Self::State, Self::Context), Rejected<Self::State>>;

    /// The identifier of the aggregate instance, once the context carries one.
    fn aggregate_id(context: &Self::Context) -> Option<&str>;

    /// Checks that a `(state, context, version)` triple could have been produced by a valid
    /// sequence of transitions. Used when restoring from a snapshot, which bypasses the table.
    fn validate(state: Self::State, context: &Self::Context, version: SequenceNumber) -> Result<(), String>;
}

/// An event accepted by a [`StateMachine`]. It knows its own kind and how to move between its
/// typed form and the untyped `{ type, payload }` form used at the boundaries.
pub trait MachineEvent: Clone + Debug + Send + Sync + Sized + 'static {
    /// The closed set of event kinds.
    type Kind: Copy + Debug + Display + Eq + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;

    /// Serializes the payload of this event, without its kind.
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Parses an untyped kind and payload. Unknown kinds and payloads not matching the declared
    /// kind are errors.
    fn parse(kind: &str, payload: serde_json::Value) -> Result<Self, ParseError>;
}

/// Raised when an untyped event or command cannot be turned into a typed [`MachineEvent`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown event kind `{0}`")]
    UnknownKind(String),
    #[error("malformed {kind} payload: {reason}")]
    Malformed { kind: String, reason: String },
    #[error("event belongs to stream `{found}`, expected `{expected}`")]
    ForeignStream { expected: &'static str, found: String },
}

impl ParseError {
    /// Shorthand for a payload that decoded fine but violates the rules of its kind.
    pub fn malformed(kind: impl Display, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}

/// The outcome of an event that the transition table does not accept. This is an ordinary result,
/// not a failure of the runtime: the aggregate is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejected<S> {
    #[error("{kind} is not accepted in state {state}")]
    NoTransition { state: S, kind: String },
    #[error(transparent)]
    Invalid(#[from] ParseError),
}
