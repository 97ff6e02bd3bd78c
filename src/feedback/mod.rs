//! The feedback aggregate: a submitted piece of feedback that can be approved, then commented on,
//! or rejected for good.

pub use event::{AddComment, AddFeedback, EventKind, FeedbackEvent};
pub use machine::FeedbackMachine;
pub use state::{Feedback, FeedbackComment, FeedbackState};

mod event;
mod machine;
mod state;

/// Snapshot of a feedback aggregate.
pub type FeedbackSnapshot = crate::snapshot::SnapshotOf<FeedbackMachine>;

/// A live feedback aggregate.
pub type FeedbackActor<O = crate::NoopObserver> = crate::Actor<FeedbackMachine, O>;
