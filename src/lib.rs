//! An event-sourced aggregate runtime driven by a finite state machine.
//!
//! A [`StateMachine`] describes states, events and the transition table. An [`Actor`] is a live
//! instance of it: it accepts events one at a time, and hands every accepted transition to a
//! [`TransitionObserver`] as an [`Event`] plus the resulting [`Snapshot`]. An actor can be rebuilt
//! either by replaying its events ([`Replayer`]) or by restoring a snapshot ([`Actor::restore`]),
//! and both paths agree with the live one.
//!
//! The [`feedback`] module holds the Feedback aggregate, built on this runtime.

pub use crate::actor::{Actor, SendError, SendErrorOf};
pub use crate::event::{Event, RawCommand};
pub use crate::machine::{MachineEvent, ParseError, Rejected, StateMachine};
pub use crate::manager::{AggregateManager, LoadError, ManagedActor, ManagerConfig};
pub use crate::observer::{NoopObserver, PersistingObserver, SnapshotCadence, TransitionObserver};
pub use crate::replay::{replay, ReplayError, ReplayErrorOf, ReplayPolicy, Replayed, Replayer, SequenceGap, SkippedEvent};
pub use crate::snapshot::{RestoreError, Snapshot, SnapshotOf};

mod actor;
mod event;
pub mod feedback;
mod machine;
mod manager;
mod observer;
mod replay;
pub mod snapshot;
#[cfg(feature = "postgres")]
mod sql;
pub mod store;
pub mod types;
