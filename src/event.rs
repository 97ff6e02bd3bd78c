use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::machine::{MachineEvent, ParseError, StateMachine};
use crate::types::SequenceNumber;

/// An `Event` is the immutable record of one accepted transition, as handed to observers and
/// stores. Its payload is kept untyped so that it can be persisted and read back by any storage
/// technology; [`Event::decode`] turns it back into the machine's typed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Uniquely identifies an event among all events emitted from all aggregates.
    pub id: Uuid,
    /// The stream of the aggregate type that emitted the event, see [`StateMachine::NAME`].
    pub event_store_id: String,
    /// The aggregate instance that emitted the event, if the context already identified it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_id: Option<String>,
    /// The version the aggregate reached by accepting this event.
    pub sequence_number: SequenceNumber,
    /// The kind of the event.
    #[serde(rename = "type")]
    pub kind: String,
    /// The payload of the event, shaped according to its kind.
    #[serde(default)]
    pub payload: Value,
    /// When the transition was accepted.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Builds the record of a typed event that moved an aggregate to `sequence_number`.
    pub(crate) fn record<M: StateMachine>(
        event: &M::Event,
        aggregate_id: Option<&str>,
        sequence_number: SequenceNumber,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            event_store_id: M::NAME.to_string(),
            aggregate_id: aggregate_id.map(str::to_string),
            sequence_number,
            kind: event.kind().to_string(),
            payload: event.to_payload()?,
            timestamp: Utc::now(),
        })
    }

    /// Decodes the typed event of `M` carried by this record.
    pub fn decode<M: StateMachine>(&self) -> Result<M::Event, ParseError> {
        if self.event_store_id != M::NAME {
            return Err(ParseError::ForeignStream {
                expected: M::NAME,
                found: self.event_store_id.clone(),
            });
        }

        M::Event::parse(&self.kind, self.payload.clone())
    }

    /// Strips the record down to the command that produced it.
    pub fn to_command(&self) -> RawCommand {
        RawCommand {
            kind: self.kind.clone(),
            payload: self.payload.clone(),
        }
    }
}

/// The untyped `{ type, payload }` command accepted at the application boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCommand {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl RawCommand {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Parses the command into the typed event of `M`.
    pub fn parse<M: StateMachine>(self) -> Result<M::Event, ParseError> {
        M::Event::parse(&self.kind, self.payload)
    }
}
