use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::event::Event;
use crate::types::SequenceNumber;

/// Event representation on the event store
#[derive(sqlx::FromRow, Debug)]
pub struct DbEvent {
    pub id: Uuid,
    pub aggregate_id: String,
    pub event_store_id: String,
    pub kind: String,
    pub payload: Value,
    pub occurred_on: DateTime<Utc>,
    pub sequence_number: SequenceNumber,
}

impl From<DbEvent> for Event {
    fn from(row: DbEvent) -> Self {
        Self {
            id: row.id,
            event_store_id: row.event_store_id,
            aggregate_id: Some(row.aggregate_id),
            sequence_number: row.sequence_number,
            kind: row.kind,
            payload: row.payload,
            timestamp: row.occurred_on,
        }
    }
}

/// Snapshot representation on the snapshot table
#[derive(sqlx::FromRow, Debug)]
pub struct DbSnapshot {
    pub snapshot: Value,
}
