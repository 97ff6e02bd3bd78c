use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::postgres::PgQueryResult;
use sqlx::types::Json;
use sqlx::{Executor, Pool, Postgres};

use crate::event::Event;
use crate::machine::StateMachine;
use crate::snapshot::SnapshotOf;
use crate::sql::event::{DbEvent, DbSnapshot};
use crate::sql::statements::Statements;
use crate::store::{EventStore, SnapshotStore, StoreError};

const UNIQUE_VIOLATION: &str = "23505";

/// Default Postgres implementation for the [`EventStore`] and the [`SnapshotStore`]. Events of a
/// [`StateMachine`] are kept in `<name>_events`, its snapshots in `<name>_snapshots`.
///
/// The store is protected by an [`Arc`] that allows it to be cloneable still having the same memory
/// reference.
pub struct PgStore<M>
where
    M: StateMachine,
{
    pub(super) inner: Arc<InnerPgStore>,
    pub(super) _machine: PhantomData<M>,
}

pub(super) struct InnerPgStore {
    pub(super) pool: Pool<Postgres>,
    pub(super) statements: Statements,
}

impl<M> PgStore<M>
where
    M: StateMachine,
{
    /// Returns the name of the event store table
    pub fn table_name(&self) -> &str {
        self.inner.statements.events_table()
    }

    /// Returns the name of the snapshot table
    pub fn snapshot_table_name(&self) -> &str {
        self.inner.statements.snapshots_table()
    }

    /// This function returns a stream representing the full event store table content. This should
    /// be mainly used to rebuild read models.
    pub fn stream_events<'s>(
        &'s self,
        executor: impl Executor<'s, Database = Postgres> + 's,
    ) -> BoxStream<'s, Result<Event, StoreError>> {
        Box::pin(
            sqlx::query_as::<_, DbEvent>(self.inner.statements.select_all())
                .fetch(executor)
                .map(|row| row.map(Event::from).map_err(StoreError::from)),
        )
    }
}

impl<M> Clone for PgStore<M>
where
    M: StateMachine,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _machine: PhantomData,
        }
    }
}

impl<M> std::fmt::Debug for PgStore<M>
where
    M: StateMachine,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("events_table", &self.table_name())
            .field("snapshots_table", &self.snapshot_table_name())
            .finish()
    }
}

#[async_trait]
impl<M> EventStore for PgStore<M>
where
    M: StateMachine,
{
    #[tracing::instrument(skip_all, fields(event_id = %event.id, sequence_number = event.sequence_number), err)]
    async fn append_event(&self, event: &Event) -> Result<(), StoreError> {
        let aggregate_id = event
            .aggregate_id
            .as_deref()
            .ok_or(StoreError::MissingAggregateId(event.id))?;

        let conflict = || StoreError::Conflict {
            aggregate_id: aggregate_id.to_string(),
            sequence_number: event.sequence_number,
        };

        let result: Result<PgQueryResult, sqlx::Error> = sqlx::query(self.inner.statements.insert())
            .bind(event.id)
            .bind(aggregate_id)
            .bind(event.event_store_id.as_str())
            .bind(event.kind.as_str())
            .bind(Json(&event.payload))
            .bind(event.timestamp)
            .bind(event.sequence_number)
            .execute(&self.inner.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(conflict()),
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(error)) if error.code().as_deref() == Some(UNIQUE_VIOLATION) => Err(conflict()),
            Err(error) => Err(error.into()),
        }
    }

    async fn by_aggregate_id(&self, aggregate_id: &str) -> Result<Vec<Event>, StoreError> {
        Ok(sqlx::query_as::<_, DbEvent>(self.inner.statements.by_aggregate_id())
            .bind(aggregate_id)
            .fetch_all(&self.inner.pool)
            .await?
            .into_iter()
            .map(Event::from)
            .collect())
    }
}

#[async_trait]
impl<M> SnapshotStore<M> for PgStore<M>
where
    M: StateMachine,
{
    #[tracing::instrument(skip_all, fields(aggregate_id = aggregate_id, version = snapshot.version()), err)]
    async fn save_snapshot(&self, aggregate_id: &str, snapshot: &SnapshotOf<M>) -> Result<(), StoreError> {
        let _: PgQueryResult = sqlx::query(self.inner.statements.upsert_snapshot())
            .bind(aggregate_id)
            .bind(Json(snapshot))
            .bind(snapshot.version())
            .bind(Utc::now())
            .execute(&self.inner.pool)
            .await?;

        Ok(())
    }

    async fn load_snapshot(&self, aggregate_id: &str) -> Result<Option<SnapshotOf<M>>, StoreError> {
        let row: Option<DbSnapshot> = sqlx::query_as::<_, DbSnapshot>(self.inner.statements.select_snapshot())
            .bind(aggregate_id)
            .fetch_optional(&self.inner.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(serde_json::from_value(row.snapshot)?)),
            None => Ok(None),
        }
    }
}
