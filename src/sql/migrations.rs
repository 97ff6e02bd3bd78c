use sqlx::postgres::PgQueryResult;
use sqlx::{Pool, Postgres, Transaction};

use crate::machine::StateMachine;
use crate::sql::statements::{events_table, snapshots_table};

/// Creates the events and snapshots tables of a [`StateMachine`], if missing.
pub struct Migrations;

impl Migrations {
    pub async fn run<M>(pool: &Pool<Postgres>) -> Result<(), sqlx::Error>
    where
        M: StateMachine,
    {
        let events_table: String = events_table::<M>();
        let snapshots_table: String = snapshots_table::<M>();

        let mut transaction: Transaction<Postgres> = pool.begin().await?;

        let migrations: Vec<String> = vec![
            format!(include_str!("postgres/migrations/01_create_events_table.sql"), events_table),
            format!(include_str!("postgres/migrations/02_create_events_index.sql"), events_table),
            format!(
                include_str!("postgres/migrations/03_create_events_unique_constraint.sql"),
                events_table
            ),
            format!(include_str!("postgres/migrations/04_create_snapshots_table.sql"), snapshots_table),
        ];

        for migration in migrations {
            let _: PgQueryResult = sqlx::query(migration.as_str()).execute(&mut *transaction).await?;
        }

        transaction.commit().await
    }
}
