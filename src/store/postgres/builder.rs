use std::marker::PhantomData;
use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::machine::StateMachine;
use crate::sql::migrations::Migrations;
use crate::sql::statements::Statements;

use super::{InnerPgStore, PgStore};

/// Struct used to build a brand new [`PgStore`].
pub struct PgStoreBuilder<M>
where
    M: StateMachine,
{
    pool: Pool<Postgres>,
    statements: Statements,
    run_migrations: bool,
    _machine: PhantomData<M>,
}

impl<M> PgStoreBuilder<M>
where
    M: StateMachine,
{
    /// Creates a new instance of a [`PgStoreBuilder`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            statements: Statements::new::<M>(),
            run_migrations: true,
            _machine: PhantomData,
        }
    }

    /// Calling this function the caller avoid running migrations. It is recommend to run migrations
    /// at least once per store per startup.
    pub fn without_running_migrations(mut self) -> Self {
        self.run_migrations = false;
        self
    }

    /// This function runs all the needed [`Migrations`], atomically setting up the database if
    /// `run_migrations` isn't explicitly set to false. [`Migrations`] should be run only at application
    /// startup due to avoid performance issues.
    ///
    /// Eventually returns an instance of PgStore.
    ///
    /// # Errors
    ///
    /// Will return an `Err` if there's an error running [`Migrations`].
    pub async fn try_build(self) -> Result<PgStore<M>, sqlx::Error> {
        if self.run_migrations {
            Migrations::run::<M>(&self.pool).await?;
        }

        Ok(PgStore {
            inner: Arc::new(InnerPgStore {
                pool: self.pool,
                statements: self.statements,
            }),
            _machine: PhantomData,
        })
    }
}
