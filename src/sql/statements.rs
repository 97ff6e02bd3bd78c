use crate::machine::StateMachine;

/// The queries run by the postgres store, rendered once per [`StateMachine`].
#[derive(Clone, Debug)]
pub struct Statements {
    events_table: String,
    snapshots_table: String,
    select_by_aggregate_id: String,
    select_all: String,
    insert: String,
    upsert_snapshot: String,
    select_snapshot: String,
}

impl Statements {
    pub fn new<M>() -> Self
    where
        M: StateMachine,
    {
        let events_table: String = events_table::<M>();
        let snapshots_table: String = snapshots_table::<M>();

        Self {
            select_by_aggregate_id: format!(
                include_str!("postgres/statements/select_by_aggregate_id.sql"),
                events_table
            ),
            select_all: format!(include_str!("postgres/statements/select_all.sql"), events_table),
            insert: format!(include_str!("postgres/statements/insert.sql"), events_table),
            upsert_snapshot: format!(include_str!("postgres/statements/upsert_snapshot.sql"), snapshots_table),
            select_snapshot: format!(include_str!("postgres/statements/select_snapshot.sql"), snapshots_table),
            events_table,
            snapshots_table,
        }
    }

    pub fn events_table(&self) -> &str {
        &self.events_table
    }

    pub fn snapshots_table(&self) -> &str {
        &self.snapshots_table
    }

    pub fn by_aggregate_id(&self) -> &str {
        &self.select_by_aggregate_id
    }

    pub fn select_all(&self) -> &str {
        &self.select_all
    }

    pub fn insert(&self) -> &str {
        &self.insert
    }

    pub fn upsert_snapshot(&self) -> &str {
        &self.upsert_snapshot
    }

    pub fn select_snapshot(&self) -> &str {
        &self.select_snapshot
    }
}

pub fn events_table<M: StateMachine>() -> String {
    format!("{}_events", M::NAME.to_lowercase())
}

pub fn snapshots_table<M: StateMachine>() -> String {
    format!("{}_snapshots", M::NAME.to_lowercase())
}
