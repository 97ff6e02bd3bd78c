pub mod event;
pub mod migrations;
pub mod statements;
