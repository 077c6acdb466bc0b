//! Thin layer over sqlx's Postgres pool used by the Guzo server.
//!
//! Query code takes `&mut PgConnection` so it can run against a
//! pooled connection and inside a [`Transaction`] alike.
pub mod error;
pub mod migrations;
pub mod pool;
pub mod transaction;

pub use self::pool::{PgConnection, PgPool, PgPooledConnection};
pub use self::transaction::Transaction;
