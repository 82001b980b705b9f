//! `stockpile-infra` — persistence backends.
//!
//! All state flows through the [`store::Datastore`] trait. Two implementations
//! ship: an in-memory store for development and tests, and (behind the
//! `postgres` feature) a PostgreSQL store built on `sqlx`.

pub mod store;

pub use store::memory::InMemoryDatastore;
pub use store::{Datastore, StoreError, TransferOutcome};

#[cfg(feature = "postgres")]
pub use store::postgres::PostgresDatastore;
