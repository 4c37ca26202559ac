//! # storage-adapters
//!
//! Implementations of the storage ports. The in-memory store is always
//! compiled; the SQLite store sits behind the `db-sqlite` feature.

pub mod memory;
#[cfg(feature = "db-sqlite")]
pub mod sqlite;

pub use memory::InMemoryStore;
#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteStore;
