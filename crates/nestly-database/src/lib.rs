//! # nestly-database
//!
//! The notification system of record. Defines the [`NotificationStore`]
//! and [`GroupDirectory`] seams and provides a PostgreSQL implementation
//! (via `sqlx`) plus a process-local one for development and tests.

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod store;

pub use connection::{DatabasePool, PoolStats};
pub use memory::{MemoryGroupDirectory, MemoryNotificationStore};
pub use repositories::{PgGroupDirectory, PgNotificationStore};
pub use store::{GroupDirectory, NotificationQuery, NotificationStore};
