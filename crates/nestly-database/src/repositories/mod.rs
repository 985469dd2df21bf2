//! PostgreSQL implementations of the store seams.

pub mod group;
pub mod notification;

pub use group::PgGroupDirectory;
pub use notification::PgNotificationStore;
