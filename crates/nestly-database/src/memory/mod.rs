//! Process-local implementations used by the development profile and tests.

pub mod group;
pub mod notification;

pub use group::MemoryGroupDirectory;
pub use notification::MemoryNotificationStore;
