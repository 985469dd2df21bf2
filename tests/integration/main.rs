//! Workspace integration tests, driven by the in-memory store and a real
//! event bus and connection registry.

mod helpers;

mod delivery_test;
mod lifecycle_test;
mod presence_test;
