//! Core traits defined in `nestly-core` and implemented by other crates.

pub mod delivery;

pub use delivery::{DeliveryOutcome, DeliveryProvider, EmailMessage};
