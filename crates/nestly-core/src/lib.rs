//! # nestly-core
//!
//! Core crate for the Nestly notification subsystem. Contains the
//! configuration schema, typed identifiers, the domain event union,
//! pagination types, the delivery provider contract, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other Nestly crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
