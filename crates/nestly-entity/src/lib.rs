//! # nestly-entity
//!
//! Domain entity models for the Nestly notification subsystem. Every
//! struct in this crate represents a stored record or a domain value
//! object. All entities derive `Debug`, `Clone`, `Serialize`, and
//! `Deserialize`; the database crate maps rows onto them.

pub mod notification;
