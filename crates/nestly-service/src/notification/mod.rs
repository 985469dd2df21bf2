//! Notification orchestration, recipient rules and bus wiring.

pub mod rules;
pub mod service;
pub mod subscriber;

pub use rules::{DeliveryPlan, NotificationRules, RoomChange};
pub use service::{NotificationService, ReadOutcome};
pub use subscriber::NotificationSubscriber;
