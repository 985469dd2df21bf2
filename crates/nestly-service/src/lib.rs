//! # nestly-service
//!
//! Business logic for Nestly notifications. The [`NotificationService`]
//! is the only writer of notification records; [`NotificationRules`]
//! decides who hears about which domain event; [`NotificationSubscriber`]
//! wires the rules onto the event bus; [`TransactionalMailer`] renders
//! and sends email through a [`DeliveryProvider`](nestly_core::traits::DeliveryProvider).
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod mail;
pub mod notification;

pub use mail::{
    HttpDeliveryProvider, LogDeliveryProvider, MailRecipient, TransactionalMailer, build_provider,
};
pub use notification::{
    DeliveryPlan, NotificationRules, NotificationService, NotificationSubscriber, ReadOutcome,
    RoomChange,
};
