//! Outbound email: provider implementations and message templates.

pub mod mailer;
pub mod provider;

pub use mailer::{MailRecipient, TransactionalMailer};
pub use provider::{HttpDeliveryProvider, LogDeliveryProvider, build_provider};
