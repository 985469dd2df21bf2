//! Notification domain entities.

pub mod delivery;
pub mod draft;
pub mod kind;
pub mod model;
pub mod priority;

pub use delivery::{ChannelDelivery, DeliveryChannel, DeliveryStatus};
pub use draft::NewNotification;
pub use kind::NotificationType;
pub use model::Notification;
pub use priority::NotificationPriority;
