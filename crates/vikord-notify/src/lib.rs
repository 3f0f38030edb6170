//! `vikord-notify`: from a classified event to a render-ready message.
//!
//! [`builder::PayloadBuilder`] enriches events (identities, project info)
//! into a [`payload::NotificationPayload`]; [`format::format`] turns that
//! into a deterministic [`format::RenderedMessage`]; a [`delivery::Delivery`]
//! implementation ships it.

pub mod builder;
pub mod delivery;
pub mod format;
pub mod payload;
pub mod priority;
pub mod text;

pub use builder::PayloadBuilder;
pub use delivery::{Delivery, DeliveryError, DeliveryTarget};
pub use format::{format, RenderedEmbed, RenderedMessage};
pub use payload::{NotificationContext, NotificationKind, NotificationPayload, UserReference};
