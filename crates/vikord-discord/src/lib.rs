//! `vikord-discord`: the serenity side of the bot.
//!
//! [`delivery::DiscordDelivery`] ships rendered notifications over the REST
//! client, [`commands`] implements the slash commands and
//! [`adapter::DiscordAdapter`] keeps the gateway connection alive.

pub mod adapter;
pub mod commands;
pub mod context;
pub mod delivery;
pub mod embed;
pub mod error;
pub mod handler;

pub use adapter::DiscordAdapter;
pub use context::BotContext;
pub use delivery::DiscordDelivery;
pub use error::{CommandError, DiscordError};
