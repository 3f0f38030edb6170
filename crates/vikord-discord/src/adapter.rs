use std::sync::Arc;
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tracing::{error, info, warn};

use vikord_core::config::DiscordConfig;

use crate::context::BotContext;
use crate::error::DiscordError;
use crate::handler::VikordHandler;

/// Discord gateway adapter.
///
/// Wraps a serenity `Client` and drives the event loop, rebuilding the client
/// whenever the gateway drops. Notification delivery does not depend on it:
/// [`crate::DiscordDelivery`] talks to the REST API directly.
pub struct DiscordAdapter {
    ctx: Arc<BotContext>,
    config: DiscordConfig,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, ctx: Arc<BotContext>) -> Result<Self, DiscordError> {
        if config.bot_token.trim().is_empty() {
            return Err(DiscordError::NoToken);
        }
        Ok(Self {
            ctx,
            config: config.clone(),
        })
    }

    /// Connect and keep reconnecting. Never returns.
    pub async fn run(self) {
        let intents = GatewayIntents::GUILDS;
        loop {
            let mut client = loop {
                match self.build_client(intents).await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("Discord: connect failed ({e}), retrying in 30s");
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            };

            info!("Discord: gateway connecting");
            if let Err(e) = client.start().await {
                warn!("Discord: gateway error ({e}), reconnecting in 5s");
            } else {
                info!("Discord: gateway stopped cleanly, reconnecting in 5s");
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, DiscordError> {
        let handler = VikordHandler {
            ctx: Arc::clone(&self.ctx),
            guild_id: self.config.guild_id,
        };
        let client = Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await?;
        Ok(client)
    }
}
