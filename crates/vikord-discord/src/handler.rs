use std::sync::Arc;

use serenity::async_trait;
use serenity::model::application::Interaction;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::{Context, EventHandler};
use tracing::info;

use crate::context::BotContext;

/// Serenity event handler: registers slash commands and answers them.
pub struct VikordHandler {
    pub ctx: Arc<BotContext>,
    pub guild_id: Option<u64>,
}

#[async_trait]
impl EventHandler for VikordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, guilds = ready.guilds.len(), "Discord bot connected");
        let guild = self.guild_id.filter(|id| *id != 0).map(GuildId::new);
        crate::commands::register_commands(&ctx, guild).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            info!(command = %command.data.name, user_id = %command.user.id, "slash command received");
            crate::commands::handle_interaction(&self.ctx, &ctx, &command).await;
        }
    }
}
