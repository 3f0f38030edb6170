use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{info, warn};
use vikord_core::config::VikordConfig;
use vikord_events::SignatureValidator;
use vikord_notify::{Delivery, DeliveryError, DeliveryTarget, PayloadBuilder, RenderedMessage};
use vikord_reminders::{BindingStore, ReminderEngine, ReminderStore};
use vikord_scheduler::RecurrenceScheduler;
use vikord_users::{IdentityResolver, IdentityStore};

mod app;
mod http;
mod route;
#[cfg(test)]
mod testing;
mod vikunja;

/// Stand-in delivery when no Discord bot is configured: every send fails
/// and is logged by the caller.
struct NoDiscord;

#[async_trait]
impl Delivery for NoDiscord {
    async fn send(&self, target: &DeliveryTarget, _: &RenderedMessage) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unreachable(format!("{target}: Discord is not configured")))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vikord_gateway=info,vikord=info,tower_http=info".into()),
        )
        .init();

    // load config: VIKORD_CONFIG env > ~/.vikord/vikord.toml
    let config_path = std::env::var("VIKORD_CONFIG").ok();
    let config = VikordConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        VikordConfig::default()
    });

    let timezone = config.scheduler.tz()?;
    let validator = match (config.webhook.secret.is_empty(), config.webhook.allow_unsigned) {
        (false, _) => Some(SignatureValidator::new(&config.webhook.secret)),
        (true, true) => {
            warn!("webhook secret is empty and allow_unsigned is set: webhooks are NOT authenticated");
            None
        }
        (true, false) => anyhow::bail!(
            "webhook.secret is empty; set it or explicitly enable webhook.allow_unsigned"
        ),
    };

    // initialize SQLite database: single file for all subsystems
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    vikord_users::db::init_db(&db)?;
    vikord_reminders::db::init_db(&db)?;
    info!("database migrations complete");

    // each subsystem gets its own connection
    let open = || -> anyhow::Result<Arc<Mutex<rusqlite::Connection>>> {
        Ok(Arc::new(Mutex::new(rusqlite::Connection::open(db_path)?)))
    };
    let identities = Arc::new(IdentityStore::new(open()?)?);
    let bindings = Arc::new(BindingStore::new(open()?)?);
    let store = Arc::new(ReminderStore::new(open()?)?);

    let api: Arc<dyn vikord_core::TaskApi> = Arc::new(vikunja::VikunjaClient::new(&config.vikunja));
    let builder = Arc::new(PayloadBuilder::new(
        Arc::clone(&api),
        Arc::new(IdentityResolver::new(Arc::clone(&identities))),
        config.vikunja.frontend_base(),
    ));

    // REST-only client for deliveries; the gateway connection is separate
    let delivery: Arc<dyn Delivery> = match &config.discord {
        Some(discord) => Arc::new(vikord_discord::DiscordDelivery::new(Arc::new(
            serenity::http::Http::new(&discord.bot_token),
        ))),
        None => {
            warn!("no [discord] section configured, notifications will be dropped");
            Arc::new(NoDiscord)
        }
    };

    let scheduler = Arc::new(RecurrenceScheduler::new(timezone));
    let engine = Arc::new(ReminderEngine::new(
        store,
        Arc::clone(&bindings),
        Arc::clone(&scheduler),
        Arc::clone(&builder),
        Arc::clone(&api),
        Arc::clone(&delivery),
    ));
    let (reminders, digests) = engine.start()?;
    info!(reminders, digests, timezone = %timezone, "scheduled jobs restored");

    if let Some(discord) = &config.discord {
        let ctx = Arc::new(vikord_discord::BotContext {
            identities: Arc::clone(&identities),
            bindings: Arc::clone(&bindings),
            engine: Arc::clone(&engine),
            api: Arc::clone(&api),
            timezone,
        });
        match vikord_discord::DiscordAdapter::new(discord, ctx) {
            Ok(adapter) => {
                tokio::spawn(adapter.run());
                info!("Discord bot started");
            }
            Err(e) => warn!(error = %e, "Discord bot not started"),
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState {
        config,
        validator,
        builder,
        identities,
        bindings,
        delivery,
        engine,
    });
    let router = app::build_router(state);

    info!("Vikord gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop_all();
    info!("scheduler stopped, bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "could not create database directory");
            }
        }
    }
}
