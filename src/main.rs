//! # Warden: Telegram group moderation & broadcast bot
//!
//! Filters unwanted links, greets new members, runs per-chat recurring
//! broadcasts, and serves a token-gated admin API for configuration.
//!
//! Usage:
//!   warden                     # config from ~/.warden/config.toml
//!   warden --port 9090         # override the admin port
//!   WARDEN_BOT_TOKEN=... warden

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use warden_broadcast::BroadcastExecutor;
use warden_core::config::WardenConfig;
use warden_core::types::ChatKind;
use warden_gateway::AppState;
use warden_moderation::{CommandHandler, ModerationAction, ModerationPipeline};
use warden_scheduler::{ReconciliationSweep, ScheduleRegistry};
use warden_store::Store;
use warden_telegram::{BotApi, Message, TelegramClient, Update};

#[derive(Parser)]
#[command(name = "warden", version, about = "🛡️ Warden: group moderation & broadcast bot")]
struct Cli {
    /// Path to the config file (default: ~/.warden/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Admin panel port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database path (overrides the config file)
    #[arg(long)]
    db_path: Option<String>,

    /// Directory holding locally uploaded media (overrides the config file)
    #[arg(long)]
    media_dir: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "warden=debug,tower_http=debug" } else { "warden=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            let path = shellexpand::tilde(path).to_string();
            WardenConfig::load_from(std::path::Path::new(&path))?
        }
        None => WardenConfig::load()?,
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(db_path) = &cli.db_path {
        config.db_path = db_path.clone();
    }
    if let Some(media_dir) = &cli.media_dir {
        config.media_dir = media_dir.clone();
    }
    if let Ok(token) = std::env::var("WARDEN_BOT_TOKEN") {
        if !token.is_empty() {
            config.bot_token = token;
        }
    }
    // The one fatal startup condition.
    if config.bot_token.is_empty() {
        anyhow::bail!("no bot token: set WARDEN_BOT_TOKEN or bot_token in the config file");
    }

    let store = Arc::new(Store::open(&config.db_path())?);
    let client = Arc::new(TelegramClient::new(config.bot_token.clone()));
    let api: Arc<dyn BotApi> = client.clone();
    let executor = Arc::new(BroadcastExecutor::new(api.clone(), config.media_dir()));
    let registry = ScheduleRegistry::new(store.clone(), executor.clone());
    let pipeline = ModerationPipeline::new(store.clone(), api.clone(), registry.clone());
    let commands = CommandHandler::new(store.clone(), api.clone());

    match client.get_me().await {
        Ok(me) => {
            tracing::info!("bot @{} connected", me.username.as_deref().unwrap_or("unknown"));
        }
        Err(e) => tracing::warn!("getMe failed, starting anyway: {e}"),
    }

    // Admin gateway.
    let state = Arc::new(AppState {
        store: store.clone(),
        registry: registry.clone(),
        admin_token: config.admin_token.clone(),
    });
    let port = config.port;
    tokio::spawn(async move {
        if let Err(e) = warden_gateway::serve(state, port).await {
            tracing::error!("admin gateway stopped: {e}");
        }
    });

    // Reconciliation sweep: expired bans and past-due broadcasts.
    let sweep = ReconciliationSweep::new(
        store.clone(),
        executor.clone(),
        Duration::from_secs(config.sweep_interval_secs),
    );
    tokio::spawn(sweep.run());

    // Event loop. One failing update never stops the loop.
    let mut updates = client.clone().start_polling();
    while let Some(update) = updates.next().await {
        handle_update(update, &store, &registry, &executor, &pipeline, &commands).await;
    }
    Ok(())
}

async fn handle_update(
    update: Update,
    store: &Arc<Store>,
    registry: &ScheduleRegistry,
    executor: &Arc<BroadcastExecutor>,
    pipeline: &ModerationPipeline,
    commands: &CommandHandler,
) {
    let Some(msg) = update.message else {
        return;
    };

    // Membership joins take the welcome path: no ban or link checks.
    if msg.is_member_join() {
        handle_join(&msg, store, registry, executor).await;
        return;
    }
    if msg.from.as_ref().is_some_and(|u| u.is_bot) {
        return;
    }

    let action = pipeline.handle(&msg).await;
    if action == ModerationAction::Allow {
        commands.dispatch(&msg).await;
    }
}

async fn handle_join(
    msg: &Message,
    store: &Arc<Store>,
    registry: &ScheduleRegistry,
    executor: &Arc<BroadcastExecutor>,
) {
    let chat_id = msg.chat.id;
    let kind = ChatKind::parse(&msg.chat.kind);
    if let Err(e) = store.upsert_identity(chat_id, msg.chat.display_title(), kind) {
        tracing::warn!(chat_id, "chat registration failed: {e}");
    }
    if let Err(e) = registry.ensure(chat_id).await {
        tracing::warn!(chat_id, "schedule reconciliation failed: {e}");
    }

    let cfg = match store.get(chat_id) {
        Ok(Some(cfg)) if cfg.welcome_enabled => cfg,
        Ok(_) => return,
        Err(e) => {
            tracing::warn!(chat_id, "config read failed: {e}");
            return;
        }
    };

    let names =
        msg.new_chat_members.iter().map(|u| u.display_name()).collect::<Vec<_>>().join(", ");
    if let Err(e) = executor.send_welcome(&cfg, &names).await {
        tracing::warn!(chat_id, "welcome failed: {e}");
    }
}
