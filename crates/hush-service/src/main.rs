use anyhow::Result;
use clap::Parser;
use hush_core::config::ServiceConfig;
use hush_core::paths::default_database_path;
use hush_core::presence;
use hush_service::api::{self, ApiState};
use hush_service::chat::{self, telegram::TelegramGateway};
use hush_service::store::SqliteStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hush backend: liveness API and chat command loop", long_about = None)]
struct Cli {
    /// Shared secret expected in the X-API-Key header
    #[arg(long, env = "HUSH_API_KEY")]
    api_key: String,

    /// Chat identity allowed to run privileged commands
    #[arg(long, env = "HUSH_OWNER_ID")]
    owner_id: String,

    /// Telegram bot token
    #[arg(long, env = "HUSH_BOT_TOKEN")]
    bot_token: String,

    /// SQLite database path (defaults to the app data directory)
    #[arg(long, env = "HUSH_DATABASE")]
    database: Option<PathBuf>,

    #[arg(long, env = "HUSH_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let database = match cli.database {
        Some(path) => path,
        None => default_database_path()?,
    };
    if let Some(parent) = database.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let config = ServiceConfig::new(
        cli.api_key,
        cli.owner_id,
        cli.bot_token,
        database,
        cli.bind,
    )?;

    let store = SqliteStore::open(&config.database_path).await?;
    let presence = presence::shared();

    let api_state = Arc::new(ApiState {
        api_key: config.api_key.clone(),
        presence: presence.clone(),
    });
    let api_task = tokio::spawn(api::serve(api_state, config.bind_addr));

    let gateway = TelegramGateway::new(&config.bot_token)?;
    let chat_task = tokio::spawn(chat::run_chat_loop(
        gateway,
        Arc::new(store),
        presence,
        config.owner_id.clone(),
    ));

    info!("service started");
    signal::ctrl_c().await?;
    info!("service stopping");
    api_task.abort();
    chat_task.abort();
    Ok(())
}
