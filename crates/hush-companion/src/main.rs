use anyhow::Result;
use clap::Parser;
use hush_companion::api_client::ApiClient;
use hush_companion::credentials;
use hush_companion::presentation::{ConsolePresentation, Presentation};
use hush_companion::session::Session;
use hush_core::config::CompanionConfig;
use hush_core::paths::{credentials_path, key_file_path};
use hush_core::vault::CredentialVault;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hush companion: keeps the backend aware you are present", long_about = None)]
struct Cli {
    #[arg(long, env = "HUSH_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    #[arg(long, env = "HUSH_PING_INTERVAL_SECS", default_value_t = 15)]
    ping_interval_secs: u64,

    #[arg(long, env = "HUSH_REQUEST_TIMEOUT_SECS", default_value_t = 5)]
    request_timeout_secs: u64,

    #[arg(long, env = "HUSH_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = CompanionConfig::new(
        cli.api_url,
        Duration::from_secs(cli.ping_interval_secs),
        Duration::from_secs(cli.request_timeout_secs),
        cli.max_retries,
    )?;

    let vault = CredentialVault::load_or_create(&key_file_path()?)?;
    let credentials_path = credentials_path()?;
    let saved = credentials::load(&vault, &credentials_path);

    let presentation = ConsolePresentation;
    let entered = presentation.prompt_credentials(&saved)?;
    if saved.remember && !entered.remember {
        credentials::clear(&credentials_path);
    }

    let transport = ApiClient::new(&config)?;
    let mut session = Session::new(
        transport,
        presentation,
        config,
        vault,
        credentials_path,
        entered,
    );
    session.run().await?;
    info!("companion exiting");
    Ok(())
}
