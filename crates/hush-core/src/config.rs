use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Immutable backend configuration, validated once at startup and injected
/// into the components that need it.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Shared secret expected in the `X-API-Key` header.
    pub api_key: String,
    /// The one identity allowed to run privileged commands.
    pub owner_id: String,
    /// Chat bot token.
    pub bot_token: String,
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl ServiceConfig {
    pub fn new(
        api_key: String,
        owner_id: String,
        bot_token: String,
        database_path: PathBuf,
        bind_addr: SocketAddr,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(anyhow!("api key must not be empty"));
        }
        if owner_id.trim().is_empty() {
            return Err(anyhow!("owner id must not be empty"));
        }
        if bot_token.trim().is_empty() {
            return Err(anyhow!("bot token must not be empty"));
        }
        Ok(Self {
            api_key,
            owner_id,
            bot_token,
            database_path,
            bind_addr,
        })
    }
}

/// Immutable companion configuration.
#[derive(Debug, Clone)]
pub struct CompanionConfig {
    pub api_url: String,
    pub ping_interval: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl CompanionConfig {
    pub fn new(
        api_url: String,
        ping_interval: Duration,
        request_timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        if api_url.trim().is_empty() {
            return Err(anyhow!("api url must not be empty"));
        }
        if max_retries == 0 {
            return Err(anyhow!("max retries must be at least 1"));
        }
        // The scheduler never issues overlapping pings; that only holds when
        // a request cannot outlive the interval that triggered it.
        if request_timeout >= ping_interval {
            return Err(anyhow!(
                "request timeout ({:?}) must be shorter than the ping interval ({:?})",
                request_timeout,
                ping_interval
            ));
        }
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            ping_interval,
            request_timeout,
            max_retries,
        })
    }
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            ping_interval: Duration::from_secs(15),
            request_timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}
