use anyhow::{anyhow, Result};
use async_trait::async_trait;
use hush_core::config::CompanionConfig;

/// Transport seam for the session loop; the real client goes over HTTP,
/// tests script outcomes.
#[async_trait]
pub trait PingTransport: Send + Sync {
    async fn send_ping(&self, api_key: &str, operator_id: &str) -> Result<()>;
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &CompanionConfig) -> Result<Self> {
        // The client-level timeout bounds every ping; a hung request becomes
        // a failure instead of stalling the scheduler.
        let client = reqwest::Client::builder()
            .user_agent("hush-companion/0.1")
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl PingTransport for ApiClient {
    async fn send_ping(&self, api_key: &str, operator_id: &str) -> Result<()> {
        let url = format!("{}/ping/{}", self.base_url, operator_id);
        let res = self
            .client
            .post(url)
            .header("X-API-Key", api_key)
            .send()
            .await?;
        if res.status().is_success() {
            return Ok(());
        }
        Err(anyhow!("ping failed with status {}", res.status()))
    }
}
