use anyhow::Context;
use axum::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::error;

use crate::config::MailConfig;

/// Out-of-band delivery of recovery codes. Failure is a hard failure of
/// the enclosing operation; there is no retry policy here.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

/// Notifier backed by an HTTP mail API (JSON POST, bearer-token auth).
#[derive(Clone)]
pub struct MailClient {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl MailClient {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build mail http client")?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Notifier for MailClient {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let payload = json!({
            "from": self.from,
            "to": [to],
            "subject": subject,
            "html": html_body,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("mail api request")?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, "mail api rejected message");
            anyhow::bail!("mail api returned {status}");
        }
        Ok(())
    }
}
