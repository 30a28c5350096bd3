//! SMS gateway client
//!
//! Sends parent approval texts through an HTTP gateway that accepts
//! `{to, from, body}` JSON with a bearer token.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::SmsConfig;
use crate::error::{AppError, AppResult};

/// Outbound message payload
#[derive(Debug, Serialize)]
pub struct OutboundSms<'a> {
    pub to: &'a str,
    pub from: Option<&'a str>,
    pub body: &'a str,
}

/// Inbound reply forwarded by the gateway webhook
#[derive(Debug, Clone, Deserialize)]
pub struct InboundSms {
    pub from: String,
    pub body: String,
}

/// SMS gateway client
#[derive(Clone)]
pub struct SmsClient {
    api_url: String,
    api_token: Option<String>,
    from_number: Option<String>,
    http_client: Client,
}

impl SmsClient {
    pub fn new(
        api_url: String,
        api_token: Option<String>,
        from_number: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            api_url,
            api_token,
            from_number,
            http_client,
        })
    }

    /// Build a client when a gateway URL is configured
    pub fn from_config(config: &SmsConfig) -> Result<Option<Self>, reqwest::Error> {
        match &config.api_url {
            Some(url) => Self::new(
                url.clone(),
                config.api_token.clone(),
                config.from_number.clone(),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    /// Send one text message
    pub async fn send(&self, to: &str, body: &str) -> AppResult<()> {
        let payload = OutboundSms {
            to,
            from: self.from_number.as_deref(),
            body,
        };

        let mut request = self.http_client.post(&self.api_url).json(&payload);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("SMS request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "SMS gateway returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

/// Deliver `body` to `to`, or log it when no gateway is configured
pub async fn dispatch(client: Option<&SmsClient>, to: &str, body: &str) -> AppResult<()> {
    match client {
        Some(client) => {
            client.send(to, body).await?;
            tracing::info!(to, "Approval text sent");
        }
        None => tracing::info!(to, body, "No SMS gateway configured; approval text not sent"),
    }
    Ok(())
}
