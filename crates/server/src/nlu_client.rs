use std::time::Duration;

use async_trait::async_trait;
use brewline_agent::nlu::{MessageRequest, MessageResponse, NluClient, NluError};
use brewline_core::config::NluConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Calls the hosted conversation service's `message` endpoint with basic auth.
pub struct HttpNluClient {
    client: Client,
    base_url: String,
    version_date: String,
    username: String,
    password: SecretString,
}

impl HttpNluClient {
    pub fn from_config(config: &NluConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            version_date: config.version_date.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn message_url(&self, workspace_id: &str) -> String {
        format!("{}/v1/workspaces/{workspace_id}/message", self.base_url)
    }
}

#[async_trait]
impl NluClient for HttpNluClient {
    async fn message(&self, request: &MessageRequest) -> Result<MessageResponse, NluError> {
        let url = self.message_url(&request.workspace_id);
        debug!(event_name = "server.nlu.request", url = %url, "sending turn to nlu service");

        let response = self
            .client
            .post(&url)
            .query(&[("version", self.version_date.as_str())])
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .json(request)
            .send()
            .await
            .map_err(|error| NluError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<Value>(&text)
                .unwrap_or_else(|_| json!({ "error": text, "code": status.as_u16() }));
            warn!(
                event_name = "server.nlu.error_status",
                status = %status,
                "nlu service rejected the turn"
            );
            return Err(NluError::Status { status: status.as_u16(), body });
        }

        response
            .json::<MessageResponse>()
            .await
            .map_err(|error| NluError::Decode(error.to_string()))
    }
}
