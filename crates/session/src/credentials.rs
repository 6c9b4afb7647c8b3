//! Connection Credential Fetching
//!
//! Each connection attempt asks an external endpoint for a fresh
//! [`ConnectionDescriptor`]. Descriptors are short-lived: they are never
//! cached across attempts and must not be reused after the session they
//! authorize terminates.

use crate::config::SessionConfig;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Everything needed to join one remote agent room: server address,
/// session name, and the short-lived token authorizing a single
/// participant.
///
/// The token is held as a [`SecretString`] so it never appears in `Debug`
/// output or logs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDescriptor {
    pub server_url: String,
    pub room_name: String,
    pub participant_token: SecretString,
}

/// Obtains a fresh [`ConnectionDescriptor`] for a connection attempt.
/// Stateless per call; every invocation is a new request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch(&self, config: &SessionConfig) -> Result<ConnectionDescriptor>;
}

/// Fetches connection details from the configured HTTP endpoint.
///
/// Issues one `POST` per attempt carrying the sandbox identifier as a
/// header and, when configured, the agent name in the request body. Any
/// non-success response or malformed body is an error that propagates to
/// the controller's startup failure path; there are no retries here.
#[derive(Default)]
pub struct HttpCredentialSource {
    http: reqwest::Client,
}

impl HttpCredentialSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a caller-provided client, e.g. one with custom timeouts or
    /// proxy settings.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn fetch(&self, config: &SessionConfig) -> Result<ConnectionDescriptor> {
        let body = match &config.agent_name {
            Some(name) => json!({ "room_config": { "agents": [{ "agent_name": name }] } }),
            None => json!({}),
        };

        let response = self
            .http
            .post(config.credential_endpoint.clone())
            .header("X-Sandbox-Id", &config.sandbox_id)
            .json(&body)
            .send()
            .await
            .context("credential endpoint request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("credential endpoint returned {}: {}", status, body);
        }

        let descriptor: ConnectionDescriptor = response
            .json()
            .await
            .context("credential endpoint returned a malformed body")?;

        // The token stays out of the logs.
        info!(
            server_url = %descriptor.server_url,
            room = %descriptor.room_name,
            "fetched connection details"
        );
        Ok(descriptor)
    }
}
