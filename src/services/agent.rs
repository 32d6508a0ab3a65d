// SPDX-License-Identifier: MIT

//! Sub-agent RPC client
//!
//! The LLM invocation service is an external callable; this module only
//! knows its wire contract: `executeSubAgent(request) -> {success, output,
//! error}`, bounded by a per-call timeout.

use super::error::ServiceError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Upper bound for a single sub-agent invocation.
pub const AGENT_CALL_TIMEOUT_SECS: u64 = 540;

/// Request envelope for the `executeSubAgent` RPC
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub project_id: String,
    pub sub_agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<String>,
    pub task_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub previous_outputs: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_profile_id: Option<String>,
}

/// Response envelope. Some deployments name the text field `content`
/// instead of `output`; both are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentResponse {
    pub success: bool,
    #[serde(default, alias = "content")]
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Seam for invoking the external agent service
#[async_trait]
pub trait AgentService: Send + Sync {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResponse, ServiceError>;
}

/// HTTP client for the `executeSubAgent` endpoint
pub struct SubAgentClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SubAgentClient {
    /// Create a new SubAgentClient
    ///
    /// Requires the `SUBAGENT_RPC_URL` environment variable to be set.
    /// Optionally uses `SUBAGENT_API_KEY` for bearer authentication.
    pub fn new() -> Result<Self, ServiceError> {
        let endpoint = env::var("SUBAGENT_RPC_URL")
            .map_err(|_| ServiceError::other("SUBAGENT_RPC_URL must be set"))?;
        Ok(Self::with_endpoint(endpoint))
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: env::var("SUBAGENT_API_KEY").ok(),
        }
    }
}

#[async_trait]
impl AgentService for SubAgentClient {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResponse, ServiceError> {
        let mut req = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let call = async {
            let resp = req.send().await.map_err(ServiceError::from)?;

            let status = resp.status();
            if status == StatusCode::FORBIDDEN {
                return Err(ServiceError::access_denied("executeSubAgent"));
            }
            if status == StatusCode::NOT_FOUND {
                return Err(ServiceError::not_found("executeSubAgent"));
            }
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(ServiceError::other(format!(
                    "executeSubAgent HTTP {}: {}",
                    status, text
                )));
            }

            resp.json::<AgentResponse>().await.map_err(ServiceError::from)
        };

        tokio::time::timeout(Duration::from_secs(AGENT_CALL_TIMEOUT_SECS), call)
            .await
            .map_err(|_| ServiceError::Timeout {
                service: "executeSubAgent".to_string(),
                seconds: AGENT_CALL_TIMEOUT_SECS,
            })?
    }
}
