use std::time::Duration;

use async_trait::async_trait;
use engine_core::{Agent, AgentKind, AgentResult, EngineError, PipelineContext};
use serde::Deserialize;

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Wire shape of a remote agent's `POST /run` response
#[derive(Debug, Deserialize)]
pub struct RemoteAgentResponse {
    pub score: f64,
    pub confidence: f64,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// An agent living behind an HTTP endpoint. The full context — including
/// every predecessor result committed so far — is serialized on each call so
/// a remote risk-manager sees the same world an in-process one would.
pub struct RemoteAgent {
    kind: AgentKind,
    base_url: String,
    client: reqwest::Client,
}

impl RemoteAgent {
    pub fn new(kind: AgentKind, base_url: impl Into<String>, deadline: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(deadline)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Agent for RemoteAgent {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        let url = format!("{}/run", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(ctx)
            .send()
            .await
            .map_err(|e| EngineError::Agent(format!("{}: {}", self.kind, e)))?;

        if !response.status().is_success() {
            return Err(EngineError::Agent(format!(
                "{}: HTTP {}",
                self.kind,
                response.status()
            )));
        }

        let body: RemoteAgentResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Agent(format!("{}: bad response body: {}", self.kind, e)))?;

        Ok(AgentResult::clamped(body.score, body.confidence, body.payload))
    }
}
