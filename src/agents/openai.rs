//! OpenAI-compatible Agent
//!
//! Runs an agent persona against any `/chat/completions` endpoint that speaks
//! the OpenAI wire format (OpenAI, Azure OpenAI behind a proxy, LiteLLM, ...).
//! Token usage is decoded here, once, into [`UsageMetrics`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::agents::profile::AgentProfile;
use crate::agents::sse::{SseEvent, SseStream};
use crate::agents::{
    Agent, AgentChunk, AgentError, AgentResponse, AgentStream, RunInput, UsageMetrics,
};
use crate::config::AgentsConfig;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings shared by every agent on the same upstream.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl From<&AgentsConfig> for OpenAiConfig {
    fn from(config: &AgentsConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible response types for deserialization
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OaiResponse {
    #[serde(default)]
    choices: Vec<OaiChoice>,
    #[serde(default)]
    usage: Option<OaiUsage>,
}

#[derive(Debug, Deserialize)]
struct OaiChoice {
    #[serde(default)]
    message: Option<OaiMessage>,
}

#[derive(Debug, Deserialize)]
struct OaiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OaiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl From<OaiUsage> for UsageMetrics {
    fn from(usage: OaiUsage) -> Self {
        Self::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

#[derive(Debug, Deserialize)]
struct OaiStreamChunk {
    #[serde(default)]
    choices: Vec<OaiStreamChoice>,
    #[serde(default)]
    usage: Option<OaiUsage>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OaiStreamChoice {
    #[serde(default)]
    delta: Option<OaiDelta>,
}

#[derive(Debug, Deserialize)]
struct OaiDelta {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// OpenAiAgent
// ---------------------------------------------------------------------------

/// An agent persona backed by an OpenAI-compatible chat completions API.
pub struct OpenAiAgent {
    profile: AgentProfile,
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiAgent {
    pub fn new(profile: AgentProfile, config: OpenAiConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(profile, config, client))
    }

    /// Share one connection pool between agents on the same upstream.
    pub fn with_client(profile: AgentProfile, config: OpenAiConfig, client: Client) -> Self {
        Self {
            profile,
            config,
            client,
        }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Build the request body (OpenAI chat completions format).
    fn build_request_body(&self, input: &RunInput, stream: bool) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        let system_prompt = self.profile.system_prompt();
        if !system_prompt.is_empty() {
            messages.push(serde_json::json!({ "role": "system", "content": system_prompt }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": input.message }));

        let mut body = serde_json::json!({
            "model": input.model,
            "messages": messages,
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        if let Some(ref user) = input.user_id {
            body["user"] = serde_json::json!(user);
        }

        body
    }

    async fn send(&self, body: &serde_json::Value) -> Result<reqwest::Response, AgentError> {
        let mut req = self.client.post(self.endpoint()).json(body);
        if let Some(ref key) = self.config.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: code,
                message,
            });
        }

        Ok(resp)
    }
}

/// Convert a buffered completion into an [`AgentResponse`].
fn convert_response(oai: OaiResponse) -> AgentResponse {
    let content = oai
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default();

    AgentResponse {
        content,
        usage: oai.usage.map(UsageMetrics::from),
    }
}

/// Decode one upstream SSE event. `None` means "nothing to forward".
fn decode_stream_event(event: &SseEvent) -> Option<Result<AgentChunk, AgentError>> {
    let data = event.data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    if event.event.as_deref() == Some("error") {
        return Some(Err(AgentError::Stream(data.to_string())));
    }

    let chunk: OaiStreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!(data, error = %e, "Skipping unparseable SSE event");
            return None;
        }
    };

    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Some(Err(AgentError::Stream(message)));
    }

    let content: String = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.and_then(|d| d.content))
        .collect();
    let usage = chunk.usage.map(UsageMetrics::from);

    if content.is_empty() && usage.is_none() {
        return None;
    }
    Some(Ok(AgentChunk { content, usage }))
}

impl Agent for OpenAiAgent {
    fn id(&self) -> &str {
        &self.profile.id
    }

    fn name(&self) -> &str {
        &self.profile.name
    }

    fn run(
        &self,
        input: &RunInput,
    ) -> Pin<Box<dyn Future<Output = Result<AgentResponse, AgentError>> + Send + '_>> {
        let body = self.build_request_body(input, false);
        Box::pin(async move {
            let resp = self.send(&body).await?;
            let oai: OaiResponse = resp
                .json()
                .await
                .map_err(|e| AgentError::Decode(format!("Failed to parse completion: {e}")))?;
            Ok(convert_response(oai))
        })
    }

    fn run_stream(
        &self,
        input: &RunInput,
    ) -> Pin<Box<dyn Future<Output = Result<AgentStream, AgentError>> + Send + '_>> {
        let body = self.build_request_body(input, true);
        Box::pin(async move {
            let resp = self.send(&body).await?;

            let stream = SseStream::new(resp.bytes_stream()).filter_map(|result| {
                futures::future::ready(match result {
                    Ok(event) => decode_stream_event(&event),
                    Err(e) => Some(Err(AgentError::Stream(format!(
                        "Upstream stream error: {e}"
                    )))),
                })
            });

            Ok(Box::pin(stream) as AgentStream)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
