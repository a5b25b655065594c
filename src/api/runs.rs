use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::agents::{Agent, RunInput, UsageMetrics};
use crate::budget::{MeteringStream, Precheck, insert_remaining_header};
use crate::error::AppError;

fn default_stream() -> bool {
    true
}

/// Body of `POST /agents/{agent_id}/runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    pub message: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Buffered run result.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub agent_id: String,
    pub content: String,
    pub usage: Option<UsageMetrics>,
}

/// POST /agents/{agent_id}/runs
///
/// Forwards one message to an agent. For the metered agent the daily budget
/// is checked first and usage is recorded after the run; a run rejected by
/// the pre-check never reaches the agent.
pub async fn create_agent_run(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(request): Json<RunRequest>,
) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4().to_string();

    let agent = state
        .agents
        .get(&agent_id)
        .ok_or_else(|| AppError::NotFound(format!("Agent '{agent_id}' not found")))?;

    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    tracing::info!(
        request_id = %request_id,
        agent_id = %agent_id,
        stream = request.stream,
        "Agent run request"
    );

    let precheck = state.gateway.precheck(&agent_id)?;

    let input = RunInput {
        message: request.message,
        model: request
            .model
            .unwrap_or_else(|| state.config.agents.default_model.clone()),
        user_id: request.user_id,
        session_id: request.session_id,
    };

    if request.stream {
        handle_streaming(&state, agent.as_ref(), &input, precheck, &request_id).await
    } else {
        handle_non_streaming(&state, agent.as_ref(), &input, precheck, &request_id).await
    }
}

/// Run to completion, meter, and answer with JSON.
async fn handle_non_streaming(
    state: &AppState,
    agent: &dyn Agent,
    input: &RunInput,
    precheck: Precheck,
    request_id: &str,
) -> Result<Response, AppError> {
    let start = Instant::now();
    let result = agent.run(input).await?;

    let remaining = if precheck.is_metered() {
        state.gateway.meter(result.usage);
        state.gateway.remaining_after_meter()
    } else {
        None
    };

    tracing::info!(
        request_id = %request_id,
        agent_id = %agent.id(),
        input_tokens = result.usage.map(|u| u.input_tokens).unwrap_or(0),
        output_tokens = result.usage.map(|u| u.output_tokens).unwrap_or(0),
        latency_ms = start.elapsed().as_millis() as u64,
        "Agent run completed"
    );

    let body = RunResponse {
        agent_id: agent.id().to_string(),
        content: result.content,
        usage: result.usage,
    };
    let mut response = Json(body).into_response();
    if let Some(remaining_eur) = remaining {
        insert_remaining_header(response.headers_mut(), remaining_eur);
    }
    Ok(response)
}

/// Start the agent stream and relay it as SSE. Usage is metered when the
/// stream ends, so the header carries the pre-call remaining budget.
async fn handle_streaming(
    state: &AppState,
    agent: &dyn Agent,
    input: &RunInput,
    precheck: Precheck,
    request_id: &str,
) -> Result<Response, AppError> {
    let stream = agent.run_stream(input).await?;

    tracing::info!(
        request_id = %request_id,
        agent_id = %agent.id(),
        "Agent stream started"
    );

    let gateway = precheck.is_metered().then(|| state.gateway.clone());
    let events = MeteringStream::new(stream, gateway);

    let mut response = Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response();
    if let Precheck::Admitted {
        remaining_eur: Some(remaining_eur),
    } = precheck
    {
        insert_remaining_header(response.headers_mut(), remaining_eur);
    }
    Ok(response)
}
