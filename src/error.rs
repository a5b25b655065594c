use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::agents::AgentError;
use crate::budget::BudgetError;

/// Error code returned in the body of a 429 when the daily ceiling is reached.
pub const BUDGET_EXCEEDED_CODE: &str = "daily_budget_exceeded";

/// Unified application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The designated agent has used up today's budget. This is a designed
    /// outcome of the pre-check, not an infrastructure failure.
    #[error("Daily budget exceeded, resets at {reset_time}")]
    BudgetExceeded {
        reset_time: DateTime<Utc>,
        remaining_eur: f64,
    },

    #[error("Agent error ({status}): {message}")]
    AgentWithStatus { status: u16, message: String },

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Generic error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    r#type: String,
}

/// Body of the 429 returned by the budget pre-check.
#[derive(Debug, Serialize)]
pub struct BudgetExceededBody {
    pub error: &'static str,
    pub reset_time_utc: String,
    pub remaining_eur: f64,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::BudgetExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::AgentWithStatus { .. } | Self::Agent(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::NotFound(_) => "not_found_error",
            Self::BadRequest(_) => "invalid_request_error",
            Self::BudgetExceeded { .. } => "rate_limit_error",
            Self::AgentWithStatus { .. } | Self::Agent(_) => "api_error",
            Self::Database(_) | Self::Internal(_) => "server_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let Self::BudgetExceeded {
            reset_time,
            remaining_eur,
        } = self
        {
            let body = BudgetExceededBody {
                error: BUDGET_EXCEEDED_CODE,
                reset_time_utc: reset_time.to_rfc3339_opts(SecondsFormat::Secs, true),
                remaining_eur,
            };
            return (status, axum::Json(body)).into_response();
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        tracing::error!(error = %err, "Database error");
        Self::Database(err.to_string())
    }
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::Store(e) => Self::from(e),
        }
    }
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        tracing::error!(error = %err, "Agent invocation failed");
        match err {
            AgentError::Api { status, message } => Self::AgentWithStatus { status, message },
            other => Self::Agent(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
