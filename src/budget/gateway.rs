//! Request-time budget enforcement for the metered agent.
//!
//! ```text
//! START -> PRECHECK -> REJECTED
//!                   -> RUN -> METER -> RESPOND
//! ```
//!
//! Only the configured metered agent goes through PRECHECK and METER; every
//! other agent is admitted with [`Precheck::Bypass`] and is never charged.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::sse::Event;
use tokio_stream::Stream;

use crate::agents::{AgentStream, UsageMetrics};
use crate::budget::store::UsageRecord;
use crate::budget::tracker::BudgetTracker;
use crate::config::{BudgetConfig, StoreFailurePolicy};
use crate::error::AppError;

/// Response header carrying the remaining daily budget.
pub const BUDGET_REMAINING_HEADER: &str = "x-budget-remaining-eur";

/// Outcome of PRECHECK for a request that was not rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Precheck {
    /// Not the metered agent, or enforcement is disabled.
    Bypass,
    /// Metered and admitted. `remaining_eur` is `None` when the store could
    /// not be read and the fail-open policy let the request through.
    Admitted { remaining_eur: Option<f64> },
}

impl Precheck {
    pub fn is_metered(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

/// Applies the daily ceiling to the one metered agent.
#[derive(Clone)]
pub struct Gateway {
    tracker: Arc<BudgetTracker>,
    metered_agent: String,
    enabled: bool,
    on_store_error: StoreFailurePolicy,
}

impl Gateway {
    pub fn new(tracker: Arc<BudgetTracker>, config: &BudgetConfig) -> Self {
        Self {
            tracker,
            metered_agent: config.metered_agent.trim().to_string(),
            enabled: config.enabled,
            on_store_error: config.on_store_error,
        }
    }

    pub fn tracker(&self) -> &Arc<BudgetTracker> {
        &self.tracker
    }

    pub fn metered_agent(&self) -> &str {
        &self.metered_agent
    }

    pub fn is_metered(&self, agent_id: &str) -> bool {
        self.enabled && agent_id == self.metered_agent
    }

    /// PRECHECK. Returns `AppError::BudgetExceeded` when today's spend has
    /// reached the ceiling; the caller must not run the agent in that case.
    pub fn precheck(&self, agent_id: &str) -> Result<Precheck, AppError> {
        if !self.is_metered(agent_id) {
            return Ok(Precheck::Bypass);
        }

        match self.tracker.check_availability() {
            Ok(availability) if availability.available => Ok(Precheck::Admitted {
                remaining_eur: Some(availability.remaining_eur),
            }),
            Ok(availability) => {
                tracing::warn!(
                    agent_id,
                    spend_eur = %format!("{:.4}", availability.spend_eur),
                    reset_time = %availability.reset_time,
                    "Daily budget exceeded, rejecting run"
                );
                Err(AppError::BudgetExceeded {
                    reset_time: availability.reset_time,
                    remaining_eur: availability.remaining_eur,
                })
            }
            Err(e) => match self.on_store_error {
                StoreFailurePolicy::Closed => {
                    tracing::error!(agent_id, error = %e, "Budget check failed, rejecting run");
                    Err(AppError::from(e))
                }
                StoreFailurePolicy::Open => {
                    tracing::warn!(
                        agent_id,
                        error = %e,
                        "Budget check failed, admitting run without enforcement"
                    );
                    Ok(Precheck::Admitted {
                        remaining_eur: None,
                    })
                }
            },
        }
    }

    /// METER. Records billable usage for a completed metered run.
    ///
    /// Never fails: a store error is logged for operators and the run's
    /// response is unaffected.
    pub fn meter(&self, usage: Option<UsageMetrics>) -> Option<UsageRecord> {
        let Some(usage) = usage else {
            tracing::debug!("No usage metrics reported, skipping metering");
            return None;
        };
        if !usage.is_billable() {
            tracing::debug!("Zero usage reported, skipping metering");
            return None;
        }

        match self
            .tracker
            .record_usage(usage.input_tokens, usage.output_tokens)
        {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "Failed to record usage"
                );
                None
            }
        }
    }

    /// Remaining budget re-read after METER, for the response header.
    pub fn remaining_after_meter(&self) -> Option<f64> {
        match self.tracker.check_availability() {
            Ok(availability) => Some(availability.remaining_eur),
            Err(e) => {
                tracing::warn!(error = %e, "Budget re-check failed, omitting remaining header");
                None
            }
        }
    }
}

/// Header value for a remaining amount, with four fractional digits.
pub fn remaining_header_value(remaining_eur: f64) -> HeaderValue {
    HeaderValue::from_str(&format!("{remaining_eur:.4}"))
        .unwrap_or_else(|_| HeaderValue::from_static("0.0000"))
}

/// Attach the remaining-budget header.
pub fn insert_remaining_header(headers: &mut HeaderMap, remaining_eur: f64) {
    headers.insert(
        HeaderName::from_static(BUDGET_REMAINING_HEADER),
        remaining_header_value(remaining_eur),
    );
}

// ---------------------------------------------------------------------------
// MeteringStream
// ---------------------------------------------------------------------------

/// Wraps an agent chunk stream, converting chunks to SSE events while
/// tracking the largest usage seen. Meters once, when the upstream stream
/// ends or when the response is dropped early (client disconnect).
pub struct MeteringStream {
    inner: AgentStream,
    /// `Some` until METER has run; `None` for unmetered agents.
    gateway: Option<Gateway>,
    usage: Option<UsageMetrics>,
    finished: bool,
}

impl MeteringStream {
    pub fn new(inner: AgentStream, gateway: Option<Gateway>) -> Self {
        Self {
            inner,
            gateway,
            usage: None,
            finished: false,
        }
    }

    fn accumulate_usage(&mut self, usage: Option<UsageMetrics>) {
        if let Some(usage) = usage {
            self.usage = Some(match self.usage {
                Some(seen) => seen.max(usage),
                None => usage,
            });
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(gateway) = self.gateway.take() {
            gateway.meter(self.usage);
        }
    }
}

impl Stream for MeteringStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.accumulate_usage(chunk.usage);
                    // SSE fields cannot carry carriage returns.
                    let content = chunk.content.replace('\r', "");
                    if content.is_empty() {
                        continue;
                    }
                    return Poll::Ready(Some(Ok(Event::default().data(content))));
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::error!(error = %e, "Agent stream error");
                    this.finish();
                    let body = serde_json::json!({ "error": e.to_string() });
                    return Poll::Ready(Some(Ok(Event::default()
                        .event("error")
                        .data(body.to_string()))));
                }
                Poll::Ready(None) => {
                    this.finish();
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for MeteringStream {
    fn drop(&mut self) {
        if !self.finished && self.gateway.is_some() {
            tracing::info!("Stream dropped before completion, metering partial usage");
            self.finish();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
