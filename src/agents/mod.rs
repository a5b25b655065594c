//! Agent Module
//!
//! Defines the `Agent` trait the run endpoint talks to, the explicit usage
//! metrics value decoded at the agent boundary, and the built-in agent
//! identities.

pub mod openai;
pub mod profile;
pub mod registry;
pub mod sse;

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use futures::Stream;
use serde::{Deserialize, Serialize};

pub use self::registry::AgentRegistry;

// ---------------------------------------------------------------------------
// AgentError
// ---------------------------------------------------------------------------

/// Errors that can occur while running an agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Run input / output
// ---------------------------------------------------------------------------

/// One message sent to an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInput {
    pub message: String,
    pub model: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

/// Token usage reported by an agent invocation.
///
/// `Option<UsageMetrics>` is `None` when the invocation path exposed no usage
/// at all; counters missing from a reported usage object decode as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetrics {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

impl UsageMetrics {
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Worth recording: at least one counter is non-zero.
    pub fn is_billable(&self) -> bool {
        self.input_tokens > 0 || self.output_tokens > 0
    }

    /// Field-wise maximum. Streams report cumulative usage, usually only on
    /// the final chunk, so the largest value seen wins.
    pub fn max(self, other: Self) -> Self {
        Self {
            input_tokens: self.input_tokens.max(other.input_tokens),
            output_tokens: self.output_tokens.max(other.output_tokens),
        }
    }
}

/// Buffered agent result.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    pub content: String,
    pub usage: Option<UsageMetrics>,
}

/// One incremental piece of a streamed agent result.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentChunk {
    pub content: String,
    pub usage: Option<UsageMetrics>,
}

/// Boxed stream of agent chunks.
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<AgentChunk, AgentError>> + Send>>;

// ---------------------------------------------------------------------------
// Agent trait
// ---------------------------------------------------------------------------

/// An agent the gateway can forward a message to.
///
/// Async methods return boxed futures so the trait is dyn-compatible and can
/// be stored as `Arc<dyn Agent>`.
pub trait Agent: Send + Sync {
    /// Stable identifier used in the URL path (e.g. "healthsoc_chatbot").
    fn id(&self) -> &str;

    /// Human-readable display name.
    fn name(&self) -> &str;

    /// Run to completion and return the whole answer.
    fn run(
        &self,
        input: &RunInput,
    ) -> Pin<Box<dyn Future<Output = Result<AgentResponse, AgentError>> + Send + '_>>;

    /// Run and return the answer incrementally.
    fn run_stream(
        &self,
        input: &RunInput,
    ) -> Pin<Box<dyn Future<Output = Result<AgentStream, AgentError>> + Send + '_>>;
}

// ---------------------------------------------------------------------------
// Built-in agent identities
// ---------------------------------------------------------------------------

/// The agents this deployment ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    HealthsocChatbot,
    ControlMarhinovirus,
    SimpleLanguageMarhinovirus,
    SimpleCatalogLanguageMarhinovirus,
}

impl AgentKind {
    pub const ALL: [Self; 4] = [
        Self::HealthsocChatbot,
        Self::ControlMarhinovirus,
        Self::SimpleLanguageMarhinovirus,
        Self::SimpleCatalogLanguageMarhinovirus,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::HealthsocChatbot => "healthsoc_chatbot",
            Self::ControlMarhinovirus => "control_agent",
            Self::SimpleLanguageMarhinovirus => "simple_lg_agent",
            Self::SimpleCatalogLanguageMarhinovirus => "simple_catalog_lg_agent",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::HealthsocChatbot => "Health in Society Chatbot",
            Self::ControlMarhinovirus => "Control Marhinovirus Agent",
            Self::SimpleLanguageMarhinovirus => "Simple Language Marhinovirus Agent",
            Self::SimpleCatalogLanguageMarhinovirus => {
                "Simple Catalog and Language Marhinovirus Agent"
            }
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AgentKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| format!("Unknown agent: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
