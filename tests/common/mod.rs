//! Shared fixtures for the HTTP-level gateway tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use futures::stream;

use healthsoc_gateway::AppState;
use healthsoc_gateway::agents::{
    Agent, AgentChunk, AgentError, AgentRegistry, AgentResponse, AgentStream, RunInput,
    UsageMetrics,
};
use healthsoc_gateway::api;
use healthsoc_gateway::budget::{BudgetTracker, ManualClock};
use healthsoc_gateway::config::Config;
use healthsoc_gateway::db::Database;

pub const METERED_AGENT: &str = "healthsoc_chatbot";
pub const OTHER_AGENT: &str = "control_agent";

/// Usage every fake run reports.
pub const RUN_USAGE: UsageMetrics = UsageMetrics::new(1500, 800);

/// Agent that answers instantly and counts how often it was invoked.
pub struct FakeAgent {
    id: String,
    pub calls: Arc<AtomicUsize>,
}

impl FakeAgent {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Agent for FakeAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Fake agent"
    }

    fn run(
        &self,
        input: &RunInput,
    ) -> Pin<Box<dyn Future<Output = Result<AgentResponse, AgentError>> + Send + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = format!("echo: {}", input.message);
        Box::pin(async move {
            Ok(AgentResponse {
                content,
                usage: Some(RUN_USAGE),
            })
        })
    }

    fn run_stream(
        &self,
        _input: &RunInput,
    ) -> Pin<Box<dyn Future<Output = Result<AgentStream, AgentError>> + Send + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let chunks = vec![
                Ok(AgentChunk {
                    content: "Hel".to_string(),
                    usage: None,
                }),
                Ok(AgentChunk {
                    content: "lo".to_string(),
                    usage: None,
                }),
                Ok(AgentChunk {
                    content: String::new(),
                    usage: Some(RUN_USAGE),
                }),
            ];
            let stream: AgentStream = Box::pin(stream::iter(chunks));
            Ok(stream)
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub db: Database,
    pub clock: Arc<ManualClock>,
    pub metered_calls: Arc<AtomicUsize>,
    pub other_calls: Arc<AtomicUsize>,
}

impl TestApp {
    pub fn metered_calls(&self) -> usize {
        self.metered_calls.load(Ordering::SeqCst)
    }

    pub fn other_calls(&self) -> usize {
        self.other_calls.load(Ordering::SeqCst)
    }

    /// Rows recorded for the current budget day.
    pub fn records_today(&self) -> usize {
        let today = self.state.budget.today();
        self.state.budget.store().records_on(today).unwrap().len()
    }
}

/// 2025-06-15 12:00 in Vienna (CEST, UTC+2).
pub fn summer_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap()
}

pub fn test_app() -> TestApp {
    test_app_with(Config::default())
}

pub fn test_app_with(config: Config) -> TestApp {
    let db = Database::open_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(summer_noon()));
    let budget = BudgetTracker::from_config(db.clone(), &config.budget, clock.clone()).unwrap();

    let metered = FakeAgent::new(METERED_AGENT);
    let other = FakeAgent::new(OTHER_AGENT);
    let metered_calls = Arc::clone(&metered.calls);
    let other_calls = Arc::clone(&other.calls);

    let mut agents = AgentRegistry::new();
    agents.register(Arc::new(metered));
    agents.register(Arc::new(other));

    let state = AppState::new(config, budget, agents);
    let router = api::build_api_router().with_state(state.clone());

    TestApp {
        router,
        state,
        db,
        clock,
        metered_calls,
        other_calls,
    }
}
