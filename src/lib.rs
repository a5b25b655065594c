pub mod agents;
pub mod api;
pub mod budget;
pub mod config;
pub mod db;
pub mod error;

use crate::agents::AgentRegistry;
use crate::budget::{BudgetTracker, Gateway};
use crate::config::Config;

use std::sync::Arc;

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub budget: Arc<BudgetTracker>,
    pub gateway: Gateway,
    pub agents: AgentRegistry,
}

impl AppState {
    pub fn new(config: Config, budget: BudgetTracker, agents: AgentRegistry) -> Self {
        let budget = Arc::new(budget);
        let gateway = Gateway::new(Arc::clone(&budget), &config.budget);
        Self {
            config: Arc::new(config),
            budget,
            gateway,
            agents,
        }
    }
}
