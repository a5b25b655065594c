pub mod agents;
pub mod budget;
pub mod health;
pub mod runs;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

/// Build the API router.
///
/// Route layout:
/// ```text
/// /health                        GET
/// /agents                        GET
/// /agents/{agent_id}/runs        POST   (metered agent: budget enforced)
/// /budget                        GET
/// ```
pub fn build_api_router() -> Router<AppState> {
    let agent_routes = Router::new()
        .route("/", get(agents::list_agents))
        .route("/{agent_id}/runs", post(runs::create_agent_run));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/budget", get(budget::budget_status))
        .nest("/agents", agent_routes)
}
