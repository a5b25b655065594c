use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize, PartialEq)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    /// Subject to the daily budget.
    pub metered: bool,
}

/// GET /agents
pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentSummary>> {
    let agents = state
        .agents
        .iter()
        .map(|agent| AgentSummary {
            id: agent.id().to_string(),
            name: agent.name().to_string(),
            metered: state.gateway.is_metered(agent.id()),
        })
        .collect();
    Json(agents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_summary_serialization() {
        let summary = AgentSummary {
            id: "healthsoc_chatbot".to_string(),
            name: "Health in Society Chatbot".to_string(),
            metered: true,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["id"], "healthsoc_chatbot");
        assert_eq!(json["metered"], true);
    }
}
