use std::sync::Arc;

use reqwest::Client;

use crate::agents::Agent;
use crate::agents::openai::{OpenAiAgent, OpenAiConfig};
use crate::agents::profile::AgentProfile;

/// The agents this process serves, keyed by id. Built once at startup.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One OpenAI-compatible agent per profile, sharing `client`.
    pub fn from_profiles(
        profiles: Vec<AgentProfile>,
        config: &OpenAiConfig,
        client: &Client,
    ) -> Self {
        let mut registry = Self::new();
        for profile in profiles {
            registry.register(Arc::new(OpenAiAgent::with_client(
                profile,
                config.clone(),
                client.clone(),
            )));
        }
        registry
    }

    /// Add an agent, replacing any existing agent with the same id.
    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        match self.agents.iter().position(|a| a.id() == agent.id()) {
            Some(index) => self.agents[index] = agent,
            None => self.agents.push(agent),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.iter().find(|a| a.id() == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.iter().any(|a| a.id() == id)
    }

    /// Agent ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.id().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Agent>> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;
    use crate::agents::profile::{builtin_profile, builtin_profiles};

    fn config() -> OpenAiConfig {
        OpenAiConfig {
            base_url: "http://localhost:4000/v1".to_string(),
            api_key: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_from_profiles_registers_all_builtins() {
        let registry = AgentRegistry::from_profiles(builtin_profiles(), &config(), &Client::new());
        assert_eq!(registry.len(), AgentKind::ALL.len());
        assert_eq!(
            registry.ids(),
            vec![
                "healthsoc_chatbot",
                "control_agent",
                "simple_lg_agent",
                "simple_catalog_lg_agent"
            ]
        );
        let agent = registry.get("control_agent").unwrap();
        assert_eq!(agent.name(), "Control Marhinovirus Agent");
    }

    #[test]
    fn test_unknown_agent_is_absent() {
        let registry = AgentRegistry::from_profiles(builtin_profiles(), &config(), &Client::new());
        assert!(registry.get("hrn_agent").is_none());
        assert!(!registry.contains("hrn_agent"));
        assert!(AgentRegistry::new().is_empty());
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = AgentRegistry::new();
        let mut profile = builtin_profile(AgentKind::HealthsocChatbot);
        registry.register(Arc::new(OpenAiAgent::with_client(
            profile.clone(),
            config(),
            Client::new(),
        )));
        profile.name = "Renamed".to_string();
        registry.register(Arc::new(OpenAiAgent::with_client(profile, config(), Client::new())));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("healthsoc_chatbot").unwrap().name(), "Renamed");
    }
}
