//! Agent personas: display name, description and instructions that make up
//! the system prompt.
//!
//! Profiles are resolved once at startup. Remote instructions are fetched at
//! that point and never again; a failed fetch aborts startup instead of
//! leaving an agent half-configured.

use reqwest::Client;

use crate::agents::AgentKind;
use crate::config::{AgentsConfig, ProfileConfig};

/// A fully resolved persona for one agent id.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub instructions: String,
}

impl AgentProfile {
    /// System prompt sent ahead of the user's message.
    pub fn system_prompt(&self) -> String {
        let description = self.description.trim();
        let instructions = self.instructions.trim();
        match (description.is_empty(), instructions.is_empty()) {
            (true, true) => String::new(),
            (false, true) => description.to_string(),
            (true, false) => format!("Instructions:\n{instructions}"),
            (false, false) => format!("{description}\n\nInstructions:\n{instructions}"),
        }
    }
}

const FRIENDLY_DESCRIPTION: &str = "You are a friendly and helpful chatbot that answers queries \
in a concise manner yet encourages the user to gain more information about the topic.";

const HEALTHSOC_INSTRUCTIONS: &str = "\
- Use the following language style: avoid complicated words, use shorter and simpler sentences.
- After each response, suggest relevant followup questions that encourage the user to understand the topic better.
- In case you do not find the answer to a medical question, suggest that the user consult a medical health professional.";

const MARHINOVIRUS_DESCRIPTION: &str = "\
You are a helpful AI agent whose job it is to educate users on the fictitious disease marhinovirus and its vaccination.
In this fictitious scenario, the user's health is represented by fitness points, which they can lose depending on their decision to get vaccinated or not. It is your job to educate users about their choices regarding a vaccination and to help them reach a choice.

Your writing style is:
- Clear
- Friendly and engaging
- Professional and fact focused
- Accessible to the general public";

const SIMPLE_LANGUAGE_RULES: &str = "\
- Compliant with simple language regulation:
  1. Sentences have at most 20 words, ideally fewer.
  2. Paragraphs have at most 2-3 sentences and one idea each.
  3. The most important information comes first.
  4. Write in active voice.
  5. Always use numerals for numbers and never abbreviate words.
  6. Use one term per concept and stay consistent with it.
  7. Prefer lists over flowing text where appropriate.
  8. The text is readable at the American 6th grade level.";

const NORMAL_INSTRUCTIONS: &str = "\
- Search your knowledge base before answering any question.
- If you do not find the answer in your knowledge base, admit that you do not know the answer and refer people to a healthcare professional.
- After answering the question, ask the user if they have any other questions regarding the virus or its vaccine.";

const SIMPLE_INSTRUCTIONS_EXTRA: &str = "\
- Make sure that your answers are compliant with the simple language regulations.
- Where applicable, use plain alternatives to medical words.";

/// The persona an agent has when configuration does not override it.
pub fn builtin_profile(kind: AgentKind) -> AgentProfile {
    let (description, instructions) = match kind {
        AgentKind::HealthsocChatbot => (
            FRIENDLY_DESCRIPTION.to_string(),
            HEALTHSOC_INSTRUCTIONS.to_string(),
        ),
        AgentKind::ControlMarhinovirus => (
            MARHINOVIRUS_DESCRIPTION.to_string(),
            NORMAL_INSTRUCTIONS.to_string(),
        ),
        AgentKind::SimpleLanguageMarhinovirus | AgentKind::SimpleCatalogLanguageMarhinovirus => (
            format!("{MARHINOVIRUS_DESCRIPTION}\n{SIMPLE_LANGUAGE_RULES}"),
            format!("{NORMAL_INSTRUCTIONS}\n{SIMPLE_INSTRUCTIONS_EXTRA}"),
        ),
    };

    AgentProfile {
        id: kind.id().to_string(),
        name: kind.display_name().to_string(),
        description,
        instructions,
    }
}

pub fn builtin_profiles() -> Vec<AgentProfile> {
    AgentKind::ALL.into_iter().map(builtin_profile).collect()
}

/// Apply the inline parts of a profile override. `instructions_url` is
/// handled by [`resolve_profiles`].
fn apply_override(profile: &mut AgentProfile, config: &ProfileConfig) {
    if let Some(ref name) = config.name {
        profile.name = name.clone();
    }
    if let Some(ref description) = config.description {
        profile.description = description.clone();
    }
    if let Some(ref instructions) = config.instructions {
        profile.instructions = instructions.clone();
    }
}

/// Build the final profile list: built-ins first, then configured overrides
/// in order. Overrides for unknown ids add new agents.
pub async fn resolve_profiles(
    config: &AgentsConfig,
    client: &Client,
) -> anyhow::Result<Vec<AgentProfile>> {
    let mut profiles = builtin_profiles();

    for entry in &config.profiles {
        let index = match profiles.iter().position(|p| p.id == entry.id) {
            Some(index) => index,
            None => {
                profiles.push(AgentProfile {
                    id: entry.id.clone(),
                    name: entry.id.clone(),
                    description: String::new(),
                    instructions: String::new(),
                });
                profiles.len() - 1
            }
        };

        let profile = &mut profiles[index];
        apply_override(profile, entry);

        if let Some(ref url) = entry.instructions_url {
            profile.instructions = fetch_instructions(client, url).await.map_err(|e| {
                anyhow::anyhow!("Failed to load instructions for agent '{}': {e}", entry.id)
            })?;
            tracing::info!(agent_id = %entry.id, url = %url, "Loaded remote agent instructions");
        }
    }

    Ok(profiles)
}

async fn fetch_instructions(client: &Client, url: &str) -> anyhow::Result<String> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("GET {url} returned {status}");
    }
    let text = resp.text().await?;
    if text.trim().is_empty() {
        anyhow::bail!("GET {url} returned an empty document");
    }
    Ok(text)
}
