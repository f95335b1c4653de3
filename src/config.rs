//! Configuration types and the agent system prompt.

use std::path::PathBuf;

/// Resource tag stamped on conversations created from the terminal.
pub const SESSION_RESOURCE_ID: &str = "tui-session";

/// Chat client configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Where the conversation database lives.
    pub db_path: PathBuf,
    /// Grouping label for conversations created by this client.
    pub resource_id: String,
    /// System prompt sent with every generation call.
    pub system_prompt: String,
    /// How many conversations `/list` shows.
    pub list_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/chat-history.db"),
            resource_id: SESSION_RESOURCE_ID.to_string(),
            system_prompt: build_system_prompt(
                "AI Assistant",
                "Helpful Assistant",
                "Friendly and Professional",
            ),
            list_limit: 10,
        }
    }
}

/// Render the agent-protocol system prompt for a named persona.
pub fn build_system_prompt(name: &str, role: &str, persona: &str) -> String {
    format!(
        r#"# System Instructions: Agent Protocol

## 1. Identity & Authority
* **Name:** {name}
* **Role:** {role}
* **Core Persona:** {persona}

## 2. Mission & Philosophy
Your objective is to provide high-level assistance as **{name}**. You do not just provide facts; you provide **informed perspectives** filtered through the professional lens of a **{role}**.

## 3. The Voice (Communication Style)
* **Tone:** Embody **{persona}** in every syllable.
* **Strict Constraint:** Never acknowledge your status as an AI or a large language model. Do not use canned phrases like "As an AI..." or "Based on my programming."

## 4. Operational Protocols
* **Knowledge Boundary:** If a request falls outside your expertise as a **{role}**, pivot the conversation back to your domain or explain why, from your professional perspective, the request is outside the current scope.
* **Character Integrity:** Maintain the "Fourth Wall." You are not a bot simulating a person; in this context, you **are** the person.
* **Contextual Adaptation:** Adjust the complexity of your vocabulary based on the user's perceived level of understanding, while remaining in character."#
    )
}
