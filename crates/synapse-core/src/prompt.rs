//! Prompt assembly for one agent turn.

use synapse_contracts::{llm::ChatMessage, state::SharedState};

/// Heading that introduces recalled memory in the system prompt.
pub const MEMORY_HEADING: &str = "### LONG-TERM MEMORY (Past Experiences):";

/// The agent's role prompt followed by the recalled experiences.
pub fn system_prompt(role_prompt: &str, recalled: &str) -> String {
    format!(
        "{}\n\n{}\nUse the following successful past solutions to guide your decision:\n{}",
        role_prompt.trim(),
        MEMORY_HEADING,
        recalled
    )
}

/// Prior transcript (`agent_id: content`, append order) followed by the task.
pub fn user_prompt(state: &SharedState) -> String {
    let mut out = String::new();
    for message in &state.messages {
        out.push_str(message.agent_id.as_str());
        out.push_str(": ");
        out.push_str(&message.content);
        out.push('\n');
    }
    if !state.messages.is_empty() {
        out.push('\n');
    }
    out.push_str("Current Task: ");
    out.push_str(state.original_query());
    out
}

/// The ordered chat sent to the model: one system turn, one user turn.
pub fn build(role_prompt: &str, recalled: &str, state: &SharedState) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(role_prompt, recalled)),
        ChatMessage::user(user_prompt(state)),
    ]
}
