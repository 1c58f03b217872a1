//! An offline language model for running pipelines without a vendor API.

use async_trait::async_trait;

use synapse_contracts::{
    error::{SynapseError, SynapseResult},
    llm::{ChatMessage, Role},
};
use synapse_core::traits::LanguageModel;

/// Answers deterministically from the prompt: the first sentence of the
/// role prompt, then the task line.
#[derive(Debug, Default)]
pub struct EchoModel;

#[async_trait]
impl LanguageModel for EchoModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> SynapseResult<String> {
        let system = find(messages, Role::System)?;
        let user = find(messages, Role::User)?;

        let role = system
            .split_terminator('.')
            .next()
            .unwrap_or_default()
            .trim();
        let task = user
            .lines()
            .rev()
            .find(|l| l.starts_with("Current Task:"))
            .unwrap_or(user);

        Ok(format!("[{}] acknowledged. {}", role, task))
    }
}

fn find(messages: &[ChatMessage], role: Role) -> SynapseResult<&str> {
    messages
        .iter()
        .find(|m| m.role == role)
        .map(|m| m.content.as_str())
        .ok_or_else(|| SynapseError::ModelError {
            reason: format!("prompt has no {:?} message", role),
        })
}
