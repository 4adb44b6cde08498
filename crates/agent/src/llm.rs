use anyhow::Result;
use async_trait::async_trait;

/// Pluggable completion backend (OpenAI, Anthropic, Ollama).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
