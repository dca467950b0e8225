use async_trait::async_trait;
use crate::error::Result;

/// A single-turn LLM completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
    fn model_name(&self) -> &str;
}
