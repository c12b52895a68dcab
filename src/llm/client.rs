use crate::types::{ChatTurn, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Capability trait for answer generation.
///
/// Both paths take the same inputs: a grounding system prompt, prior
/// role-tagged turns (oldest first), and the new question, which becomes the
/// final user turn.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a whole answer.
    async fn generate(&self, system: &str, history: &[ChatTurn], question: &str)
        -> Result<String>;

    /// Generate incrementally. The stream is finite and not restartable;
    /// fragments concatenate to the full answer.
    async fn stream(
        &self,
        system: &str,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<BoxStream<'static, Result<String>>>;

    /// Model identifier used for this provider.
    fn model_name(&self) -> &str;
}
