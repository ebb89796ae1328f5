//! Completion-service seam

use crate::types::{CompletionRequest, CompletionResponse};
use crate::Result;
use async_trait::async_trait;

/// A hosted text-completion service
///
/// Implementations perform exactly one network round trip per call and map
/// every failure to [`crate::AskerError`]. Deadlines and cancellation are
/// applied by the caller through [`crate::with_deadline`].
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Run one completion
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
