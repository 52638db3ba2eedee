//! Feedback stage.

use tracing::debug;

use crate::client::{ChatMessage, CompletionService};
use crate::config::ModelConfig;
use crate::error::Result;
use crate::prompts::{format_feedback_request, SYSTEM_PROMPT_FEEDBACK};

/// Generate learner-facing guidance from an assembled context block.
///
/// The completion is returned exactly as the model produced it.
pub async fn generate_feedback(
    service: &dyn CompletionService,
    model: &ModelConfig,
    context: &str,
) -> Result<String> {
    let messages = vec![
        ChatMessage::system(SYSTEM_PROMPT_FEEDBACK),
        ChatMessage::user(format_feedback_request(context)),
    ];
    let feedback = service.complete(model, messages).await?;
    debug!(chars = feedback.len(), "Feedback generated");
    Ok(feedback)
}
