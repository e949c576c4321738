use crate::error::LlmError;
use crate::llm::{ChatMessage, TextGenerator};
use crate::spec::Specification;
use crate::workers::FEEDBACK_SAMPLING;
use tracing::debug;

const SYSTEM_PROMPT: &str = include_str!("prompts/feedback_worker.txt");

/// Turns one failed attempt into corrective guidance for the next one.
/// The output is opaque text; nobody validates its structure.
pub struct FeedbackWorker<C> {
    client: C,
}

impl<C: TextGenerator> FeedbackWorker<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub async fn execute(
        &self,
        script: &str,
        diagnostic: &str,
        specification: &Specification,
    ) -> Result<String, LlmError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(script, diagnostic, specification)),
        ];
        let completion = self
            .client
            .chat_completion(&messages, FEEDBACK_SAMPLING)
            .await?;

        debug!(chars = completion.content.len(), "feedback generated");
        Ok(completion.content)
    }
}

fn build_prompt(script: &str, diagnostic: &str, specification: &Specification) -> String {
    format!(
        "Generated code failed validation. Provide specific feedback to improve it.\n\n\
         ERROR: {diagnostic}\n\n\
         ORIGINAL SPECIFICATION:\n{}\n\n\
         FAILED CODE:\n```python\n{script}\n```",
        specification.to_json_pretty()
    )
}
