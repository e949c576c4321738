use crate::error::SpecificationError;
use crate::llm::{ChatMessage, TextGenerator};
use crate::spec::{Specification, parse_specification};
use crate::workers::SPEC_SAMPLING;
use tracing::info;

const SYSTEM_PROMPT: &str = include_str!("prompts/spec_worker.txt");

/// Converts a natural-language request into a `Specification`. Called
/// once per run; any failure here is fatal for the run.
pub struct SpecWorker<C> {
    client: C,
}

impl<C: TextGenerator> SpecWorker<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub async fn execute(&self, prompt: &str) -> Result<Specification, SpecificationError> {
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let completion = self.client.chat_completion(&messages, SPEC_SAMPLING).await?;

        let specification = parse_specification(&completion.content)?;
        info!(part_name = %specification.part_name, "specification generated");
        Ok(specification)
    }
}
