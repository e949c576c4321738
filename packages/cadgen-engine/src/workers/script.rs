use crate::error::LlmError;
use crate::llm::{ChatMessage, TextGenerator};
use crate::spec::{Specification, strip_code_fences};
use crate::workers::SCRIPT_SAMPLING;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = include_str!("prompts/script_worker.txt");

/// Generates a CadQuery script from a specification, optionally layering
/// corrective feedback from the previous attempt on top of it. Output is
/// stochastic; callers must not assume two calls agree.
pub struct ScriptWorker<C> {
    client: C,
}

impl<C: TextGenerator> ScriptWorker<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub async fn execute(
        &self,
        specification: &Specification,
        feedback: Option<&str>,
    ) -> Result<String, LlmError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(specification, feedback)),
        ];
        let completion = self
            .client
            .chat_completion(&messages, SCRIPT_SAMPLING)
            .await?;

        let script = strip_code_fences(&completion.content).to_string();
        soft_validate(&script);
        debug!(chars = script.len(), "script generated");
        Ok(script)
    }
}

/// The feedback never replaces the specification; it is appended as
/// corrective guidance on top of it.
fn build_user_prompt(specification: &Specification, feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "Generate CadQuery code for this specification:\n\n{}",
        specification.to_json_pretty()
    );
    if let Some(feedback) = feedback {
        prompt.push_str("\n\nINCORPORATE THIS FEEDBACK:\n");
        prompt.push_str(feedback);
    }
    prompt
}

/// Heuristic checks only. Warns on suspicious shapes but never rejects:
/// real validation is the geometry backend's job, and a heuristic must
/// not block an unusually shaped but legitimate script from reaching it.
fn soft_validate(script: &str) {
    if !script.contains("import cadquery") {
        warn!("generated script may be missing the cadquery import");
    }
    if !script.contains("result =") && !script.contains("result=") {
        warn!("generated script may be missing the 'result' binding");
    }
}
