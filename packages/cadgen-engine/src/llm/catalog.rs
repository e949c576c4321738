use std::fmt;

/// Catalog of OpenRouter model identifiers this tool is known to work
/// with, free-tier options first. Any other identifier can still be
/// supplied through `DEFAULT_MODEL` or `--model`; the catalog only
/// provides the documented default and the `--list-models` style help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownModel {
    GeminiFlash,
    GptOss,
    Mistral7bInstruct,
    Llama31Instruct,
    DeepseekR1,
    Gpt4Turbo,
    Claude3Sonnet,
}

impl KnownModel {
    pub fn id(&self) -> &'static str {
        match self {
            KnownModel::GeminiFlash => "google/gemini-2.5-flash-image-preview:free",
            KnownModel::GptOss => "openai/gpt-oss-20b:free",
            KnownModel::Mistral7bInstruct => "mistralai/mistral-7b-instruct",
            KnownModel::Llama31Instruct => "meta-llama/llama-3.1-405b-instruct:free",
            KnownModel::DeepseekR1 => "deepseek/deepseek-r1:free",
            KnownModel::Gpt4Turbo => "openai/gpt-4-turbo",
            KnownModel::Claude3Sonnet => "anthropic/claude-3-sonnet",
        }
    }

    pub fn is_free(&self) -> bool {
        !matches!(self, KnownModel::Gpt4Turbo | KnownModel::Claude3Sonnet)
    }

    /// The documented default: free, reliable, good at code.
    pub fn default_model() -> Self {
        KnownModel::GptOss
    }

    pub fn free_models() -> &'static [KnownModel] {
        &[
            KnownModel::GeminiFlash,
            KnownModel::GptOss,
            KnownModel::Mistral7bInstruct,
            KnownModel::Llama31Instruct,
            KnownModel::DeepseekR1,
        ]
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
