use thiserror::Error;

/// The natural-language input could not be turned into a usable
/// specification. Fatal for the whole run; never retried internally.
#[derive(Debug, Error)]
pub enum SpecificationError {
    #[error("received an empty or purely whitespace response")]
    EmptyResponse,

    #[error("response is neither valid JSON nor a Python-style literal: {0}")]
    Syntax(String),

    #[error("top-level value is not a mapping")]
    NotAMapping,

    #[error("missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("'cad_operations' must be a non-empty array")]
    EmptyOperations,

    #[error("specification fields have the wrong shape: {0}")]
    InvalidField(String),

    /// The model request itself failed before any text arrived. A bad
    /// specification is not recoverable by local retries, so this is
    /// folded into the fatal path rather than charged to the loop budget.
    #[error("model request failed: {0}")]
    Generation(#[from] LlmError),
}

/// Transport-level failure talking to the text-generation service,
/// surfaced after the client's own bounded backoff is exhausted.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to reach the model endpoint: {0}")]
    Connect(String),

    #[error("model request timed out")]
    Timeout,

    #[error("model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Whether the client-level backoff should retry this failure.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Connect(_) | LlmError::Timeout => true,
            LlmError::Status { status, .. } => {
                matches!(*status, 429 | 500 | 502 | 503 | 504)
            }
            LlmError::MalformedResponse(_) => false,
        }
    }
}

/// Infrastructure failure in the geometry backend, as opposed to a script
/// that ran and produced no solid (which is a `ValidationOutcome`, not an
/// error).
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("failed to launch the script interpreter: {0}")]
    Spawn(String),

    #[error("script harness failed: {0}")]
    Harness(String),

    #[error("solid is not realized; nothing to export")]
    NotRealized,

    #[error("export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of a single generate/validate cycle. Absorbed by the director:
/// the error text becomes feedback for the next attempt and one slot of
/// the iteration budget is consumed.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
