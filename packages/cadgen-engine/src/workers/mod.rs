//! The four request/response workers around the iteration loop. Each one
//! is a thin wrapper over a collaborator: the three generation workers
//! talk to the text-generation service, the validation worker drives the
//! geometry backend. They are generic over the client so tests substitute
//! scripted mocks.

use crate::llm::SamplingProfile;

pub mod feedback;
pub mod script;
pub mod spec;
pub mod validation;

/// Specification generation wants determinism.
pub(crate) const SPEC_SAMPLING: SamplingProfile = SamplingProfile {
    temperature: 0.0,
    max_tokens: 5000,
};

/// Script generation tolerates a little variation between retries.
pub(crate) const SCRIPT_SAMPLING: SamplingProfile = SamplingProfile {
    temperature: 0.3,
    max_tokens: 5000,
};

/// Feedback is short free-form prose.
pub(crate) const FEEDBACK_SAMPLING: SamplingProfile = SamplingProfile {
    temperature: 0.5,
    max_tokens: 500,
};
