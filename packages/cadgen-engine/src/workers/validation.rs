use crate::error::GeometryError;
use crate::geometry::{GeometryBackend, ValidationOutcome};
use tracing::{info, warn};

/// Runs a generated script against the geometry backend and reports the
/// outcome. Script-level faults come back inside the outcome as
/// diagnostics; only backend infrastructure failures surface as errors.
pub struct ValidationWorker<B> {
    backend: B,
}

impl<B: GeometryBackend> ValidationWorker<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub async fn execute(&self, script: &str) -> Result<ValidationOutcome, GeometryError> {
        let outcome = self.backend.run_script(script).await?;
        if outcome.success {
            info!("script validation succeeded");
        } else {
            warn!(
                diagnostic = outcome.diagnostic.as_deref().unwrap_or("unknown"),
                "script validation failed"
            );
        }
        Ok(outcome)
    }
}
