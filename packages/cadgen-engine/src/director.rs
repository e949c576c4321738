//! The iteration controller: one specification, then a bounded
//! generate → validate → feedback loop.

use crate::config::DEFAULT_MAX_ITERATIONS;
use crate::error::{AttemptError, SpecificationError};
use crate::geometry::{GeometryBackend, SolidHandle, ValidationOutcome};
use crate::llm::TextGenerator;
use crate::logging::RunLogger;
use crate::spec::Specification;
use crate::workers::feedback::FeedbackWorker;
use crate::workers::script::ScriptWorker;
use crate::workers::spec::SpecWorker;
use crate::workers::validation::ValidationWorker;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Terminal outcome of one run. `Exhausted` is a normal result, not an
/// error: the loop ran out of budget. Only a failed specification stage
/// crosses the boundary as an `Err`.
#[derive(Debug)]
pub enum RunOutcome {
    Success {
        solid: SolidHandle,
        script: String,
        specification: Specification,
        iterations: usize,
    },
    Exhausted {
        specification: Specification,
        last_error: String,
        attempts: usize,
    },
    Cancelled {
        attempts: usize,
    },
}

enum AttemptResult {
    Valid { solid: SolidHandle, script: String },
    Invalid { script: String, diagnostic: String },
}

/// Drives the whole workflow for one request. Holds no state across
/// `run` calls; concurrent runs share only the client's connection pool.
pub struct Director<C, B> {
    spec_worker: SpecWorker<C>,
    script_worker: ScriptWorker<C>,
    validation_worker: ValidationWorker<B>,
    feedback_worker: FeedbackWorker<C>,
    max_iterations: usize,
    cancel: CancellationToken,
    logger: Option<RunLogger>,
}

impl<C, B> Director<C, B>
where
    C: TextGenerator + Clone,
    B: GeometryBackend,
{
    pub fn new(client: C, backend: B) -> Self {
        Self {
            spec_worker: SpecWorker::new(client.clone()),
            script_worker: ScriptWorker::new(client.clone()),
            validation_worker: ValidationWorker::new(backend),
            feedback_worker: FeedbackWorker::new(client),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            cancel: CancellationToken::new(),
            logger: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Cancelling the token abandons the run at the next checkpoint,
    /// including a pending model call; the run then resolves to
    /// `RunOutcome::Cancelled`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_run_logger(mut self, logger: RunLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub async fn run(&self, prompt: &str) -> Result<RunOutcome, SpecificationError> {
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, "starting CAD generation");
        if let Some(logger) = &self.logger {
            let _ = logger.log_run_start(&run_id, prompt).await;
        }

        let specification = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(RunOutcome::Cancelled { attempts: 0 }),
            spec = self.spec_worker.execute(prompt) => spec?,
        };
        if let Some(logger) = &self.logger {
            let _ = logger
                .log_spec_generated(&specification.part_name, specification.cad_operations.len())
                .await;
        }

        let mut feedback: Option<String> = None;
        let mut last_error = String::new();

        for attempt in 1..=self.max_iterations {
            if self.cancel.is_cancelled() {
                return Ok(RunOutcome::Cancelled {
                    attempts: attempt - 1,
                });
            }

            info!(attempt, max = self.max_iterations, "generation attempt");
            if let Some(logger) = &self.logger {
                let _ = logger.log_attempt_start(attempt, self.max_iterations).await;
            }

            let result = tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Ok(RunOutcome::Cancelled { attempts: attempt - 1 });
                }
                result = self.run_attempt(&specification, feedback.as_deref(), attempt) => result,
            };

            match result {
                Ok(AttemptResult::Valid { solid, script }) => {
                    if let Some(logger) = &self.logger {
                        let _ = logger.log_run_complete("success", attempt).await;
                    }
                    return Ok(RunOutcome::Success {
                        solid,
                        script,
                        specification,
                        iterations: attempt,
                    });
                }
                Ok(AttemptResult::Invalid { script, diagnostic }) => {
                    last_error = diagnostic.clone();
                    let next = tokio::select! {
                        _ = self.cancel.cancelled() => {
                            return Ok(RunOutcome::Cancelled { attempts: attempt });
                        }
                        fb = self.synthesize_feedback(&script, &diagnostic, &specification) => fb,
                    };
                    if let Some(logger) = &self.logger {
                        let _ = logger.log_feedback(attempt, &next).await;
                    }
                    feedback = Some(next);
                }
                // A fault anywhere inside the attempt consumes one retry
                // slot instead of aborting the run; the raw error text
                // becomes the next attempt's feedback.
                Err(err) => {
                    warn!(attempt, error = %err, "attempt failed");
                    if let Some(logger) = &self.logger {
                        let _ = logger.log_error("attempt failed", Some(&err.to_string())).await;
                    }
                    last_error = err.to_string();
                    feedback = Some(format!("Previous attempt failed with error: {err}"));
                }
            }
        }

        if let Some(logger) = &self.logger {
            let _ = logger.log_run_complete("exhausted", self.max_iterations).await;
        }
        Ok(RunOutcome::Exhausted {
            specification,
            last_error,
            attempts: self.max_iterations,
        })
    }

    async fn run_attempt(
        &self,
        specification: &Specification,
        feedback: Option<&str>,
        attempt: usize,
    ) -> Result<AttemptResult, AttemptError> {
        let script = self.script_worker.execute(specification, feedback).await?;
        if let Some(logger) = &self.logger {
            let _ = logger.log_script_generated(attempt, &script).await;
        }

        let outcome = self.validation_worker.execute(&script).await?;
        if let Some(logger) = &self.logger {
            let _ = logger
                .log_validation(attempt, outcome.success, outcome.diagnostic.as_deref())
                .await;
        }

        match outcome {
            ValidationOutcome {
                success: true,
                solid: Some(solid),
                ..
            } => Ok(AttemptResult::Valid { solid, script }),
            ValidationOutcome { diagnostic, .. } => Ok(AttemptResult::Invalid {
                script,
                diagnostic: diagnostic
                    .unwrap_or_else(|| "no valid 'result' object found".to_string()),
            }),
        }
    }

    /// The loop must never abort because feedback synthesis failed, so a
    /// failed call degrades to a fallback string carrying the raw error.
    async fn synthesize_feedback(
        &self,
        script: &str,
        diagnostic: &str,
        specification: &Specification,
    ) -> String {
        match self
            .feedback_worker
            .execute(script, diagnostic, specification)
            .await
        {
            Ok(feedback) => feedback,
            Err(err) => {
                warn!(error = %err, "feedback synthesis failed, using fallback");
                format!(
                    "The previous script failed validation with: {diagnostic}. \
                     (feedback synthesis also failed: {err})"
                )
            }
        }
    }
}
