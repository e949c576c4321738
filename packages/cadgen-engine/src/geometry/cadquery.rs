//! CadQuery-backed geometry execution. Scripts run in a throwaway temp
//! directory through an embedded Python harness whose namespace exposes
//! only the geometry entry points; the harness reports strict JSON on
//! stdout. The sandbox is a security boundary: a malformed generated
//! script gets no ambient file or network access through us.

use crate::error::GeometryError;
use crate::geometry::{ExportFormat, GeometryBackend, SolidHandle, ValidationOutcome};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Output;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

const RUN_HARNESS: &str = include_str!("run_script.py");
const EXPORT_HARNESS: &str = include_str!("export_solid.py");

/// Exit code the harness uses for environment-level failures, as opposed
/// to failures of the script under test.
const HARNESS_FAULT: i32 = 3;

#[derive(Debug, Clone)]
pub struct CadQueryBackend {
    python: String,
}

impl Default for CadQueryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CadQueryBackend {
    pub fn new() -> Self {
        Self {
            python: "python3".to_string(),
        }
    }

    pub fn with_python(mut self, interpreter: impl Into<String>) -> Self {
        self.python = interpreter.into();
        self
    }

    async fn run_harness(&self, harness: &str, dir: &Path, args: &[&str]) -> Result<Output, GeometryError> {
        let harness_path = dir.join("harness.py");
        tokio::fs::write(&harness_path, harness).await?;

        Command::new(&self.python)
            .arg(&harness_path)
            .args(args)
            .current_dir(dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GeometryError::Spawn(format!("{}: {e}", self.python)))
    }
}

#[async_trait]
impl GeometryBackend for CadQueryBackend {
    async fn run_script(&self, script: &str) -> Result<ValidationOutcome, GeometryError> {
        let workdir = TempDir::with_prefix("cadgen-")?;
        let script_path = workdir.path().join("script.py");
        let model_path = workdir.path().join("model.brep");
        tokio::fs::write(&script_path, script).await?;

        let output = self
            .run_harness(
                RUN_HARNESS,
                workdir.path(),
                &[
                    &script_path.to_string_lossy(),
                    &model_path.to_string_lossy(),
                ],
            )
            .await?;

        let report = parse_report(&output)?;
        debug!(success = report.success, "script harness finished");

        if report.success {
            Ok(ValidationOutcome::realized(SolidHandle::new(
                model_path,
                Arc::new(workdir),
            )))
        } else {
            Ok(ValidationOutcome::failure(
                report.error.unwrap_or_else(|| "unknown failure".to_string()),
            ))
        }
    }

    async fn export(
        &self,
        solid: &SolidHandle,
        dest: &Path,
        format: ExportFormat,
    ) -> Result<(), GeometryError> {
        if !solid.is_realized() {
            return Err(GeometryError::NotRealized);
        }

        let workdir = TempDir::with_prefix("cadgen-export-")?;
        let output = self
            .run_harness(
                EXPORT_HARNESS,
                workdir.path(),
                &[
                    &solid.artifact_path().to_string_lossy(),
                    &dest.to_string_lossy(),
                    format.extension(),
                ],
            )
            .await?;

        let report = parse_report(&output)?;
        if report.success {
            Ok(())
        } else {
            Err(GeometryError::Export(
                report.error.unwrap_or_else(|| "unknown failure".to_string()),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct HarnessReport {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

fn parse_report(output: &Output) -> Result<HarnessReport, GeometryError> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");

    let report: HarnessReport = serde_json::from_str(line).map_err(|_| {
        let stderr = String::from_utf8_lossy(&output.stderr);
        GeometryError::Harness(format!(
            "unreadable harness report (exit {:?}): {}",
            output.status.code(),
            if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            }
        ))
    })?;

    if output.status.code() == Some(HARNESS_FAULT) {
        return Err(GeometryError::Harness(
            report.error.unwrap_or_else(|| "unknown harness fault".to_string()),
        ));
    }

    Ok(report)
}
