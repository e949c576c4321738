//! Scripted geometry backend for tests: no interpreter, no kernel, just
//! queued outcomes and call recording.

use crate::error::GeometryError;
use crate::geometry::{ExportFormat, GeometryBackend, SolidHandle, ValidationOutcome};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Debug, Clone)]
enum Scripted {
    Success,
    Failure(String),
    Error(String),
}

#[derive(Clone, Default)]
pub struct MockBackend {
    outcomes: Arc<Mutex<VecDeque<Scripted>>>,
    scripts: Arc<Mutex<Vec<String>>>,
    exports: Arc<Mutex<Vec<(PathBuf, ExportFormat)>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a run that realizes a solid.
    pub fn push_success(&self) {
        self.outcomes.lock().unwrap().push_back(Scripted::Success);
    }

    /// Queue a run that fails validation with the given diagnostic.
    pub fn push_failure(&self, diagnostic: impl Into<String>) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Scripted::Failure(diagnostic.into()));
    }

    /// Queue an infrastructure fault.
    pub fn push_error(&self, message: impl Into<String>) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Scripted::Error(message.into()));
    }

    /// Every script executed so far, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn run_count(&self) -> usize {
        self.scripts.lock().unwrap().len()
    }

    pub fn exports(&self) -> Vec<(PathBuf, ExportFormat)> {
        self.exports.lock().unwrap().clone()
    }

    fn realized_handle() -> Result<SolidHandle, GeometryError> {
        let workdir = TempDir::with_prefix("cadgen-mock-")?;
        let artifact = workdir.path().join("model.brep");
        std::fs::write(&artifact, b"mock-brep")?;
        Ok(SolidHandle::new(artifact, Arc::new(workdir)))
    }
}

#[async_trait]
impl GeometryBackend for MockBackend {
    async fn run_script(&self, script: &str) -> Result<ValidationOutcome, GeometryError> {
        self.scripts.lock().unwrap().push(script.to_string());

        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Success) | None => Ok(ValidationOutcome::realized(
                Self::realized_handle()?,
            )),
            Some(Scripted::Failure(diagnostic)) => Ok(ValidationOutcome::failure(diagnostic)),
            Some(Scripted::Error(message)) => Err(GeometryError::Harness(message)),
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
        std::fs::write(dest, b"mock-export")?;
        self.exports
            .lock()
            .unwrap()
            .push((dest.to_path_buf(), format));
        Ok(())
    }
}
