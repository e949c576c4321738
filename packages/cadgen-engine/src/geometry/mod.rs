use crate::error::GeometryError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

pub mod cadquery;
pub mod mocks;

/// Interchange formats the backend can export a realized solid to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Step,
    Stl,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Step => "step",
            ExportFormat::Stl => "stl",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "step" => Ok(ExportFormat::Step),
            "stl" => Ok(ExportFormat::Stl),
            other => Err(GeometryError::Export(format!(
                "unsupported format '{other}', use 'step' or 'stl'"
            ))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Opaque handle to a solid the backend has realized. Holding the handle
/// keeps the backing artifact alive; whether it represents an exportable
/// solid is answered by the explicit `is_realized` capability query, not
/// by probing its shape.
#[derive(Debug, Clone)]
pub struct SolidHandle {
    id: Uuid,
    artifact: PathBuf,
    _workdir: Arc<TempDir>,
}

impl SolidHandle {
    pub(crate) fn new(artifact: PathBuf, workdir: Arc<TempDir>) -> Self {
        Self {
            id: Uuid::new_v4(),
            artifact,
            _workdir: workdir,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_realized(&self) -> bool {
        self.artifact.is_file()
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }
}

/// Outcome of executing one construction script. A script that ran but
/// produced no solid is a failure outcome with a diagnostic, never an
/// error.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub success: bool,
    pub solid: Option<SolidHandle>,
    pub diagnostic: Option<String>,
}

impl ValidationOutcome {
    pub fn realized(solid: SolidHandle) -> Self {
        Self {
            success: true,
            solid: Some(solid),
            diagnostic: None,
        }
    }

    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self {
            success: false,
            solid: None,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Boundary to the geometry kernel: execute a script in an isolated,
/// minimal namespace and export realized solids. Infrastructure faults
/// (interpreter missing, harness unreadable) are `GeometryError`s;
/// anything the script itself does wrong comes back as a failure
/// `ValidationOutcome`.
#[async_trait]
pub trait GeometryBackend: Send + Sync {
    async fn run_script(&self, script: &str) -> Result<ValidationOutcome, GeometryError>;

    async fn export(
        &self,
        solid: &SolidHandle,
        dest: &Path,
        format: ExportFormat,
    ) -> Result<(), GeometryError>;
}
