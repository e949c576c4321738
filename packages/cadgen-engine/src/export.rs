use crate::error::GeometryError;
use crate::geometry::{ExportFormat, GeometryBackend, SolidHandle};
use std::path::{Path, PathBuf};
use tracing::info;

/// Exports a realized solid into `output_dir`. Without a base name the
/// file gets a timestamped name (`model_YYYYMMDD_HHMMSS.<ext>`); a given
/// base name is used as-is with the format's extension enforced.
pub async fn export_solid<B: GeometryBackend>(
    backend: &B,
    solid: &SolidHandle,
    output_dir: &Path,
    format: ExportFormat,
    base_name: Option<&str>,
) -> Result<PathBuf, GeometryError> {
    tokio::fs::create_dir_all(output_dir).await?;

    let filename = match base_name {
        Some(name) => with_extension(name, format),
        None => timestamped_name(format),
    };
    let dest = output_dir.join(filename);

    backend.export(solid, &dest, format).await?;
    info!(path = %dest.display(), format = %format, "model exported");
    Ok(dest)
}

fn timestamped_name(format: ExportFormat) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("model_{stamp}.{}", format.extension())
}

fn with_extension(name: &str, format: ExportFormat) -> String {
    let ext = format.extension();
    if name.ends_with(&format!(".{ext}")) {
        name.to_string()
    } else {
        format!("{name}.{ext}")
    }
}
