use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Structured log event types for full run traceability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogEventType {
    RunStart,
    SpecGenerated,
    AttemptStart,
    ScriptGenerated,
    ValidationResult,
    FeedbackGenerated,
    RunComplete,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single structured log entry, serialized as one JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: String,
    pub event_type: LogEventType,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEvent {
    pub fn new(
        event_type: LogEventType,
        level: LogLevel,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event_type,
            level,
            message: message.into(),
            details,
        }
    }

    pub fn info(event_type: LogEventType, message: impl Into<String>) -> Self {
        Self::new(event_type, LogLevel::Info, message, None)
    }

    pub fn info_with_details(
        event_type: LogEventType,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::new(event_type, LogLevel::Info, message, Some(details))
    }

    pub fn warn_with_details(
        event_type: LogEventType,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::new(event_type, LogLevel::Warn, message, Some(details))
    }
}

/// Writes one `run.jsonl` per output directory: one JSON event per line,
/// opened and flushed per call for crash safety.
pub struct RunLogger {
    log_file_path: PathBuf,
}

impl RunLogger {
    pub async fn new(output_dir: &Path) -> Result<Self> {
        let logs_dir = output_dir.join("logs");
        tokio::fs::create_dir_all(&logs_dir)
            .await
            .context("failed to create logs directory")?;

        Ok(Self {
            log_file_path: logs_dir.join("run.jsonl"),
        })
    }

    pub async fn log(&self, event: LogEvent) -> Result<()> {
        let mut line = serde_json::to_string(&event).context("failed to serialize log event")?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .await
            .context("failed to open run log")?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn log_run_start(&self, run_id: &str, prompt: &str) -> Result<()> {
        self.log(LogEvent::info_with_details(
            LogEventType::RunStart,
            format!("Run {run_id} started"),
            serde_json::json!({ "run_id": run_id, "prompt": prompt }),
        ))
        .await
    }

    pub async fn log_spec_generated(&self, part_name: &str, operations: usize) -> Result<()> {
        self.log(LogEvent::info_with_details(
            LogEventType::SpecGenerated,
            format!("Specification generated for '{part_name}'"),
            serde_json::json!({ "part_name": part_name, "operations": operations }),
        ))
        .await
    }

    pub async fn log_attempt_start(&self, attempt: usize, max_iterations: usize) -> Result<()> {
        self.log(LogEvent::info_with_details(
            LogEventType::AttemptStart,
            format!("Attempt {attempt}/{max_iterations}"),
            serde_json::json!({ "attempt": attempt, "max_iterations": max_iterations }),
        ))
        .await
    }

    pub async fn log_script_generated(&self, attempt: usize, script: &str) -> Result<()> {
        self.log(LogEvent::new(
            LogEventType::ScriptGenerated,
            LogLevel::Debug,
            format!("Script generated on attempt {attempt}"),
            Some(serde_json::json!({
                "attempt": attempt,
                "script": script,
                "script_length": script.len(),
            })),
        ))
        .await
    }

    pub async fn log_validation(&self, attempt: usize, success: bool, diagnostic: Option<&str>) -> Result<()> {
        let event = if success {
            LogEvent::info_with_details(
                LogEventType::ValidationResult,
                format!("Validation passed on attempt {attempt}"),
                serde_json::json!({ "attempt": attempt, "success": true }),
            )
        } else {
            LogEvent::warn_with_details(
                LogEventType::ValidationResult,
                format!("Validation failed on attempt {attempt}"),
                serde_json::json!({
                    "attempt": attempt,
                    "success": false,
                    "diagnostic": diagnostic,
                }),
            )
        };
        self.log(event).await
    }

    pub async fn log_feedback(&self, attempt: usize, feedback: &str) -> Result<()> {
        self.log(LogEvent::info_with_details(
            LogEventType::FeedbackGenerated,
            format!("Feedback generated after attempt {attempt}"),
            serde_json::json!({ "attempt": attempt, "feedback": feedback }),
        ))
        .await
    }

    pub async fn log_run_complete(&self, status: &str, attempts: usize) -> Result<()> {
        self.log(LogEvent::info_with_details(
            LogEventType::RunComplete,
            format!("Run finished: {status} after {attempts} attempt(s)"),
            serde_json::json!({ "status": status, "attempts": attempts }),
        ))
        .await
    }

    pub async fn log_error(&self, message: &str, details: Option<&str>) -> Result<()> {
        self.log(LogEvent::new(
            LogEventType::Error,
            LogLevel::Error,
            message,
            details.map(|d| serde_json::json!({ "error": d })),
        ))
        .await
    }

    pub fn log_file_path(&self) -> &Path {
        &self.log_file_path
    }
}
