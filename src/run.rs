//! One-shot entry points: start → add → process → download → delete.
//!
//! These drive a whole task lifecycle for callers who just want an output
//! file. Use [`crate::task::Task`] directly when you need to inspect or
//! retry individual steps.

use crate::config::ClientConfig;
use crate::error::PdfTaskError;
use crate::session::Session;
use crate::task::{ProcessResult, Step, Task};
use crate::tools::{CompressOptions, CompressionLevel, ToolVariant};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// Task id the run used. Already deleted remotely unless `keep_remote`.
    pub task_id: String,
    /// Server's process report.
    pub result: ProcessResult,
    /// Where the result was written.
    pub output_path: PathBuf,
    /// Whether the remote task was deleted after download.
    pub deleted: bool,
    pub duration_ms: u64,
}

/// Drive `task` through a full lifecycle.
///
/// Every file is added before the first request, so a missing input fails
/// without touching the network. If anything fails after the task was
/// started, the remote task is deleted (best effort, unless `keep_remote`)
/// and the original error is returned.
pub async fn run_task<P: AsRef<Path>>(
    task: &mut Task,
    files: &[P],
    target_dir: Option<&Path>,
    keep_remote: bool,
) -> Result<RunOutput, PdfTaskError> {
    let start = Instant::now();
    for file in files {
        let _ = task.add_file(file)?;
    }

    if let Step::Skipped(advisory) = task.start().await? {
        if task.task_id().is_none() {
            return Err(PdfTaskError::MalformedResponse {
                endpoint: format!("start/{}", task.tool()),
                detail: advisory.to_string(),
            });
        }
    }

    let outcome = process_and_download(task, target_dir).await;

    let deleted = if keep_remote {
        false
    } else {
        match task.delete_current_task().await {
            Ok(step) => step.is_applied(),
            Err(e) if outcome.is_err() => {
                warn!("Cleanup after failure also failed: {}", e);
                false
            }
            Err(e) => return Err(e),
        }
    };

    let (task_id, result, output_path) = outcome?;
    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Task {} done in {}ms → {}",
        task_id,
        duration_ms,
        output_path.display()
    );

    Ok(RunOutput {
        task_id,
        result,
        output_path,
        deleted,
        duration_ms,
    })
}

async fn process_and_download(
    task: &mut Task,
    target_dir: Option<&Path>,
) -> Result<(String, ProcessResult, PathBuf), PdfTaskError> {
    let task_id = task.task_id().unwrap_or_default().to_string();
    let result = task.process().await?.clone();
    let output_path = task.download(target_dir).await?;
    Ok((task_id, result, output_path))
}

/// Compress `files` with one task and write the result into `target_dir`.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdftask::{compress_files, ClientConfig, CompressionLevel};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let out = compress_files(
///     &ClientConfig::default(),
///     "project_public_key",
///     &["scan.pdf"],
///     CompressionLevel::Extreme,
///     None,
/// )
/// .await?;
/// println!("{} ({:?})", out.output_path.display(), out.result.size_ratio());
/// # Ok(())
/// # }
/// ```
pub async fn compress_files<P: AsRef<Path>>(
    config: &ClientConfig,
    public_key: &str,
    files: &[P],
    level: CompressionLevel,
    target_dir: Option<&Path>,
) -> Result<RunOutput, PdfTaskError> {
    let options = CompressOptions { level };
    let session = Session::connect(config.clone(), public_key).await?;
    let mut task = options.into_task(session)?;
    run_task(&mut task, files, target_dir, false).await
}

/// Synchronous wrapper around [`compress_files`].
///
/// Creates a temporary tokio runtime internally.
pub fn compress_files_sync<P: AsRef<Path>>(
    config: &ClientConfig,
    public_key: &str,
    files: &[P],
    level: CompressionLevel,
    target_dir: Option<&Path>,
) -> Result<RunOutput, PdfTaskError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfTaskError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(compress_files(config, public_key, files, level, target_dir))
}
