//! Task lifecycle: one tool invocation over a set of files.
//!
//! ## State machine
//!
//! ```text
//! Unstarted ──start──▶ Started ──upload──▶ Uploaded ──process──▶ Processed ──download──▶ Downloaded
//!     ▲                   │                   │                      │                       │
//!     │                   └───────────────────┴───────delete─────────┴───────────────────────┘
//!     │                                              │
//!     └────────────── Deleted ◀──────────────────────┘   (start again from Deleted)
//! ```
//!
//! `add_file` is valid in every state. `process` uploads whatever is not
//! uploaded yet, so callers rarely need `upload` directly.
//!
//! ## Advisories
//!
//! Restarting a running task, adding a file twice and deleting a task that
//! holds no id are not failures. Those operations return
//! [`Step::Skipped`] with an [`Advisory`] and log a warning; everything that
//! did fail comes back as `Err(PdfTaskError)`.

mod files;
mod params;
mod result;

pub use files::{FileSet, TrackedFile};
pub use params::ToolParams;
pub use result::ProcessResult;

use crate::error::PdfTaskError;
use crate::session::{Payload, Session};
use futures::stream::{self, StreamExt};
use reqwest::Method;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Where a [`Task`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Unstarted,
    Started,
    Uploaded,
    Processed,
    Downloaded,
    Deleted,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskState::Unstarted => "unstarted",
            TaskState::Started => "started",
            TaskState::Uploaded => "uploaded",
            TaskState::Processed => "processed",
            TaskState::Downloaded => "downloaded",
            TaskState::Deleted => "deleted",
        })
    }
}

/// A non-fatal anomaly: the operation had nothing to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// `start` on a task that is already running.
    ///
    /// `task_id` is `None` when the server answered the start request with
    /// an empty body, which it does for a slot that is already open.
    AlreadyStarted { task_id: Option<String> },
    /// `add_file` with a path that is already tracked.
    DuplicateFile { path: PathBuf },
    /// `delete_current_task` with no task id held.
    NotStarted,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::AlreadyStarted { task_id: Some(id) } => {
                write!(f, "task {id} is already started")
            }
            Advisory::AlreadyStarted { task_id: None } => {
                f.write_str("server returned no task; presuming it is already started")
            }
            Advisory::DuplicateFile { path } => {
                write!(f, "'{}' is already part of this task", path.display())
            }
            Advisory::NotStarted => f.write_str("no task to delete"),
        }
    }
}

/// Result of a lifecycle operation that can legitimately be a no-op.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Applied,
    Skipped(Advisory),
}

impl Step {
    pub fn is_applied(&self) -> bool {
        matches!(self, Step::Applied)
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        match self {
            Step::Applied => None,
            Step::Skipped(a) => Some(a),
        }
    }
}

#[derive(Deserialize)]
struct StartResponse {
    server: String,
    task: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    server_filename: String,
}

/// One server-side unit of work: a tool applied to a set of uploaded files.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdftask::{ClientConfig, Session, Task};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let session = Session::connect(ClientConfig::default(), "project_public_key").await?;
/// let mut task = Task::new(session, "compress");
/// task.params_mut().set("compression_level", "extreme")?;
/// task.add_file("report.pdf")?;
/// let _ = task.start().await?;
/// task.process().await?;
/// let path = task.download(Some("out".as_ref())).await?;
/// let _ = task.delete_current_task().await?;
/// println!("{}", path.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Task {
    session: Session,
    tool: String,
    task_id: Option<String>,
    files: FileSet,
    params: ToolParams,
    result: Option<ProcessResult>,
    state: TaskState,
}

impl Task {
    /// Create an unstarted task for `tool`. Performs no network I/O.
    pub fn new(session: Session, tool: impl Into<String>) -> Self {
        Self {
            session,
            tool: tool.into(),
            task_id: None,
            files: FileSet::default(),
            params: ToolParams::default(),
            result: None,
            state: TaskState::Unstarted,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Open a task slot for this tool on the remote side.
    ///
    /// Records the task id and switches the session to the working server
    /// the remote side assigned.
    pub async fn start(&mut self) -> Result<Step, PdfTaskError> {
        if let Some(ref id) = self.task_id {
            let advisory = Advisory::AlreadyStarted {
                task_id: Some(id.clone()),
            };
            warn!("{advisory}");
            return Ok(Step::Skipped(advisory));
        }

        let endpoint = format!("start/{}", self.tool);
        let response: Option<StartResponse> = self
            .session
            .request_json(Method::GET, &endpoint, None, None)
            .await?;

        match response {
            None => {
                let advisory = Advisory::AlreadyStarted { task_id: None };
                warn!("{advisory}");
                Ok(Step::Skipped(advisory))
            }
            Some(StartResponse { server, task }) => {
                info!("Started {} task {} on {}", self.tool, task, server);
                self.session.set_working_server(server);
                self.task_id = Some(task);
                self.state = TaskState::Started;
                Ok(Step::Applied)
            }
        }
    }

    /// Track a local file. The file must exist; adding it twice is a no-op.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<Step, PdfTaskError> {
        let path = path.as_ref();
        if self.files.add(path)? {
            debug!("Added {}", path.display());
            Ok(Step::Applied)
        } else {
            let advisory = Advisory::DuplicateFile {
                path: path.to_path_buf(),
            };
            warn!("{advisory}");
            Ok(Step::Skipped(advisory))
        }
    }

    /// Upload every tracked file that has no server filename yet.
    ///
    /// Up to `upload_concurrency` uploads run at once. Results are applied
    /// by file index, so each local path keeps its own server filename
    /// whatever order the responses arrive in. No new upload starts after
    /// the first failure, but uploads already in flight are awaited and
    /// keep their server filename, so a retry only sends what is missing.
    pub async fn upload(&mut self) -> Result<(), PdfTaskError> {
        let task_id = self.require_task_id("upload")?.to_string();
        let pending = self.files.pending();
        if pending.is_empty() {
            debug!("Nothing to upload");
            self.mark_uploaded();
            return Ok(());
        }

        let total = pending.len();
        let config = self.session.config();
        let concurrency = config.upload_concurrency;
        let callback = config.progress_callback.clone();
        if let Some(ref cb) = callback {
            cb.on_upload_start(total);
        }
        info!("Uploading {} file(s) to task {}", total, task_id);

        let session = &self.session;
        let task_id = task_id.as_str();
        let cb = callback.as_ref();
        let halted = AtomicBool::new(false);
        let halted = &halted;
        let mut uploads = stream::iter(pending.into_iter().map(move |(index, path)| async move {
            if halted.load(Ordering::Relaxed) {
                return Ok::<_, PdfTaskError>(None);
            }
            let payload: Payload = vec![("task".to_string(), task_id.to_string())];
            let response: UploadResponse = session
                .request_json(Method::POST, "upload", Some(payload), Some(&path))
                .await?
                .ok_or_else(|| PdfTaskError::MalformedResponse {
                    endpoint: "upload".into(),
                    detail: "empty body, expected server_filename".into(),
                })?;
            debug!(
                "Uploaded {} as {}",
                path.display(),
                response.server_filename
            );
            if let Some(cb) = cb {
                cb.on_file_uploaded(index, total, &path);
            }
            Ok::<_, PdfTaskError>(Some((index, response.server_filename)))
        }))
        .buffered(concurrency);

        let mut uploaded = Vec::with_capacity(total);
        let mut failure = None;
        while let Some(outcome) = uploads.next().await {
            match outcome {
                Ok(Some(done)) => uploaded.push(done),
                Ok(None) => {}
                Err(e) => {
                    halted.store(true, Ordering::Relaxed);
                    if failure.is_none() {
                        failure = Some(e);
                    } else {
                        warn!("Further upload failure: {}", e);
                    }
                }
            }
        }
        drop(uploads);

        for (index, server_filename) in uploaded {
            self.files.set_server_filename(index, server_filename);
        }
        if let Some(e) = failure {
            return Err(e);
        }

        self.mark_uploaded();
        Ok(())
    }

    /// Upload pending files, then ask the server to run the tool.
    ///
    /// Fails with [`PdfTaskError::ProcessMismatch`] if the server reports a
    /// different number of outputs than files submitted. Any earlier result
    /// is dropped first, so after a failure `download` is illegal until the
    /// next successful `process`.
    pub async fn process(&mut self) -> Result<&ProcessResult, PdfTaskError> {
        let task_id = self.require_task_id("process")?.to_string();
        if self.files.is_empty() {
            return Err(PdfTaskError::IllegalState {
                operation: "process",
                state: format!("{} with no files", self.state),
            });
        }

        // A failed run must not leave an earlier result downloadable.
        self.result = None;
        self.upload().await?;

        let payload = self.process_payload(&task_id)?;
        let submitted = self.files.len();
        info!("Processing task {} ({} file(s))", task_id, submitted);

        let result: ProcessResult = self
            .session
            .request_json(Method::POST, "process", Some(payload), None)
            .await?
            .ok_or_else(|| PdfTaskError::MalformedResponse {
                endpoint: "process".into(),
                detail: "empty body, expected a process result".into(),
            })?;

        if result.output_filenumber != submitted {
            return Err(PdfTaskError::ProcessMismatch {
                submitted,
                reported: result.output_filenumber,
            });
        }

        if let Some(ref cb) = self.session.config().progress_callback {
            cb.on_process_complete(&result);
        }
        self.state = TaskState::Processed;
        let stored: &ProcessResult = self.result.insert(result);
        Ok(stored)
    }

    /// Stream the processed result into `target_dir` (default: the current
    /// working directory, created if absent) and return the written path.
    ///
    /// The file is named after the server's `download_filename`; only its
    /// final path component is used.
    pub async fn download(&mut self, target_dir: Option<&Path>) -> Result<PathBuf, PdfTaskError> {
        let download_filename = match self.result {
            Some(ref r) => r.download_filename.clone(),
            None => {
                return Err(PdfTaskError::IllegalState {
                    operation: "download",
                    state: self.state.to_string(),
                })
            }
        };
        let task_id = self.require_task_id("download")?.to_string();
        let filename = output_filename(&download_filename)?;

        let dir = match target_dir {
            Some(d) => d.to_path_buf(),
            None => std::env::current_dir().map_err(|e| PdfTaskError::OutputWriteFailed {
                path: PathBuf::from("."),
                source: e,
            })?,
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PdfTaskError::OutputWriteFailed {
                path: dir.clone(),
                source: e,
            })?;

        let final_path = dir.join(&filename);
        let part_path = dir.join(format!("{filename}.part"));

        info!("Downloading task {} → {}", task_id, final_path.display());
        if let Err(e) = self.stream_to(&task_id, &part_path).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }

        tokio::fs::rename(&part_path, &final_path)
            .await
            .map_err(|e| PdfTaskError::OutputWriteFailed {
                path: final_path.clone(),
                source: e,
            })?;

        if let Some(ref cb) = self.session.config().progress_callback {
            cb.on_download_complete(&final_path);
        }
        self.state = TaskState::Downloaded;
        Ok(final_path)
    }

    /// Delete the remote task and forget its id, result and server filenames.
    ///
    /// Tracked local files are kept, so `start` + `process` can run again.
    pub async fn delete_current_task(&mut self) -> Result<Step, PdfTaskError> {
        let Some(task_id) = self.task_id.clone() else {
            let advisory = Advisory::NotStarted;
            warn!("{advisory}");
            return Ok(Step::Skipped(advisory));
        };

        self.session
            .request(Method::DELETE, &format!("task/{task_id}"), None, None)
            .await?;

        info!("Deleted task {}", task_id);
        self.task_id = None;
        self.result = None;
        self.files.clear_server_filenames();
        self.state = TaskState::Deleted;
        Ok(Step::Applied)
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn result(&self) -> Option<&ProcessResult> {
        self.result.as_ref()
    }

    pub fn params(&self) -> &ToolParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ToolParams {
        &mut self.params
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable access for authenticating after the task is built.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Give the session back, e.g. to run another task on the same account.
    pub fn into_session(self) -> Session {
        self.session
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn require_task_id(&self, operation: &'static str) -> Result<&str, PdfTaskError> {
        self.task_id
            .as_deref()
            .ok_or_else(|| PdfTaskError::IllegalState {
                operation,
                state: self.state.to_string(),
            })
    }

    fn mark_uploaded(&mut self) {
        if matches!(
            self.state,
            TaskState::Started | TaskState::Processed | TaskState::Downloaded
        ) {
            self.state = TaskState::Uploaded;
        }
    }

    /// `task`, `tool`, then `files[i][filename]` / `files[i][server_filename]`
    /// in insertion order, then the tool parameters.
    fn process_payload(&self, task_id: &str) -> Result<Payload, PdfTaskError> {
        let mut payload: Payload = vec![
            ("task".to_string(), task_id.to_string()),
            ("tool".to_string(), self.tool.clone()),
        ];
        for (i, file) in self.files.iter().enumerate() {
            let server_filename = file.server_filename().ok_or_else(|| {
                PdfTaskError::Internal(format!(
                    "'{}' has no server filename after upload",
                    file.path().display()
                ))
            })?;
            payload.push((format!("files[{i}][filename]"), file.filename()));
            payload.push((
                format!("files[{i}][server_filename]"),
                server_filename.to_string(),
            ));
        }
        payload.extend(
            self.params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        Ok(payload)
    }

    async fn stream_to(&self, task_id: &str, part_path: &Path) -> Result<(), PdfTaskError> {
        let response = self
            .session
            .request(Method::GET, &format!("download/{task_id}"), None, None)
            .await?;
        let url = response.url().to_string();
        let total = response.content_length();

        let write_err = |e: std::io::Error| PdfTaskError::OutputWriteFailed {
            path: part_path.to_path_buf(),
            source: e,
        };
        let mut file = tokio::fs::File::create(part_path).await.map_err(write_err)?;

        let callback = self.session.config().progress_callback.as_ref();
        let mut downloaded = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| PdfTaskError::Transport {
                url: url.clone(),
                source: e,
            })?;
            file.write_all(&chunk).await.map_err(write_err)?;
            downloaded += chunk.len() as u64;
            if let Some(cb) = callback {
                cb.on_download_progress(downloaded, total);
            }
        }
        file.flush().await.map_err(write_err)?;
        debug!("Wrote {} bytes to {}", downloaded, part_path.display());
        Ok(())
    }
}

/// Final path component of a server-declared name.
fn output_filename(declared: &str) -> Result<String, PdfTaskError> {
    Path::new(declared)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| PdfTaskError::MalformedResponse {
            endpoint: "process".into(),
            detail: format!("unusable download filename '{declared}'"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn task() -> Task {
        let config = ClientConfig::builder()
            .scheme("http")
            .entry_server("127.0.0.1:9")
            .build()
            .unwrap();
        Task::new(Session::new(config).unwrap(), "compress")
    }

    #[test]
    fn new_task_is_unstarted() {
        let t = task();
        assert_eq!(t.state(), TaskState::Unstarted);
        assert_eq!(t.tool(), "compress");
        assert!(t.task_id().is_none());
        assert!(t.result().is_none());
        assert!(t.files().is_empty());
    }

    #[test]
    fn output_filename_strips_directories() {
        assert_eq!(output_filename("out.pdf").unwrap(), "out.pdf");
        assert_eq!(output_filename("../../etc/out.pdf").unwrap(), "out.pdf");
        assert!(output_filename("..").is_err());
        assert!(output_filename("").is_err());
    }

    #[test]
    fn advisory_display() {
        assert_eq!(
            Advisory::AlreadyStarted {
                task_id: Some("t1".into())
            }
            .to_string(),
            "task t1 is already started"
        );
        assert_eq!(Advisory::NotStarted.to_string(), "no task to delete");
        let step = Step::Skipped(Advisory::NotStarted);
        assert!(!step.is_applied());
        assert_eq!(step.advisory(), Some(&Advisory::NotStarted));
        assert!(Step::Applied.advisory().is_none());
    }

    #[tokio::test]
    async fn upload_before_start_is_illegal() {
        let mut t = task();
        let err = t.upload().await.unwrap_err();
        assert!(matches!(
            err,
            PdfTaskError::IllegalState {
                operation: "upload",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn process_before_start_is_illegal() {
        let mut t = task();
        let err = t.process().await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot process while task is unstarted");
    }

    #[tokio::test]
    async fn download_before_process_is_illegal() {
        let mut t = task();
        let err = t.download(None).await.unwrap_err();
        assert!(matches!(
            err,
            PdfTaskError::IllegalState {
                operation: "download",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn delete_without_task_is_advisory() {
        let mut t = task();
        let step = t.delete_current_task().await.unwrap();
        assert_eq!(step, Step::Skipped(Advisory::NotStarted));
        assert_eq!(t.state(), TaskState::Unstarted);
    }
}
