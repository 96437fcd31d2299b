//! # edgequake-pdftask
//!
//! Drive remote PDF processing tasks (iLovePDF-style API) from Rust:
//! authenticate, upload, process, download, clean up.
//!
//! ## Why this crate?
//!
//! The remote API is simple per call but has an implicit protocol around
//! it: the server that starts a task must serve every later call for it,
//! files are referenced by server-assigned names, and a process call can
//! quietly drop files. This crate makes that protocol explicit as a typed
//! state machine so misuse is an error instead of a confusing 400.
//!
//! ## Lifecycle
//!
//! ```text
//! Session ── auth ──▶ token
//!  │
//!  └─ Task
//!      ├─ 1. start     GET    start/{tool}      → task id + working server
//!      ├─ 2. add_file  local existence check, duplicates ignored
//!      ├─ 3. upload    POST   upload            → server filename per file
//!      ├─ 4. process   POST   process           → ProcessResult (count checked)
//!      ├─ 5. download  GET    download/{task}   → streamed to disk
//!      └─ 6. delete    DELETE task/{task}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdftask::{ClientConfig, Compress, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::connect(ClientConfig::default(), "project_public_key").await?;
//!     let mut task = Compress::new(session, "extreme")?;
//!     let _ = task.add_file("scan.pdf")?;
//!     let _ = task.start().await?;
//!     let result = task.process().await?;
//!     eprintln!("{:?} of original size", result.size_ratio());
//!     let path = task.download(None).await?;
//!     let _ = task.delete_current_task().await?;
//!     println!("{}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdftask` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdftask = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod progress;
pub mod run;
pub mod session;
pub mod task;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::PdfTaskError;
pub use progress::{NoopProgressCallback, ProgressCallback, TaskProgressCallback};
pub use run::{compress_files, compress_files_sync, run_task, RunOutput};
pub use session::{Payload, Session};
pub use task::{Advisory, FileSet, ProcessResult, Step, Task, TaskState, ToolParams, TrackedFile};
pub use tools::{Compress, CompressOptions, CompressionLevel, ToolVariant};
