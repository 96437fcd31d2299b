//! Tool variants: a [`Task`] with the tool fixed and its options validated.
//!
//! A variant validates its options when it is built, before any request is
//! sent, then writes them into the task's [`ToolParams`]. Anything the
//! variant does not model can still be set through
//! [`Task::params_mut`].

mod compress;

pub use compress::{Compress, CompressOptions, CompressionLevel, COMPRESSION_LEVEL_KEY};

use crate::error::PdfTaskError;
use crate::session::Session;
use crate::task::{Task, ToolParams};

/// Typed options for one remote tool.
pub trait ToolVariant {
    /// Tool name as used in `start/{tool}`.
    const TOOL: &'static str;

    /// Merge the options into `params`.
    fn apply(&self, params: &mut ToolParams) -> Result<(), PdfTaskError>;

    /// Build an unstarted task for this tool with the options applied.
    fn into_task(&self, session: Session) -> Result<Task, PdfTaskError> {
        let mut task = Task::new(session, Self::TOOL);
        self.apply(task.params_mut())?;
        Ok(task)
    }
}
