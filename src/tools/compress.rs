//! The `compress` tool.

use super::ToolVariant;
use crate::error::PdfTaskError;
use crate::session::Session;
use crate::task::{Task, ToolParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// Parameter key the server reads the level from.
pub const COMPRESSION_LEVEL_KEY: &str = "compression_level";

/// How hard the server should squeeze the document.
///
/// | Level | Effect |
/// |-------|--------|
/// | `low` | Light recompression, highest image quality |
/// | `recommended` | Good size/quality balance (default) |
/// | `extreme` | Smallest output, visibly lower image quality |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Recommended,
    Extreme,
}

impl CompressionLevel {
    pub const ALL: [CompressionLevel; 3] = [
        CompressionLevel::Low,
        CompressionLevel::Recommended,
        CompressionLevel::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionLevel::Low => "low",
            CompressionLevel::Recommended => "recommended",
            CompressionLevel::Extreme => "extreme",
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionLevel {
    type Err = PdfTaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| PdfTaskError::InvalidParameter {
                key: COMPRESSION_LEVEL_KEY,
                value: s.to_string(),
                allowed: Self::ALL.map(|l| l.as_str()).join(", "),
            })
    }
}

/// Options for the `compress` tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressOptions {
    pub level: CompressionLevel,
}

impl ToolVariant for CompressOptions {
    const TOOL: &'static str = "compress";

    fn apply(&self, params: &mut ToolParams) -> Result<(), PdfTaskError> {
        params.set(COMPRESSION_LEVEL_KEY, self.level.as_str())?;
        Ok(())
    }
}

/// A compress task. Dereferences to [`Task`] for the lifecycle calls.
///
/// ```rust
/// use edgequake_pdftask::{ClientConfig, Compress, Session};
///
/// let session = Session::new(ClientConfig::default()).unwrap();
/// assert!(Compress::new(session, "maximum").is_err());
/// ```
#[derive(Debug)]
pub struct Compress {
    task: Task,
    level: CompressionLevel,
}

impl Compress {
    /// Validate `level` and build an unstarted compress task.
    ///
    /// An unknown level fails with [`PdfTaskError::InvalidParameter`]
    /// without touching the network.
    pub fn new(session: Session, level: &str) -> Result<Self, PdfTaskError> {
        let level: CompressionLevel = level.parse()?;
        Self::with_level(session, level)
    }

    pub fn with_level(session: Session, level: CompressionLevel) -> Result<Self, PdfTaskError> {
        let task = CompressOptions { level }.into_task(session)?;
        Ok(Self { task, level })
    }

    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    pub fn into_task(self) -> Task {
        self.task
    }
}

impl Deref for Compress {
    type Target = Task;

    fn deref(&self) -> &Task {
        &self.task
    }
}

impl DerefMut for Compress {
    fn deref_mut(&mut self) -> &mut Task {
        &mut self.task
    }
}
