//! Error types for the edgequake-pdftask library.
//!
//! Every hard failure is a [`PdfTaskError`]. Non-fatal anomalies (adding a
//! file twice, starting a task that is already running, deleting a task
//! that was never started) are *not* errors: they come back as
//! [`crate::task::Step::Skipped`] so callers can tell "already done" apart
//! from "failed" without string matching.
//!
//! HTTP failures keep the full picture (URL, status, reason phrase and raw
//! body). The remote API explains most rejections in the body, so dropping
//! it would leave the caller guessing.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdftask library.
#[derive(Debug, Error)]
pub enum PdfTaskError {
    // ── HTTP errors ───────────────────────────────────────────────────────
    /// The server rejected the public key.
    #[error("Authentication failed: {url} returned {status} {reason}\n{body}")]
    Auth {
        url: String,
        status: u16,
        reason: String,
        body: String,
    },

    /// Any other request answered with a non-success status.
    #[error("Request failed: {url} returned {status} {reason}\n{body}")]
    Request {
        url: String,
        status: u16,
        reason: String,
        body: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("Transport error calling '{url}': {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a success status but an unusable body.
    #[error("Malformed response from '{endpoint}': {detail}")]
    MalformedResponse { endpoint: String, detail: String },

    // ── Lifecycle errors ──────────────────────────────────────────────────
    /// The server produced a different number of output files than were sent.
    ///
    /// This means the remote side dropped files silently, so it is never
    /// treated as recoverable.
    #[error("Process mismatch: submitted {submitted} files but server reported {reported} outputs")]
    ProcessMismatch { submitted: usize, reported: usize },

    /// An operation was invoked out of lifecycle order.
    #[error("Cannot {operation} while task is {state}")]
    IllegalState {
        operation: &'static str,
        state: String,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is a regular file.")]
    FileNotFound { path: PathBuf },

    /// Input file exists but could not be opened for upload.
    #[error("Failed to read input file '{path}': {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tool parameter is outside its allowed set.
    #[error("Invalid value '{value}' for '{key}' (allowed: {allowed})")]
    InvalidParameter {
        key: &'static str,
        value: String,
        allowed: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the downloaded result.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfTaskError {
    /// HTTP status code for [`Auth`](Self::Auth) and [`Request`](Self::Request) errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            PdfTaskError::Auth { status, .. } | PdfTaskError::Request { status, .. } => {
                Some(*status)
            }
            PdfTaskError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Raw response body for [`Auth`](Self::Auth) and [`Request`](Self::Request) errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            PdfTaskError::Auth { body, .. } | PdfTaskError::Request { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_display_includes_everything() {
        let e = PdfTaskError::Request {
            url: "https://api8.example.com/v1/process".into(),
            status: 400,
            reason: "Bad Request".into(),
            body: r#"{"error":{"message":"Invalid task"}}"#.into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("api8.example.com/v1/process"), "got: {msg}");
        assert!(msg.contains("400"));
        assert!(msg.contains("Bad Request"));
        assert!(msg.contains("Invalid task"));
        assert_eq!(e.status(), Some(400));
        assert_eq!(e.body(), Some(r#"{"error":{"message":"Invalid task"}}"#));
    }

    #[test]
    fn auth_display() {
        let e = PdfTaskError::Auth {
            url: "https://api.example.com/v1/auth".into(),
            status: 401,
            reason: "Unauthorized".into(),
            body: "invalid public key".into(),
        };
        assert!(e.to_string().starts_with("Authentication failed"));
        assert!(e.to_string().contains("invalid public key"));
        assert_eq!(e.status(), Some(401));
    }

    #[test]
    fn process_mismatch_display() {
        let e = PdfTaskError::ProcessMismatch {
            submitted: 2,
            reported: 1,
        };
        let msg = e.to_string();
        assert!(msg.contains("submitted 2"));
        assert!(msg.contains("reported 1"));
        assert_eq!(e.status(), None);
    }

    #[test]
    fn illegal_state_display() {
        let e = PdfTaskError::IllegalState {
            operation: "download",
            state: "started".into(),
        };
        assert_eq!(e.to_string(), "Cannot download while task is started");
    }
}
