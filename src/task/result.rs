//! Outcome of a `process` call.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// What the server reports after processing a task.
///
/// Unknown fields are preserved in [`extra`](Self::extra) so `--json`
/// output never loses information the server sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Name the result will have when downloaded (a `.zip` for multi-file output).
    pub download_filename: String,

    /// Number of output files the server produced.
    #[serde(deserialize_with = "count")]
    pub output_filenumber: usize,

    /// Total input size in bytes.
    pub filesize: Option<u64>,

    /// Total output size in bytes.
    pub output_filesize: Option<u64>,

    /// Extensions of the output files, in whatever shape the server sends.
    pub output_extensions: Option<Value>,

    /// Server-side processing time.
    pub timer: Option<Value>,

    pub status: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProcessResult {
    /// Output size as a fraction of input size, when both are known.
    pub fn size_ratio(&self) -> Option<f64> {
        match (self.filesize, self.output_filesize) {
            (Some(input), Some(output)) if input > 0 => Some(output as f64 / input as f64),
            _ => None,
        }
    }
}

/// Accept `2` as well as `"2"`.
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(usize),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_response() {
        let json = r#"{
            "download_filename": "report_compress.pdf",
            "filesize": 1000,
            "output_filesize": 250,
            "output_filenumber": 1,
            "output_extensions": "[\"pdf\"]",
            "timer": "0.412",
            "status": "TaskSuccess",
            "remote_only": 7
        }"#;
        let r: ProcessResult = serde_json::from_str(json).unwrap();
        assert_eq!(r.download_filename, "report_compress.pdf");
        assert_eq!(r.output_filenumber, 1);
        assert_eq!(r.status.as_deref(), Some("TaskSuccess"));
        assert_eq!(r.extra.get("remote_only"), Some(&Value::from(7)));
        assert_eq!(r.size_ratio(), Some(0.25));
    }

    #[test]
    fn accepts_string_count_and_missing_optionals() {
        let r: ProcessResult =
            serde_json::from_str(r#"{"download_filename":"out.zip","output_filenumber":"2"}"#)
                .unwrap();
        assert_eq!(r.output_filenumber, 2);
        assert!(r.filesize.is_none());
        assert!(r.size_ratio().is_none());
    }

    #[test]
    fn rejects_missing_download_filename() {
        assert!(serde_json::from_str::<ProcessResult>(r#"{"output_filenumber":1}"#).is_err());
    }
}
