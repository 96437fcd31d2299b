//! Tool parameters sent alongside the process request.

use crate::error::PdfTaskError;

/// Keys the task itself writes into the process payload.
const RESERVED_KEYS: &[&str] = &["task", "tool", "debug"];

/// Ordered key/value settings merged into the process payload.
///
/// Setting an existing key replaces its value in place, so the payload
/// layout stays stable across edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolParams {
    entries: Vec<(String, String)>,
}

impl ToolParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`.
    ///
    /// Fails for keys the task owns (`task`, `tool`, `debug`, `files[..]`).
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self, PdfTaskError> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() || RESERVED_KEYS.contains(&key.as_str()) || key.starts_with("files[") {
            return Err(PdfTaskError::InvalidParameter {
                key: "param",
                value: key,
                allowed: "any key except task, tool, debug, files[..]".into(),
            });
        }
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut p = ToolParams::new();
        p.set("compression_level", "low").unwrap();
        p.set("output_filename", "{filename}_small").unwrap();
        p.set("compression_level", "extreme").unwrap();

        let pairs: Vec<_> = p.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("compression_level", "extreme"),
                ("output_filename", "{filename}_small")
            ]
        );
    }

    #[test]
    fn reserved_keys_rejected() {
        let mut p = ToolParams::new();
        for key in ["task", "tool", "debug", "files[0][filename]", ""] {
            let err = p.set(key, "x").unwrap_err();
            assert!(matches!(err, PdfTaskError::InvalidParameter { .. }), "{key}");
        }
        assert!(p.is_empty());
    }

    #[test]
    fn get_and_remove() {
        let mut p = ToolParams::new();
        p.set("ignore_errors", "true").unwrap();
        assert_eq!(p.get("ignore_errors"), Some("true"));
        assert_eq!(p.remove("ignore_errors").as_deref(), Some("true"));
        assert_eq!(p.get("ignore_errors"), None);
        assert_eq!(p.remove("ignore_errors"), None);
    }
}
