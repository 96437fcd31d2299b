//! Local files tracked by a task, in insertion order.

use crate::error::PdfTaskError;
use std::path::{Path, PathBuf};

/// One local file and, once uploaded, the name the server gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    path: PathBuf,
    server_filename: Option<String>,
}

impl TrackedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn server_filename(&self) -> Option<&str> {
        self.server_filename.as_deref()
    }

    /// Final path component, sent as the original name at process time.
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn is_uploaded(&self) -> bool {
        self.server_filename.is_some()
    }
}

/// Ordered, duplicate-free list of [`TrackedFile`]s.
///
/// Order matters: the process payload indexes files by position, so the
/// same input always produces the same `files[i]` layout.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: Vec<TrackedFile>,
}

impl FileSet {
    /// Track `path`. Returns `Ok(false)` if it is already tracked.
    ///
    /// Fails with [`PdfTaskError::FileNotFound`] unless `path` is an
    /// existing regular file.
    pub fn add(&mut self, path: impl AsRef<Path>) -> Result<bool, PdfTaskError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PdfTaskError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        if self.contains(path) {
            return Ok(false);
        }
        self.files.push(TrackedFile {
            path: path.to_path_buf(),
            server_filename: None,
        });
        Ok(true)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedFile> {
        self.files.iter()
    }

    pub fn get(&self, index: usize) -> Option<&TrackedFile> {
        self.files.get(index)
    }

    /// Index and path of every file that has no server filename yet.
    pub fn pending(&self) -> Vec<(usize, PathBuf)> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_uploaded())
            .map(|(i, f)| (i, f.path.clone()))
            .collect()
    }

    pub fn all_uploaded(&self) -> bool {
        self.files.iter().all(TrackedFile::is_uploaded)
    }

    pub(crate) fn set_server_filename(&mut self, index: usize, name: String) {
        if let Some(f) = self.files.get_mut(index) {
            f.server_filename = Some(name);
        }
    }

    /// Forget server-side names; they are meaningless once the task is deleted.
    pub(crate) fn clear_server_filenames(&mut self) {
        for f in &mut self.files {
            f.server_filename = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        path
    }

    #[test]
    fn add_rejects_missing_file() {
        let mut set = FileSet::default();
        let err = set.add("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, PdfTaskError::FileNotFound { .. }));
        assert!(set.is_empty());
    }

    #[test]
    fn add_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = FileSet::default();
        assert!(set.add(dir.path()).is_err());
    }

    #[test]
    fn duplicate_is_tracked_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = temp_file(&dir, "a.pdf");
        let mut set = FileSet::default();
        assert!(set.add(&a).unwrap());
        assert!(!set.add(&a).unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn keeps_insertion_order_and_tracks_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let b = temp_file(&dir, "b.pdf");
        let a = temp_file(&dir, "a.pdf");
        let mut set = FileSet::default();
        set.add(&b).unwrap();
        set.add(&a).unwrap();

        let names: Vec<String> = set.iter().map(TrackedFile::filename).collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf"]);
        assert_eq!(set.pending().len(), 2);

        set.set_server_filename(1, "srv-a".into());
        assert_eq!(set.pending(), vec![(0, b.clone())]);
        assert!(!set.all_uploaded());

        set.set_server_filename(0, "srv-b".into());
        assert!(set.all_uploaded());
        assert_eq!(set.get(0).unwrap().server_filename(), Some("srv-b"));

        set.clear_server_filenames();
        assert_eq!(set.pending().len(), 2);
    }
}
