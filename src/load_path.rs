// load_path.rs

use std::path::{Path, PathBuf};

use crate::error::CommandError;

/// Ordered list of directories without duplicates. New entries go first.
#[derive(Debug, Clone, Default)]
pub struct LoadPath {
    dirs: Vec<PathBuf>,
}

impl LoadPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `dir` was already present.
    pub fn add(&mut self, dir: &Path) -> Result<bool, CommandError> {
        if !dir.is_dir() {
            return Err(CommandError::DirectoryNotFound(dir.to_path_buf()));
        }
        Ok(self.insert(dir.to_path_buf()))
    }

    /// Adds `dir` and its immediate, non-hidden subdirectories. Returns how
    /// many directories were new.
    pub fn add_with_subdirs(&mut self, dir: &Path) -> Result<usize, CommandError> {
        if !dir.is_dir() {
            return Err(CommandError::DirectoryNotFound(dir.to_path_buf()));
        }
        let mut subdirs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && entry.file_type()?.is_dir() {
                subdirs.push(entry.path());
            }
        }
        subdirs.sort();
        // keep `dir` ahead of its children once everything is prepended
        let mut added = 0;
        for sub in subdirs.into_iter().rev() {
            if self.insert(sub) {
                added += 1;
            }
        }
        if self.insert(dir.to_path_buf()) {
            added += 1;
        }
        Ok(added)
    }

    pub fn remove(&mut self, dir: &Path) -> bool {
        let before = self.dirs.len();
        self.dirs.retain(|d| d != dir);
        self.dirs.len() != before
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.iter().any(|d| d == dir)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    fn insert(&mut self, dir: PathBuf) -> bool {
        if self.contains(&dir) {
            return false;
        }
        self.dirs.insert(0, dir);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_missing_directory() {
        let mut lp = LoadPath::new();
        let err = lp.add(Path::new("/no/such/dir/anywhere")).unwrap_err();
        assert!(matches!(err, CommandError::DirectoryNotFound(_)));
        assert!(lp.is_empty());
    }

    #[test]
    fn add_is_idempotent_and_prepends() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let mut lp = LoadPath::new();
        assert!(lp.add(a.path()).unwrap());
        assert!(lp.add(b.path()).unwrap());
        assert!(!lp.add(a.path()).unwrap());
        let dirs: Vec<&Path> = lp.iter().collect();
        assert_eq!(dirs, vec![b.path(), a.path()]);
    }

    #[test]
    fn subdirs_are_added_after_parent_and_hidden_ones_skipped() {
        let root = tempfile::tempdir().unwrap();
        for name in ["beta", "alpha", ".git"] {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        std::fs::write(root.path().join("file.el"), "").unwrap();

        let mut lp = LoadPath::new();
        assert_eq!(lp.add_with_subdirs(root.path()).unwrap(), 3);
        let dirs: Vec<PathBuf> = lp.iter().map(Path::to_path_buf).collect();
        assert_eq!(
            dirs,
            vec![root.path().to_path_buf(), root.path().join("alpha"), root.path().join("beta")]
        );
        assert_eq!(lp.add_with_subdirs(root.path()).unwrap(), 0);
    }

    #[test]
    fn remove_reports_whether_anything_changed() {
        let a = tempfile::tempdir().unwrap();
        let mut lp = LoadPath::new();
        lp.add(a.path()).unwrap();
        assert!(lp.remove(a.path()));
        assert!(!lp.remove(a.path()));
    }
}
