use crate::core::{ObjectEntry, ObjectStore};
use crate::utils::error::{ConceptsError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A directory treated as a bucket. Keys are `/`-separated paths relative to
/// the root.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collect(&self, dir: &Path, out: &mut Vec<ObjectEntry>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                self.collect(&path, out)?;
            } else if file_type.is_file() {
                let relative = path.strip_prefix(&self.root).map_err(|e| {
                    ConceptsError::storage(format!("{} escaped store root: {}", path.display(), e))
                })?;
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(ObjectEntry {
                    key,
                    size: entry.metadata()?.len(),
                });
            }
        }
        Ok(())
    }
}

impl ObjectStore for LocalObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        if !self.root.is_dir() {
            return Err(ConceptsError::storage(format!(
                "local store root {} is not a directory",
                self.root.display()
            )));
        }

        let mut entries = Vec::new();
        self.collect(&self.root, &mut entries)?;
        entries.retain(|entry| entry.key.starts_with(prefix));
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.root.join(key);
        fs::read(&path)
            .map_err(|e| ConceptsError::storage(format!("failed to read {}: {}", key, e)))
    }
}
