use crate::core::{ConfigProvider, FetchReport, ObjectStore};
use crate::utils::error::{ConceptsError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Mirrors every object under a prefix into a local directory, keeping the
/// key layout (`<download_dir>/<key>`).
pub struct Fetcher<S: ObjectStore> {
    store: Arc<S>,
    prefix: String,
    download_dir: PathBuf,
    concurrency: usize,
}

impl<S: ObjectStore + 'static> Fetcher<S> {
    pub fn new<C: ConfigProvider>(store: S, config: &C) -> Self {
        Self {
            store: Arc::new(store),
            prefix: config.prefix().to_string(),
            download_dir: PathBuf::from(config.download_dir()),
            concurrency: config.concurrent_downloads().max(1),
        }
    }

    pub async fn run(&self) -> Result<FetchReport> {
        tokio::fs::create_dir_all(&self.download_dir).await?;

        let entries = self.store.list(&self.prefix).await?;
        let listed_bytes: u64 = entries.iter().map(|entry| entry.size).sum();
        let mut report = FetchReport {
            listed: entries.len(),
            ..Default::default()
        };
        tracing::info!(
            "Found {} objects ({} bytes) under prefix '{}'",
            entries.len(),
            listed_bytes,
            self.prefix
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut downloads = JoinSet::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let Some(local_path) = local_path_for_key(&self.download_dir, &entry.key) else {
                if !entry.key.ends_with('/') {
                    tracing::warn!("Skipping object with unsafe key '{}'", entry.key);
                }
                report.skipped += 1;
                continue;
            };

            // The index keeps temp names distinct when one key is another plus ".part".
            let temp_path = temp_path_for(&local_path, index);

            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let cancelled = Arc::clone(&cancelled);
            downloads.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ConceptsError::processing(e.to_string()))?;
                if cancelled.load(Ordering::Relaxed) {
                    return Ok(None);
                }

                tracing::info!("Downloading {} to {}...", entry.key, local_path.display());
                let data = store.get(&entry.key).await?;
                write_atomically(&local_path, &temp_path, &data).await?;
                Ok::<Option<u64>, ConceptsError>(Some(data.len() as u64))
            });
        }

        // In-flight downloads are drained rather than aborted so no temp file
        // is left half written.
        let mut first_error = None;
        while let Some(joined) = downloads.join_next().await {
            let outcome = match joined {
                Ok(result) => result,
                Err(e) => Err(ConceptsError::processing(format!("download task failed: {}", e))),
            };

            match outcome {
                Ok(Some(bytes)) => {
                    report.downloaded += 1;
                    report.bytes += bytes;
                }
                Err(e) if first_error.is_none() => {
                    tracing::warn!("Download failed, cancelling the remaining ones: {}", e);
                    cancelled.store(true, Ordering::Relaxed);
                    first_error = Some(e);
                }
                Ok(None) | Err(_) => {}
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        tracing::info!(
            "Downloaded {} objects ({} bytes), skipped {}",
            report.downloaded,
            report.bytes,
            report.skipped
        );
        Ok(report)
    }
}

/// Maps an object key onto the download directory. Directory markers and keys
/// with empty, `.` or `..` segments yield `None`.
pub fn local_path_for_key(download_dir: &Path, key: &str) -> Option<PathBuf> {
    if key.is_empty() || key.ends_with('/') || key.starts_with('/') {
        return None;
    }

    let mut path = download_dir.to_path_buf();
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return None;
        }
        path.push(segment);
    }
    Some(path)
}

fn temp_path_for(path: &Path, index: usize) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(format!(".{}.part", index));
    PathBuf::from(temp)
}

async fn write_atomically(path: &Path, temp_path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if let Err(e) = write_then_rename(path, temp_path, data).await {
        let _ = tokio::fs::remove_file(temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

async fn write_then_rename(path: &Path, temp_path: &Path, data: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(temp_path, data).await?;
    tokio::fs::rename(temp_path, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::core::ObjectEntry;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// In-memory bucket; `get` fails for keys listed in `broken`.
    struct MemoryStore {
        objects: BTreeMap<String, Vec<u8>>,
        broken: Vec<String>,
    }

    impl MemoryStore {
        fn new(objects: &[(&str, &str)]) -> Self {
            Self {
                objects: objects
                    .iter()
                    .map(|(key, data)| (key.to_string(), data.as_bytes().to_vec()))
                    .collect(),
                broken: Vec::new(),
            }
        }
    }

    impl ObjectStore for MemoryStore {
        async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
            Ok(self
                .objects
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, data)| ObjectEntry {
                    key: key.clone(),
                    size: data.len() as u64,
                })
                .collect())
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>> {
            if self.broken.iter().any(|broken| broken == key) {
                return Err(ConceptsError::storage(format!("access denied: {}", key)));
            }
            self.objects
                .get(key)
                .cloned()
                .ok_or_else(|| ConceptsError::storage(format!("no such key: {}", key)))
        }
    }

    fn config(download_dir: &Path) -> SyncConfig {
        SyncConfig {
            bucket: "cpr-production-document-cache".to_string(),
            prefix: "concepts".to_string(),
            region: "eu-west-1".to_string(),
            endpoint_url: None,
            download_dir: download_dir.to_string_lossy().into_owned(),
            database_path: "concepts.db".to_string(),
            concurrent_downloads: 2,
        }
    }

    fn files_under(dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                files.extend(files_under(&path));
            } else {
                files.push(path);
            }
        }
        files
    }

    #[tokio::test]
    async fn test_run_skips_markers_and_unsafe_keys() {
        let work_dir = TempDir::new().unwrap();
        let download_dir = work_dir.path().join("mirror");
        let store = MemoryStore::new(&[
            ("concepts/", ""),
            ("concepts/../../evil.json", "{}"),
            ("concepts/Q1.json", "ab"),
            ("concepts/nested/Q2.json", "cd"),
        ]);

        let report = Fetcher::new(store, &config(&download_dir))
            .run()
            .await
            .unwrap();
        assert_eq!(
            report,
            FetchReport {
                listed: 4,
                downloaded: 2,
                skipped: 2,
                bytes: 4,
            }
        );

        assert_eq!(
            std::fs::read(download_dir.join("concepts/nested/Q2.json")).unwrap(),
            b"cd"
        );
        assert!(!work_dir.path().join("evil.json").exists());
        assert!(!download_dir.join("evil.json").exists());
        assert_eq!(files_under(work_dir.path()).len(), 2);
    }

    #[tokio::test]
    async fn test_run_keeps_keys_that_look_like_temp_files() {
        let work_dir = TempDir::new().unwrap();
        let store = MemoryStore::new(&[
            ("concepts/Q1.json", "first"),
            ("concepts/Q1.json.part", "second"),
        ]);

        let report = Fetcher::new(store, &config(work_dir.path()))
            .run()
            .await
            .unwrap();
        assert_eq!(report.downloaded, 2);

        let concepts = work_dir.path().join("concepts");
        assert_eq!(std::fs::read(concepts.join("Q1.json")).unwrap(), b"first");
        assert_eq!(
            std::fs::read(concepts.join("Q1.json.part")).unwrap(),
            b"second"
        );
        assert_eq!(files_under(work_dir.path()).len(), 2);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_partial_files() {
        let work_dir = TempDir::new().unwrap();
        let mut store = MemoryStore::new(&[
            ("concepts/Q1.json", "{}"),
            ("concepts/Q2.json", "{}"),
            ("concepts/Q3.json", "{}"),
        ]);
        store.broken.push("concepts/Q2.json".to_string());

        let result = Fetcher::new(store, &config(work_dir.path())).run().await;
        assert!(matches!(result, Err(ConceptsError::StorageError { .. })));

        let leftovers: Vec<_> = files_under(work_dir.path())
            .into_iter()
            .filter(|path| path.to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty(), "partial files left: {:?}", leftovers);
        assert!(!work_dir.path().join("concepts/Q2.json").exists());
    }

    #[test]
    fn test_temp_path_is_unique_per_index() {
        let path = Path::new("/tmp/mirror/concepts/Q1.json");
        assert_eq!(
            temp_path_for(path, 3),
            PathBuf::from("/tmp/mirror/concepts/Q1.json.3.part")
        );
        assert_ne!(temp_path_for(path, 0), temp_path_for(path, 1));
    }

    #[test]
    fn test_local_path_keeps_key_layout() {
        let base = Path::new("/tmp/mirror");
        assert_eq!(
            local_path_for_key(base, "concepts/Q1.json"),
            Some(PathBuf::from("/tmp/mirror/concepts/Q1.json"))
        );
    }

    #[test]
    fn test_local_path_rejects_unsafe_keys() {
        let base = Path::new("/tmp/mirror");
        assert_eq!(local_path_for_key(base, "concepts/"), None);
        assert_eq!(local_path_for_key(base, ""), None);
        assert_eq!(local_path_for_key(base, "/etc/passwd"), None);
        assert_eq!(local_path_for_key(base, "concepts/../../x"), None);
        assert_eq!(local_path_for_key(base, "concepts//Q1.json"), None);
        assert_eq!(local_path_for_key(base, "concepts/./Q1.json"), None);
    }
}
