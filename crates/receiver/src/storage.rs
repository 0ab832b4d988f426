use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ReceiverError;

/// Unpacks an uploaded archive after it has been written to disk.
///
/// Implementations are sync and run on the blocking pool.
pub trait ArchiveExtractor: Send + Sync {
    fn extract(&self, archive: &Path, destination: &Path) -> anyhow::Result<()>;
}

/// Where an accepted upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub size: u64,
    pub extracted: bool,
    pub extract_dir: Option<PathBuf>,
}

/// Maps path keys to base directories and writes payloads under them.
pub struct UploadStore {
    paths: BTreeMap<String, PathBuf>,
    extractor: Option<Arc<dyn ArchiveExtractor>>,
}

impl UploadStore {
    pub fn new(paths: BTreeMap<String, PathBuf>) -> Self {
        Self {
            paths,
            extractor: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn path_keys(&self) -> Vec<&str> {
        self.paths.keys().map(String::as_str).collect()
    }

    /// Resolves the destination file for `path_key`/`file_name`.
    pub fn resolve(&self, path_key: &str, file_name: &str) -> Result<PathBuf, ReceiverError> {
        let base = self
            .paths
            .get(path_key)
            .ok_or_else(|| ReceiverError::BadRequest(format!("unknown path key: {path_key}")))?;

        if !is_valid_file_name(file_name) {
            return Err(ReceiverError::BadRequest(format!("invalid file name: {file_name}")));
        }

        let target = file_name
            .split('/')
            .fold(base.clone(), |path, component| path.join(component));
        if !target.starts_with(base) {
            return Err(ReceiverError::BadRequest(format!("invalid file name: {file_name}")));
        }
        Ok(target)
    }

    /// Writes `data` to `target`, creating parent directories, and optionally
    /// extracts `.zip` archives next to it.
    pub async fn store(&self, target: &Path, data: &[u8], extract: bool) -> Result<StoredUpload, ReceiverError> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ReceiverError::Storage(format!("creating {}: {e}", parent.display()))
            })?;
        }
        tokio::fs::write(target, data)
            .await
            .map_err(|e| ReceiverError::Storage(format!("writing {}: {e}", target.display())))?;

        let mut stored = StoredUpload {
            path: target.to_path_buf(),
            size: data.len() as u64,
            extracted: false,
            extract_dir: None,
        };

        if extract && is_zip(target) {
            stored.extract_dir = self.extract(target).await;
            stored.extracted = stored.extract_dir.is_some();
        }
        Ok(stored)
    }

    // Extraction failures are logged and reported as not extracted; the upload
    // itself already succeeded.
    async fn extract(&self, archive: &Path) -> Option<PathBuf> {
        let Some(extractor) = self.extractor.clone() else {
            warn!(archive = %archive.display(), "extraction requested but no extractor is configured");
            return None;
        };

        let archive = archive.to_path_buf();
        let destination = archive.with_extension("");
        let result = tokio::task::spawn_blocking({
            let archive = archive.clone();
            let destination = destination.clone();
            move || extractor.extract(&archive, &destination)
        })
        .await;

        match result {
            Ok(Ok(())) => {
                info!(archive = %archive.display(), destination = %destination.display(), "extracted archive");
                Some(destination)
            }
            Ok(Err(e)) => {
                warn!(archive = %archive.display(), "extraction failed: {e:#}");
                None
            }
            Err(e) => {
                warn!(archive = %archive.display(), "extraction task failed: {e}");
                None
            }
        }
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\0', '\\'];

/// Relative, `/`-separated file name with no traversal, hidden components or
/// characters that are unsafe on common filesystems.
pub fn is_valid_file_name(file_name: &str) -> bool {
    if file_name.is_empty() || file_name.contains(FORBIDDEN_CHARS) {
        return false;
    }
    file_name
        .split('/')
        .all(|component| !component.is_empty() && !component.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> UploadStore {
        UploadStore::new(BTreeMap::from([("web".to_string(), dir.to_path_buf())]))
    }

    struct MarkerExtractor;

    impl ArchiveExtractor for MarkerExtractor {
        fn extract(&self, _archive: &Path, destination: &Path) -> anyhow::Result<()> {
            std::fs::create_dir_all(destination)?;
            std::fs::write(destination.join("index.html"), b"<html></html>")?;
            Ok(())
        }
    }

    struct FailingExtractor;

    impl ArchiveExtractor for FailingExtractor {
        fn extract(&self, _archive: &Path, _destination: &Path) -> anyhow::Result<()> {
            anyhow::bail!("not a zip archive")
        }
    }

    #[test]
    fn valid_file_names() {
        for name in ["a.txt", "app.zip", "assets/js/main.js", "with space.bin"] {
            assert!(is_valid_file_name(name), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_file_names() {
        for name in [
            "",
            "../etc/passwd",
            "assets/../../x",
            "/abs",
            ".env",
            "assets/.git/config",
            "a//b",
            "a/",
            "con:1",
            "a\\b",
            "what?.txt",
            "nul\0",
        ] {
            assert!(!is_valid_file_name(name), "{name:?} should be invalid");
        }
    }

    #[test]
    fn resolve_rejects_unknown_path_key() {
        let dir = tempfile::tempdir().unwrap();
        let err = store_in(dir.path()).resolve("api", "a.txt").unwrap_err();
        assert!(matches!(err, ReceiverError::BadRequest(msg) if msg.contains("api")));
    }

    #[test]
    fn resolve_joins_sub_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = store_in(dir.path()).resolve("web", "assets/main.js").unwrap();
        assert_eq!(target, dir.path().join("assets").join("main.js"));
    }

    #[tokio::test]
    async fn store_creates_parents_and_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let target = store.resolve("web", "nested/dir/a.txt").unwrap();

        let stored = store.store(&target, b"0123456789", false).await.unwrap();
        assert_eq!(stored.size, 10);
        assert!(!stored.extracted);
        assert_eq!(std::fs::read(&target).unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn zip_is_extracted_next_to_archive() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path()).with_extractor(Arc::new(MarkerExtractor));
        let target = store.resolve("web", "site.ZIP").unwrap();

        let stored = store.store(&target, b"PK", true).await.unwrap();
        assert!(stored.extracted);
        let extract_dir = stored.extract_dir.unwrap();
        assert_eq!(extract_dir, dir.path().join("site"));
        assert!(extract_dir.join("index.html").exists());
    }

    #[tokio::test]
    async fn non_zip_is_never_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path()).with_extractor(Arc::new(MarkerExtractor));
        let target = store.resolve("web", "app.jar").unwrap();

        let stored = store.store(&target, b"jar", true).await.unwrap();
        assert!(!stored.extracted);
        assert!(stored.extract_dir.is_none());
    }

    #[tokio::test]
    async fn failed_extraction_keeps_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path()).with_extractor(Arc::new(FailingExtractor));
        let target = store.resolve("web", "site.zip").unwrap();

        let stored = store.store(&target, b"garbage", true).await.unwrap();
        assert!(!stored.extracted);
        assert!(target.exists());
    }
}
