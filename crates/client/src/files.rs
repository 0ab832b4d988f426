use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ClientError;

/// A local file and the `/`-separated name it is uploaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub relative_name: String,
    pub size: u64,
}

/// Final path component as UTF-8, used as the upload name for single files.
pub fn upload_name(path: &Path) -> Result<String, ClientError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| ClientError::InvalidFileName(path.display().to_string()))
}

/// Every regular file below `dir`, sorted by relative name.
pub fn list_files(dir: &Path) -> Result<Vec<LocalFile>, ClientError> {
    let mut files = Vec::new();
    walk(dir, dir, &mut files)?;
    files.sort_by(|a, b| a.relative_name.cmp(&b.relative_name));
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<LocalFile>) -> Result<(), ClientError> {
    let entries = fs::read_dir(dir).map_err(|e| ClientError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ClientError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| ClientError::io(&path, e))?;

        if file_type.is_dir() {
            walk(root, &path, files)?;
            continue;
        }

        // Symlinked files are uploaded by content. Symlinked directories are
        // skipped so a link cycle cannot recurse forever.
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if file_type.is_symlink() => {
                warn!(path = %path.display(), "skipping dangling symlink: {e}");
                continue;
            }
            Err(e) => return Err(ClientError::io(&path, e)),
        };
        if file_type.is_symlink() && metadata.is_dir() {
            debug!(path = %path.display(), "skipping symlinked directory");
        } else if metadata.is_file() {
            let relative_name = relative_name(root, &path)?;
            files.push(LocalFile {
                path,
                relative_name,
                size: metadata.len(),
            });
        }
    }
    Ok(())
}

fn relative_name(root: &Path, path: &Path) -> Result<String, ClientError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ClientError::InvalidFileName(path.display().to_string()))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| ClientError::InvalidFileName(path.display().to_string()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}
