use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::IngestError;

/// Collect every regular file under `root`, at any depth, sorted by path.
///
/// A missing or unreadable root is fatal. Unreadable subdirectories are
/// skipped with a warning. Symlinks to regular files are included; symlinked
/// directories are not descended into. A root that is itself a regular file
/// yields just that file.
pub async fn discover_files(root: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let root_unreadable = |source: io::Error| IngestError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    };

    let meta = fs::metadata(root).await.map_err(root_unreadable)?;
    if meta.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !meta.is_dir() {
        return Err(root_unreadable(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a directory or regular file",
        )));
    }

    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(source) if dir == root => return Err(root_unreadable(source)),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "directory listing interrupted");
                    break;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat entry");
                    continue;
                }
            };

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.push(path);
            } else if file_type.is_symlink() {
                match fs::metadata(&path).await {
                    Ok(target) if target.is_file() => files.push(path),
                    Ok(_) => debug!(path = %path.display(), "not following symlink"),
                    Err(e) => warn!(path = %path.display(), error = %e, "dangling symlink"),
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
