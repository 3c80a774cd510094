use crate::config::Config;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub struct FileDiscovery {
    suffix: String,
}

impl FileDiscovery {
    pub fn new(config: &Config) -> Self {
        Self {
            suffix: config.suffix(),
        }
    }

    /// Lists the source files directly inside `dir`, sorted by name.
    ///
    /// Hidden and `_`-prefixed files stay in the list as `None` so the
    /// positions line up with the directory listing; callers skip them.
    /// Only a failure to read `dir` itself is an error; unreadable entries
    /// inside it are skipped.
    pub fn discover_files(&self, dir: &Path) -> crate::Result<Vec<Option<PathBuf>>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(dir)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            if !entry.file_name().to_string_lossy().ends_with(&self.suffix) {
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            if should_ignore_file(entry.path()) {
                files.push(None);
            } else {
                files.push(Some(entry.into_path()));
            }
        }

        Ok(files)
    }
}

/// Leading `.` marks editor/backup files, leading `_` marks files the go
/// tool ignores.
pub fn should_ignore_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| {
            let name = name.to_string_lossy();
            name.starts_with('.') || name.starts_with('_')
        })
        .unwrap_or(true)
}
