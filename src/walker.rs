//! Non-recursive enumeration of `.job` files in a directory.

use crate::constants::MAX_JOB_FILE_NAME_SIZE;
use crate::error::KvsErrorKind;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Returns every entry of `dir_path` whose name contains `.job`,
/// joined onto `dir_path`. Entries whose resulting path would exceed
/// [`MAX_JOB_FILE_NAME_SIZE`] bytes are skipped with a diagnostic
/// rather than failing the whole walk.
pub fn list_job_files(dir_path: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir_path).map_err(|err| {
        warn!(dir = %dir_path.display(), %err, "failed to open directory");
        err
    })?;

    let dir_str = dir_path.to_string_lossy();
    let needs_slash = !dir_str.ends_with('/');

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.contains(".job") {
            continue;
        }

        let joined = if needs_slash {
            format!("{}/{}", dir_str, name)
        } else {
            format!("{}{}", dir_str, name)
        };

        if joined.len() > MAX_JOB_FILE_NAME_SIZE {
            warn!(path = %joined, "job file path too long, skipping");
            continue;
        }

        files.push(PathBuf::from(joined));
    }
    Ok(files)
}

/// Counts `.job` entries in `dir_path` without materializing their
/// paths. Returns a [`KvsErrorKind::ConfigError`] style failure if the
/// directory is empty of job files after the enumeration.
pub fn ensure_nonempty(files: &[PathBuf], dir_path: &Path) -> Result<()> {
    if files.is_empty() {
        return Err(KvsErrorKind::ConfigError(format!(
            "no .job files found in directory: {}",
            dir_path.display()
        ))
        .into());
    }
    Ok(())
}
