#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Local};

use super::ScaffoldError;

/// Suffix format appended to backed up files, in local time.
pub const BACKUP_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";

/// `<path>_<YYYYMMDD-HHMMSS>` for a file last modified at `modified`.
///
/// Two backups of the same path within one second collide.
pub fn backup_path(path: &Path, modified: SystemTime) -> PathBuf {
    let stamp = DateTime::<Local>::from(modified).format(BACKUP_TIME_FORMAT);
    let mut name = path.as_os_str().to_os_string();
    name.push(format!("_{stamp}"));
    PathBuf::from(name)
}

/// Moves `path` aside to its timestamped backup name and returns that name.
pub fn backup_file(path: &Path) -> Result<PathBuf, ScaffoldError> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| ScaffoldError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;
    let target = backup_path(path, modified);

    tracing::debug!("Backing up {} to {}.", path.display(), target.display());
    std::fs::rename(path, &target).map_err(|source| ScaffoldError::Backup {
        from: path.to_path_buf(),
        to: target.clone(),
        source,
    })?;
    Ok(target)
}

/// Writes `contents` to `path`, first backing up whatever was there.
///
/// Returns the backup name when an existing file was moved aside.
pub fn write_with_backup(path: &Path, contents: &str) -> Result<Option<PathBuf>, ScaffoldError> {
    let backup = if path.exists() {
        tracing::info!("File {} exists. Backing it up.", path.display());
        Some(backup_file(path)?)
    } else {
        None
    };

    std::fs::write(path, contents).map_err(|source| ScaffoldError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(backup)
}
