//! File helpers shared by the rule, config, and export modules.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{DiagError, Result};

/// Maximum rule or config file size that is read into memory (4 MB).
///
/// The largest shipped rule table is well under 1 MB.
pub const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// Read a rule source into a string with size limit protection.
///
/// A file that does not exist is reported as `ConfigMissing`; a file that
/// exceeds `MAX_FILE_SIZE` is reported as `ConfigMalformed`. Other I/O
/// failures surface as `Storage` errors.
pub fn read_rule_source(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
///
/// # Errors
///
/// Returns an error if the file is absent, unreadable, or exceeds `max_size`.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DiagError::config_missing(path.display().to_string()));
        }
        Err(e) => return Err(DiagError::storage(path, e)),
    };

    let size = metadata.len();
    if size > max_size {
        return Err(DiagError::config_malformed(
            path.display().to_string(),
            format!("file is too large ({} bytes, max {} bytes)", size, max_size),
        ));
    }

    fs::read_to_string(path).map_err(|e| DiagError::storage(path, e))
}

/// Write a file atomically using temp file + rename.
///
/// The temp file lives next to the destination so the rename never crosses
/// a filesystem boundary.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| DiagError::storage(parent, e))?;
        }
    }

    // Rename is atomic on POSIX
    let written = fs::File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(content.as_bytes())?;
            file.sync_all()
        })
        .map_err(|e| DiagError::storage(&temp_path, e))
        .and_then(|()| fs::rename(&temp_path, path).map_err(|e| DiagError::storage(path, e)));

    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}
