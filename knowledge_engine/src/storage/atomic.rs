//! Crash-safe file replacement.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{KnowledgeError, Result};

/// Write `data` to `path` through a sibling temp file and a rename.
///
/// Readers see either the old contents or the new ones, never a partial
/// file. The temp file is removed if any step fails.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = temp_path_for(path);

    let result = write_and_sync(&tmp_path, data)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(|e| KnowledgeError::io("rename", path, e)));

    if let Err(e) = &result {
        tracing::error!(path = %path.display(), error = %e, "Atomic write failed");
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_and_sync(tmp_path: &Path, data: &[u8]) -> Result<()> {
    let mut file = fs::File::create(tmp_path).map_err(|e| KnowledgeError::io("create", tmp_path, e))?;
    file.write_all(data)
        .map_err(|e| KnowledgeError::io("write", tmp_path, e))?;
    file.sync_all()
        .map_err(|e| KnowledgeError::io("sync", tmp_path, e))
}

// Unique per call so two writers never share a temp file.
fn temp_path_for(path: &Path) -> PathBuf {
    let suffix = format!("{}.tmp", Uuid::new_v4().simple());
    match path.extension() {
        Some(ext) => path.with_extension(format!("{}.{suffix}", ext.to_string_lossy())),
        None => path.with_extension(suffix),
    }
}
