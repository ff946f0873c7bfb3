//! Batch file I/O.
//!
//! Input is a JSON array of [`ApiChange`] records; output is a JSON array of
//! [`TestOutcome`](crate::domain::TestOutcome)s in dispatch order.

use std::path::Path;

use tracing::debug;

use crate::domain::{ApiChange, BatchResult, EvalError, Result};

/// Read a batch of API changes from `path`.
pub fn read_batch(path: &Path) -> Result<Vec<ApiChange>> {
    if !path.exists() {
        return Err(EvalError::BatchNotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)?;
    let changes: Vec<ApiChange> = serde_json::from_str(&raw)?;
    debug!(path = %path.display(), changes = changes.len(), "read batch");
    Ok(changes)
}

/// Write `result` to `path` as pretty-printed JSON, creating parent
/// directories as needed.
pub fn write_batch(path: &Path, result: &BatchResult) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), outcomes = result.len(), "wrote batch result");
    Ok(())
}
