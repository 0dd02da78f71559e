//! Scratch copy of the raw feed and the last-updated marker it carries.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::error::HarvestError;

pub const MARKER_PREFIX: &str = "# Last updated:";

/// Writes the feed body verbatim, replacing any previous scratch file.
pub fn write_scratch(content: &str, path: &Path) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    tracing::debug!("scratch file written: {}", path.display());
    Ok(())
}

/// Returns the first line starting with [`MARKER_PREFIX`], trailing whitespace removed.
pub fn extract_last_updated(path: &Path) -> Result<String, HarvestError> {
    let reader = BufReader::new(fs::File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if line.starts_with(MARKER_PREFIX) {
            let marker = line.trim_end().to_string();
            tracing::info!("last updated marker: {}", marker);
            return Ok(marker);
        }
    }
    Err(HarvestError::MarkerNotFound(path.display().to_string()))
}
