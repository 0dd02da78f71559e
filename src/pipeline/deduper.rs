use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::error::HarvestError;
use crate::core::record::VALUE_INDEX;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupeOutcome {
    pub kept: usize,
    pub removed: usize,
}

/// CSV writer used for every output file: comma separated, LF terminated.
pub fn output_writer<W: Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(inner)
}

/// Keeps the header and the first row for each trimmed `ioc_value`.
///
/// The file is only rewritten when something was dropped; the new content
/// goes to a sibling `.tmp` file that is renamed over the original.
/// A missing or empty file is left alone.
pub fn dedupe_file(path: &Path) -> Result<DedupeOutcome, HarvestError> {
    if !path.is_file() {
        return Ok(DedupeOutcome::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut records = reader.records();
    let header = match records.next() {
        Some(header) => header?,
        None => return Ok(DedupeOutcome::default()),
    };

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    let mut removed = 0usize;
    for row in records {
        let row = row?;
        let key = row.get(VALUE_INDEX).unwrap_or("").trim().to_string();
        if seen.insert(key) {
            rows.push(row);
        } else {
            removed += 1;
        }
    }
    drop(reader);

    if removed > 0 {
        let tmp = temp_path(path);
        {
            let mut writer = output_writer(fs::File::create(&tmp)?);
            writer.write_record(&header)?;
            for row in &rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        tracing::debug!("{}: dropped {} duplicate rows", path.display(), removed);
    }

    Ok(DedupeOutcome {
        kept: rows.len(),
        removed,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
