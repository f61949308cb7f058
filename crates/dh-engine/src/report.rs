//! YAML serialization of aggregated output records.

use dh_core::{OutputRecord, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The on-disk report document: a flat ordered list of records, possibly
/// accumulated across several channels and run periods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    /// Records in aggregation order.
    pub records: Vec<OutputRecord>,
}

/// Read a report document.
pub fn read(path: &Path) -> Result<Report> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_yaml_ng::from_str(&text)?)
}

/// Write records to `path`.
///
/// In append mode an existing document is parsed and extended, so earlier
/// channels' records survive intact; truncate mode starts fresh. The file
/// is rewritten atomically enough for a single-writer batch run: parse
/// first, then one write.
pub fn write(path: &Path, records: &[OutputRecord], append: bool) -> Result<()> {
    let mut report = if append && path.exists() {
        read(path)?
    } else {
        Report::default()
    };
    report.records.extend(records.iter().cloned());
    let text = serde_yaml_ng::to_string(&report)?;
    std::fs::write(path, text)?;
    Ok(())
}
