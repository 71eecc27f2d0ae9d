//! Publishing validator reports into the run's output directory.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

/// Report rewritten from a per-record mapping into value counts.
pub const NEGOTIATED_TYPE_REPORT: &str = "negotiatedType.json";

/// Copy `reports` into `output_dir` as `<sequence>-<name>`.
pub fn publish_reports(
    reports: &[PathBuf],
    sequence: usize,
    output_dir: &Path,
) -> io::Result<Vec<PathBuf>> {
    let mut published = Vec::with_capacity(reports.len());
    for report in reports {
        let Some(name) = report.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let target = output_dir.join(format!("{sequence}-{name}"));

        if name == NEGOTIATED_TYPE_REPORT {
            match frequency_report(report)? {
                Some(counts) => fs::write(&target, counts)?,
                None => {
                    fs::copy(report, &target)?;
                }
            }
        } else {
            fs::copy(report, &target)?;
        }

        debug!("Published report {}", target.display());
        published.push(target);
    }
    Ok(published)
}

fn frequency_report(path: &Path) -> io::Result<Option<String>> {
    let raw = fs::read_to_string(path)?;
    let flat: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Leaving {} untouched, not valid JSON: {e}", path.display());
            return Ok(None);
        }
    };
    let Some(counts) = frequency_map(&flat) else {
        warn!("Leaving {} untouched, not an object", path.display());
        return Ok(None);
    };
    serde_json::to_string_pretty(&counts)
        .map(Some)
        .map_err(io::Error::other)
}

/// Count how often each value occurs in a flat `{record: value}` object.
pub fn frequency_map(flat: &Value) -> Option<BTreeMap<String, u64>> {
    let object = flat.as_object()?;
    let mut counts = BTreeMap::new();
    for value in object.values() {
        let key = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    Some(counts)
}
