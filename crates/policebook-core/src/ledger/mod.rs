//! Month and year aggregation of purchase records.

mod month;
mod year;

pub use month::{DocumentHook, MonthAggregator, MonthOutcome};
pub use year::{MonthSheet, YearAggregator, YearLedger};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BookError, Result};

/// What happens to a month when one of its documents fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first failing document fails the month, and so the year.
    #[default]
    FailFast,
    /// Failing documents are reported as defects; the rest is kept.
    CollectDefects,
}

/// How month worksheets are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetLabels {
    /// The month directory name.
    #[default]
    Directory,
    /// The 1-based position of the month.
    Index,
}

/// Subdirectories of `dir` as `(name, path)`, in discovery order: numeric
/// names first by value, then the others by name.
pub async fn list_subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| BookError::io(dir, e))?;

    let mut subdirs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| BookError::io(dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| BookError::io(entry.path(), e))?;
        if file_type.is_dir() {
            subdirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }

    subdirs.sort_by(|(a, _), (b, _)| discovery_key(a).cmp(&discovery_key(b)));
    Ok(subdirs)
}

fn discovery_key(name: &str) -> (u8, u64, &str) {
    match name.parse::<u64>() {
        Ok(n) => (0, n, name),
        Err(_) => (1, 0, name),
    }
}
