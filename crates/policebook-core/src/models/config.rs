//! Configuration structures for the police book pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ledger::{FailurePolicy, SheetLabels};
use crate::pdf::FragmentMode;
use crate::receipt::OrderingPolicy;

/// Environment variable overriding the worksheet protection password.
pub const PASSWORD_ENV: &str = "POLICEBOOK_SHEET_PASSWORD";

/// Main configuration for the policebook pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicebookConfig {
    /// Where the receipts live.
    pub input: InputConfig,

    /// PDF fragment extraction configuration.
    pub extraction: ExtractionConfig,

    /// Receipt parsing configuration.
    pub parsing: ParsingConfig,

    /// Month/year aggregation configuration.
    pub aggregation: AggregationConfig,

    /// Workbook output configuration.
    pub workbook: WorkbookConfig,
}

/// Input tree configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Root directory containing `{year}/{month}/{document}`.
    pub root: PathBuf,

    /// Years to process. Empty means every year directory under the root.
    pub years: Vec<String>,

    /// Glob matched against document file names.
    pub document_pattern: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            years: Vec::new(),
            document_pattern: "*.pdf".to_string(),
        }
    }
}

/// Fragment extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// How text fragments are read from page 1.
    pub mode: FragmentMode,

    /// Documents extracted concurrently per month.
    pub jobs: usize,

    /// Per-document extraction timeout in seconds (0 = no timeout).
    pub document_timeout_secs: u64,

    /// Retries for transient extraction failures.
    pub max_retries: u32,

    /// Base delay between retries, multiplied by the attempt number.
    pub retry_delay_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: FragmentMode::default(),
            jobs: 8,
            document_timeout_secs: 30,
            max_retries: 2,
            retry_delay_ms: 200,
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.document_timeout_secs > 0).then(|| Duration::from_secs(self.document_timeout_secs))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Receipt parsing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// How the within-month ordering key is derived.
    pub ordering: OrderingPolicy,

    /// Reject legal entities whose SIREN/SIRET fails the Luhn check.
    pub validate_siren: bool,
}

/// Aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// What happens when one document of a month fails.
    pub failure_policy: FailurePolicy,

    /// First order number of a run.
    pub starting_sequence: u32,

    /// Keep numbering across the years of a run. When off, every year
    /// restarts at `starting_sequence`.
    pub continuous_numbering: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            starting_sequence: 1,
            continuous_numbering: true,
        }
    }
}

/// Workbook output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookConfig {
    /// Directory receiving `{year}.xlsx`.
    pub output_dir: PathBuf,

    /// How worksheets are named.
    pub sheet_labels: SheetLabels,

    /// Worksheet protection password. Prefer the environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection_password: Option<String>,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            sheet_labels: SheetLabels::default(),
            protection_password: None,
        }
    }
}

impl WorkbookConfig {
    /// Password from the environment, falling back to the config file.
    pub fn resolved_password(&self) -> Option<String> {
        std::env::var(PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| self.protection_password.clone())
    }
}

impl PolicebookConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Directory of one year of receipts.
    pub fn year_dir(&self, year: &str) -> PathBuf {
        self.input.root.join(year)
    }

    /// Output path of one year's workbook.
    pub fn workbook_path(&self, year: &str) -> PathBuf {
        self.workbook.output_dir.join(format!("{}.xlsx", year))
    }
}
