//! Month aggregation: every receipt of one month directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use glob::{MatchOptions, Pattern};
use lazy_static::lazy_static;
use tracing::{debug, info, warn};

use super::FailurePolicy;
use crate::error::{BookError, DocumentDefect, ExtractionError, ReceiptError, Result};
use crate::models::config::PolicebookConfig;
use crate::models::record::PurchaseRecord;
use crate::pdf::FragmentSource;
use crate::receipt::ReceiptParser;

/// Called once per document, after it was parsed or rejected.
pub type DocumentHook = Arc<dyn Fn(&Path) + Send + Sync>;

lazy_static! {
    static ref DEFAULT_DOCUMENT_PATTERN: Pattern = Pattern::new("*.pdf").unwrap();
}

/// Records of one month, sorted by ordering key.
#[derive(Debug, Default)]
pub struct MonthOutcome {
    /// Parsed records in ascending ordering-key order.
    pub records: Vec<PurchaseRecord>,
    /// Documents that failed, when defects are collected.
    pub defects: Vec<DocumentDefect>,
}

/// Extracts and parses every document of a month directory concurrently.
#[derive(Clone)]
pub struct MonthAggregator {
    source: Arc<dyn FragmentSource>,
    parser: ReceiptParser,
    failure_policy: FailurePolicy,
    pattern: Pattern,
    jobs: usize,
    timeout: Option<Duration>,
    max_retries: u32,
    retry_delay: Duration,
    on_document: Option<DocumentHook>,
}

impl MonthAggregator {
    /// Create an aggregator with default settings.
    pub fn new(source: Arc<dyn FragmentSource>, parser: ReceiptParser) -> Self {
        Self {
            source,
            parser,
            failure_policy: FailurePolicy::default(),
            pattern: DEFAULT_DOCUMENT_PATTERN.clone(),
            jobs: 8,
            timeout: None,
            max_retries: 0,
            retry_delay: Duration::ZERO,
            on_document: None,
        }
    }

    /// Create an aggregator from the pipeline configuration.
    pub fn from_config(source: Arc<dyn FragmentSource>, config: &PolicebookConfig) -> Result<Self> {
        let parser = ReceiptParser::new()
            .with_ordering(config.parsing.ordering)
            .with_siren_validation(config.parsing.validate_siren);

        let pattern = Pattern::new(&config.input.document_pattern).map_err(|e| {
            BookError::Config(format!(
                "invalid document pattern {:?}: {}",
                config.input.document_pattern, e
            ))
        })?;

        Ok(Self::new(source, parser)
            .with_failure_policy(config.aggregation.failure_policy)
            .with_document_pattern(pattern)
            .with_jobs(config.extraction.jobs)
            .with_timeout(config.extraction.timeout())
            .with_retries(config.extraction.max_retries, config.extraction.retry_delay()))
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the glob matched against document file names.
    pub fn with_document_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Set the number of documents extracted at once.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set the per-document extraction timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retries for transient extraction failures.
    pub fn with_retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = delay;
        self
    }

    /// Report every finished document, e.g. to advance a progress bar.
    pub fn on_document(mut self, hook: DocumentHook) -> Self {
        self.on_document = Some(hook);
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Parse every document of `month_dir`.
    pub async fn aggregate(&self, month_dir: &Path) -> Result<MonthOutcome> {
        let start = Instant::now();
        let documents = self.list_documents(month_dir).await?;
        debug!("{}: {} documents", month_dir.display(), documents.len());

        let mut results = stream::iter(documents)
            .map(|path| async move {
                let result = self.process(&path).await;
                (path, result)
            })
            .buffer_unordered(self.jobs);

        let mut outcome = MonthOutcome::default();
        while let Some((path, result)) = results.next().await {
            if let Some(hook) = &self.on_document {
                hook(&path);
            }
            match result {
                Ok(record) => {
                    info!("{} read, data extracted", path.display());
                    outcome.records.push(record);
                }
                Err(error) => {
                    let defect = DocumentDefect::new(path, error);
                    match self.failure_policy {
                        FailurePolicy::FailFast => return Err(defect.into()),
                        FailurePolicy::CollectDefects => {
                            warn!("Skipping {}", defect);
                            outcome.defects.push(defect);
                        }
                    }
                }
            }
        }

        outcome.records.sort_by(|a, b| {
            a.ordering_key()
                .cmp(&b.ordering_key())
                .then_with(|| a.source.cmp(&b.source))
        });
        outcome.defects.sort_by(|a, b| a.path.cmp(&b.path));

        debug!(
            "{}: {} records, {} defects in {:?}",
            month_dir.display(),
            outcome.records.len(),
            outcome.defects.len(),
            start.elapsed()
        );
        Ok(outcome)
    }

    /// Regular files matching the document pattern, sorted by name.
    async fn list_documents(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::default()
        };

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| BookError::io(dir, e))?;

        let mut documents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BookError::io(dir, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| BookError::io(entry.path(), e))?
                .is_file();
            let name = entry.file_name();
            if is_file && self.pattern.matches_with(&name.to_string_lossy(), options) {
                documents.push(entry.path());
            }
        }

        documents.sort();
        Ok(documents)
    }

    async fn process(&self, path: &Path) -> std::result::Result<PurchaseRecord, ReceiptError> {
        let fragments = self.extract_with_retry(path).await?;
        let record = self.parser.parse(&fragments)?;
        Ok(record.with_source(path))
    }

    async fn extract_with_retry(
        &self,
        path: &Path,
    ) -> std::result::Result<Vec<String>, ExtractionError> {
        let mut attempt = 0;
        loop {
            match self.extract(path).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Retrying {} ({}/{}): {}",
                        path.display(),
                        attempt,
                        self.max_retries,
                        e
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                result => return result,
            }
        }
    }

    /// One extraction on the blocking pool. The source releases the document
    /// before the closure returns, whatever the outcome.
    async fn extract(&self, path: &Path) -> std::result::Result<Vec<String>, ExtractionError> {
        let source = Arc::clone(&self.source);
        let owned = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || source.fragments(&owned));

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| ExtractionError::TimedOut(limit))?,
            None => task.await,
        };

        joined.map_err(|e| ExtractionError::Join(e.to_string()))?
    }
}
