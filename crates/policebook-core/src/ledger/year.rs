//! Year aggregation and sequence numbering.

use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::future::try_join_all;
use tracing::{debug, info};

use super::{list_subdirs, MonthAggregator, SheetLabels};
use crate::error::{BookError, DocumentDefect, Result};
use crate::models::record::SequencedPurchase;

/// Numbered rows of one month worksheet.
#[derive(Debug)]
pub struct MonthSheet {
    /// Worksheet name.
    pub label: String,
    /// Month directory the rows came from.
    pub directory: PathBuf,
    /// Rows in ascending ordering-key order.
    pub rows: Vec<SequencedPurchase>,
}

/// Everything needed to write one year workbook.
#[derive(Debug)]
pub struct YearLedger {
    /// Year directory name.
    pub year: String,
    /// Months in discovery order.
    pub months: Vec<MonthSheet>,
    /// Documents skipped under `FailurePolicy::CollectDefects`.
    pub defects: Vec<DocumentDefect>,
    /// First sequence number after the last row.
    pub next_sequence: u32,
}

impl YearLedger {
    pub fn record_count(&self) -> usize {
        self.months.iter().map(|m| m.rows.len()).sum()
    }

    /// No document of the year was skipped.
    pub fn is_complete(&self) -> bool {
        self.defects.is_empty()
    }
}

/// Aggregates every month of a year directory and numbers the rows.
#[derive(Clone)]
pub struct YearAggregator {
    months: MonthAggregator,
    labels: SheetLabels,
}

impl YearAggregator {
    pub fn new(months: MonthAggregator) -> Self {
        Self {
            months,
            labels: SheetLabels::default(),
        }
    }

    /// Set how worksheets are named.
    pub fn with_sheet_labels(mut self, labels: SheetLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Aggregate `year_dir`, numbering rows from `starting_sequence`.
    pub async fn aggregate(&self, year_dir: &Path, starting_sequence: u32) -> Result<YearLedger> {
        let start = Instant::now();
        let year = year_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let month_dirs = list_subdirs(year_dir).await?;
        debug!("{}: {} month directories", year, month_dirs.len());

        let outcomes = try_join_all(
            month_dirs
                .iter()
                .map(|(_, path)| self.months.aggregate(path)),
        )
        .await?;

        let overflow = |records: usize| BookError::SequenceOverflow {
            start: starting_sequence,
            records,
        };

        let mut sequence = starting_sequence;
        let mut numbered = 0;
        let mut months = Vec::with_capacity(outcomes.len());
        let mut defects = Vec::new();

        for (index, ((name, directory), outcome)) in month_dirs.into_iter().zip(outcomes).enumerate() {
            let label = match self.labels {
                SheetLabels::Directory => name,
                SheetLabels::Index => (index + 1).to_string(),
            };

            let mut rows = Vec::with_capacity(outcome.records.len());
            for record in outcome.records {
                rows.push(SequencedPurchase::new(sequence, record));
                numbered += 1;
                sequence = sequence.checked_add(1).ok_or_else(|| overflow(numbered))?;
            }

            defects.extend(outcome.defects);
            months.push(MonthSheet {
                label,
                directory,
                rows,
            });
        }

        let ledger = YearLedger {
            year,
            months,
            defects,
            next_sequence: sequence,
        };

        info!(
            "{}: {} records in {} months ({} defects) in {:?}",
            ledger.year,
            ledger.record_count(),
            ledger.months.len(),
            ledger.defects.len(),
            start.elapsed()
        );
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testing::{page, touch, FakeSource};
    use crate::ledger::FailurePolicy;
    use crate::receipt::ReceiptParser;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn year_tree() -> (tempfile::TempDir, FakeSource) {
        let root = tempfile::tempdir().unwrap();
        let year = root.path().join("2021");
        touch(&year.join("1"), &["a.pdf", "b.pdf"]);
        touch(&year.join("2"), &["c.pdf"]);
        touch(&year.join("10"), &["d.pdf", "e.pdf"]);
        std::fs::create_dir_all(year.join("3")).unwrap();

        let source = FakeSource::new()
            .with_page("a.pdf", page("JAN LATE", "20/01/2021", "16h00"))
            .with_page("b.pdf", page("JAN EARLY", "03/01/2021", "09h00"))
            .with_page("c.pdf", page("FEB", "11/02/2021", "11h11"))
            .with_page("d.pdf", page("OCT EARLY", "01/10/2021", "08h00"))
            .with_page("e.pdf", page("OCT LATE", "01/10/2021", "08h01"));
        (root, source)
    }

    fn aggregator(source: FakeSource) -> YearAggregator {
        YearAggregator::new(MonthAggregator::new(Arc::new(source), ReceiptParser::new()))
    }

    #[tokio::test]
    async fn test_contiguous_numbering_across_months() {
        let (root, source) = year_tree();

        let ledger = aggregator(source)
            .aggregate(&root.path().join("2021"), 1)
            .await
            .unwrap();

        assert_eq!(ledger.year, "2021");
        let labels: Vec<&str> = ledger.months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "3", "10"]);

        let numbered: Vec<(u32, &str)> = ledger
            .months
            .iter()
            .flat_map(|m| m.rows.iter())
            .map(|r| (r.sequence_number(), r.record().buyer_name()))
            .collect();
        assert_eq!(
            numbered,
            vec![
                (1, "JAN EARLY"),
                (2, "JAN LATE"),
                (3, "FEB"),
                (4, "OCT EARLY"),
                (5, "OCT LATE"),
            ]
        );
        assert!(ledger.months[2].rows.is_empty());
        assert_eq!(ledger.next_sequence, 6);
        assert_eq!(ledger.record_count(), 5);
        assert!(ledger.is_complete());
    }

    #[tokio::test]
    async fn test_numbering_continues_from_start() {
        let (root, source) = year_tree();

        let ledger = aggregator(source)
            .aggregate(&root.path().join("2021"), 120)
            .await
            .unwrap();

        let first = &ledger.months[0].rows[0];
        assert_eq!(first.sequence_number(), 120);
        assert_eq!(ledger.next_sequence, 125);
    }

    #[tokio::test]
    async fn test_sequence_overflow_is_an_error() {
        let (root, source) = year_tree();

        let err = aggregator(source)
            .aggregate(&root.path().join("2021"), u32::MAX - 1)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BookError::SequenceOverflow {
                start,
                records: 2,
            } if start == u32::MAX - 1
        ));
    }

    #[tokio::test]
    async fn test_numbering_up_to_the_last_representable_value() {
        let (root, source) = year_tree();

        // five records numbered MAX-5 ..= MAX-1, next is MAX
        let ledger = aggregator(source)
            .aggregate(&root.path().join("2021"), u32::MAX - 5)
            .await
            .unwrap();
        assert_eq!(ledger.next_sequence, u32::MAX);
    }

    #[tokio::test]
    async fn test_index_labels() {
        let (root, source) = year_tree();

        let ledger = aggregator(source)
            .with_sheet_labels(SheetLabels::Index)
            .aggregate(&root.path().join("2021"), 1)
            .await
            .unwrap();

        let labels: Vec<&str> = ledger.months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "3", "4"]);
        assert_eq!(ledger.months[3].directory, root.path().join("2021").join("10"));
    }

    #[tokio::test]
    async fn test_failing_month_fails_year() {
        let (root, source) = year_tree();
        touch(&root.path().join("2021").join("2"), &["broken.pdf"]);

        let err = aggregator(source)
            .aggregate(&root.path().join("2021"), 1)
            .await
            .unwrap_err();

        match err {
            BookError::Document(defect) => {
                assert!(defect.path.ends_with("2/broken.pdf"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_collected_defects_do_not_consume_numbers() {
        let (root, source) = year_tree();
        touch(&root.path().join("2021").join("2"), &["broken.pdf"]);

        let months = MonthAggregator::new(Arc::new(source), ReceiptParser::new())
            .with_failure_policy(FailurePolicy::CollectDefects);
        let ledger = YearAggregator::new(months)
            .aggregate(&root.path().join("2021"), 1)
            .await
            .unwrap();

        assert_eq!(ledger.record_count(), 5);
        assert_eq!(ledger.next_sequence, 6);
        assert_eq!(ledger.defects.len(), 1);
        assert!(!ledger.is_complete());
    }

    #[tokio::test]
    async fn test_missing_year_dir() {
        let (root, source) = year_tree();

        let err = aggregator(source)
            .aggregate(&root.path().join("1999"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::Io { .. }));
    }
}
