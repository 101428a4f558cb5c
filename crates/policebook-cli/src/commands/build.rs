//! Build command - generate one police book workbook per year.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use policebook_core::ledger::list_subdirs;
use policebook_core::{
    BookError, FailurePolicy, MonthAggregator, PdfFragmentExtractor, PolicebookConfig,
    WorkbookWriter, YearAggregator, YearLedger,
};

/// Arguments for the build command.
#[derive(Args)]
pub struct BuildArgs {
    /// Root directory holding one directory per year
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Year directory to process (repeatable; default: every year directory)
    #[arg(short, long = "year")]
    years: Vec<String>,

    /// Output directory for the workbooks
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Skip unreadable receipts instead of failing their year
    #[arg(long)]
    collect_defects: bool,

    /// Write skipped receipts and failed years to this CSV file
    #[arg(long)]
    defects_csv: Option<PathBuf>,

    /// First sequence number
    #[arg(long)]
    start: Option<u32>,

    /// Restart numbering at the first sequence number every year
    #[arg(long)]
    restart_per_year: bool,

    /// Number of receipts extracted at once per month
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

/// One line of the defects report.
struct DefectRow {
    year: String,
    document: PathBuf,
    error: String,
}

pub async fn run(args: BuildArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = super::load_config(config_path)?;
    apply_overrides(&mut config, &args);

    let years = select_years(&config).await?;
    if years.is_empty() {
        anyhow::bail!("No year directories found in {}", config.input.root.display());
    }

    println!(
        "{} Building {} year(s) from {}",
        style("ℹ").blue(),
        years.len(),
        config.input.root.display()
    );

    let source = Arc::new(PdfFragmentExtractor::new().with_mode(config.extraction.mode));
    let months = MonthAggregator::from_config(source, &config)?;
    let writer = WorkbookWriter::new().with_password(config.workbook.resolved_password());

    let mut sequence = config.aggregation.starting_sequence;
    let mut defects = Vec::new();
    let mut failed = Vec::new();

    for year in &years {
        let spinner = spinner(format!("{}: reading receipts...", year))?;
        let year_dir = config.year_dir(year);
        let tick = spinner.clone();
        let aggregator = YearAggregator::new(
            months
                .clone()
                .on_document(Arc::new(move |_: &Path| tick.inc(1))),
        )
        .with_sheet_labels(config.workbook.sheet_labels);

        let result = match aggregator.aggregate(&year_dir, sequence).await {
            Ok(ledger) => {
                spinner.set_message(format!("{}: writing workbook...", year));
                let output = config.workbook_path(year);
                writer.write(&ledger, &output).map(|()| (ledger, output))
            }
            Err(e) => Err(e),
        };
        spinner.finish_and_clear();

        match result {
            Ok((ledger, output)) => {
                report_year(&ledger, &output);
                defects.extend(defect_rows(&ledger));
                if config.aggregation.continuous_numbering {
                    sequence = ledger.next_sequence;
                }
            }
            Err(e) => {
                error!("Year {} failed: {}", year, e);
                println!("{} {}: {}", style("✗").red(), year, e);
                failed.push(DefectRow {
                    year: year.clone(),
                    document: failed_document(&e, &year_dir),
                    error: e.to_string(),
                });
            }
        }
    }

    if let Some(path) = &args.defects_csv {
        write_defects(path, defects.iter().chain(&failed))?;
        println!(
            "{} Defects written to {}",
            style("✓").green(),
            path.display()
        );
    } else if !defects.is_empty() {
        warn!("{} receipts skipped; use --defects-csv to list them", defects.len());
    }

    println!();
    println!(
        "{} Processed {} year(s) in {:?}",
        style("✓").green(),
        years.len(),
        start.elapsed()
    );
    println!(
        "   {} written, {} failed, {} receipts skipped",
        style(years.len() - failed.len()).green(),
        style(failed.len()).red(),
        style(defects.len()).yellow()
    );

    if !failed.is_empty() {
        anyhow::bail!("{} of {} year(s) failed", failed.len(), years.len());
    }

    Ok(())
}

fn apply_overrides(config: &mut PolicebookConfig, args: &BuildArgs) {
    if let Some(root) = &args.root {
        config.input.root = root.clone();
    }
    if !args.years.is_empty() {
        config.input.years = args.years.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.workbook.output_dir = output_dir.clone();
    }
    if args.collect_defects {
        config.aggregation.failure_policy = FailurePolicy::CollectDefects;
    }
    if let Some(start) = args.start {
        config.aggregation.starting_sequence = start;
    }
    if args.restart_per_year {
        config.aggregation.continuous_numbering = false;
    }
    if let Some(jobs) = args.jobs {
        config.extraction.jobs = jobs;
    }
}

/// Configured years, or every directory under the root.
async fn select_years(config: &PolicebookConfig) -> anyhow::Result<Vec<String>> {
    if !config.input.years.is_empty() {
        return Ok(config.input.years.clone());
    }

    let years: Vec<String> = list_subdirs(&config.input.root)
        .await?
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    debug!("Discovered years: {:?}", years);
    Ok(years)
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg} ({pos} receipts)")?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn report_year(ledger: &YearLedger, output: &Path) {
    let numbers = match (ledger.record_count(), ledger.next_sequence) {
        (0, _) => "no purchases".to_string(),
        (n, next) => format!("n° {} to {}", next - n as u32, next - 1),
    };

    println!(
        "{} {}: {} month(s), {} purchase(s) ({}) -> {}",
        style("✓").green(),
        ledger.year,
        ledger.months.len(),
        ledger.record_count(),
        numbers,
        output.display()
    );

    for defect in &ledger.defects {
        println!("  {} {}", style("!").yellow(), defect);
    }
}

fn defect_rows(ledger: &YearLedger) -> Vec<DefectRow> {
    ledger
        .defects
        .iter()
        .map(|defect| DefectRow {
            year: ledger.year.clone(),
            document: defect.path.clone(),
            error: defect.error.to_string(),
        })
        .collect()
}

fn failed_document(error: &BookError, year_dir: &Path) -> PathBuf {
    match error {
        BookError::Document(defect) => defect.path.clone(),
        BookError::Io { path, .. } => path.clone(),
        _ => year_dir.to_path_buf(),
    }
}

fn write_defects<'a>(
    path: &Path,
    rows: impl Iterator<Item = &'a DefectRow>,
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["year", "document", "error"])?;
    for row in rows {
        wtr.write_record([
            row.year.as_str(),
            &row.document.display().to_string(),
            row.error.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
