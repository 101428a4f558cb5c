//! Parse command - read a single receipt.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use policebook_core::pdf::FragmentSource;
use policebook_core::receipt::rules::format_siren;
use policebook_core::{DocumentDefect, PdfFragmentExtractor, PurchaseRecord, ReceiptParser};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Receipt PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Print the raw page-1 fragments instead of the record
    #[arg(long)]
    fragments: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Parsing file: {}", args.input.display());

    let extractor = PdfFragmentExtractor::new().with_mode(config.extraction.mode);
    let fragments = extractor
        .fragments(&args.input)
        .map_err(|e| DocumentDefect::new(&args.input, e))?;
    debug!("{} fragments", fragments.len());

    let output = if args.fragments {
        format_fragments(&fragments, args.format)?
    } else {
        let parser = ReceiptParser::new()
            .with_ordering(config.parsing.ordering)
            .with_siren_validation(config.parsing.validate_siren);
        let record = parser
            .parse(&fragments)
            .map_err(|e| DocumentDefect::new(&args.input, e))?
            .with_source(&args.input);
        format_record(&record, args.format)?
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_fragments(fragments: &[String], format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(fragments)?,
        OutputFormat::Text => fragments
            .iter()
            .enumerate()
            .map(|(i, fragment)| format!("{:>3}  {}", i, fragment))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

fn format_record(record: &PurchaseRecord, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(record)?,
        OutputFormat::Text => format_record_text(record),
    })
}

fn format_record_text(record: &PurchaseRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("Entry: {} {}\n", record.entry_date, record.entry_time));
    output.push_str(&format!("Buyer: {}\n", record.buyer_name()));
    if let Some(siren) = record.tax_id() {
        output.push_str(&format!("SIREN: {}\n", format_siren(siren)));
    }
    output.push_str(&format!("Registration: {}\n", record.registration_number));
    output.push_str(&format!("VIN: {}", record.vin));

    output
}
