//! Process command - post-process a single extraction-dump file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use poex_core::{DumpSource, MemoryStore, PODocument, PageSource, Pipeline, ReferenceCatalog};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input extraction-dump file (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Reference catalog CSV
    #[arg(short = 'r', long)]
    catalog: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show rejected page groups and their reasons
    #[arg(long)]
    show_rejections: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output (one row per document)
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let catalog = ReferenceCatalog::from_path(&args.catalog)?;
    let source = DumpSource::from_path(&args.input)?;
    let store = MemoryStore::new();

    let pb = ProgressBar::new(source.total_pages() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} pages")
            .unwrap()
            .progress_chars("##-"),
    );

    let pipeline = Pipeline::new(&catalog, &config, &store);
    let outcome = pipeline.process_file(
        &source,
        |done, _total| pb.set_position(done as u64),
        |document| {
            debug!(
                po_number = document.po_number.as_deref().unwrap_or("<none>"),
                "document finalized"
            );
        },
    )?;

    pb.finish_with_message("Done");

    if outcome.duplicate_file {
        eprintln!(
            "{} This file's content hash was processed before",
            style("⚠").yellow()
        );
    }

    let output = format_documents(&outcome.documents, args.format)?;

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

    if args.show_rejections && !outcome.rejected.is_empty() {
        eprintln!("{}", style("Rejected groups:").yellow());
        for reason in &outcome.rejected {
            eprintln!("  - {}", reason);
        }
    }

    if !outcome.page_errors.is_empty() {
        eprintln!("{}", style("Failed pages:").red());
        for error in &outcome.page_errors {
            eprintln!("  - page {}: {}", error.page, error.message);
        }
    }

    println!();
    println!(
        "{} {} document(s), {} rejected, {} flagged",
        style("✓").green(),
        outcome.documents.len(),
        outcome.rejected.len(),
        outcome.documents.iter().filter(|d| d.is_flagged).count()
    );

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_documents(documents: &[PODocument], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(documents)?),
        OutputFormat::Csv => format_csv(documents),
        OutputFormat::Text => Ok(format_text(documents)),
    }
}

fn format_csv(documents: &[PODocument]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "po_number",
        "retailer",
        "debtor_code",
        "branch_code",
        "po_date",
        "currency",
        "total_amount",
        "items",
        "reliability_score",
        "flagged",
        "flag_reason",
    ])?;

    for doc in documents {
        wtr.write_record([
            doc.po_number.clone().unwrap_or_default(),
            doc.retailer_name_standardized.clone().unwrap_or_default(),
            doc.debtor_code.clone().unwrap_or_default(),
            doc.branch_code.clone().unwrap_or_default(),
            doc.po_date.map(|d| d.to_string()).unwrap_or_default(),
            doc.currency.clone(),
            doc.total_amount.to_string(),
            doc.items.len().to_string(),
            doc.reliability_score.to_string(),
            doc.is_flagged.to_string(),
            doc.flag_reason.clone().unwrap_or_default(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(documents: &[PODocument]) -> String {
    let mut output = String::new();

    for doc in documents {
        output.push_str(&format!(
            "PO: {}\n",
            doc.po_number.as_deref().unwrap_or("<none>")
        ));
        output.push_str(&format!(
            "Retailer: {}\n",
            doc.retailer_name_standardized.as_deref().unwrap_or("<unmatched>")
        ));
        if let Some(debtor) = &doc.debtor_code {
            output.push_str(&format!("Debtor code: {}\n", debtor));
        }
        if let Some(date) = doc.po_date {
            output.push_str(&format!("Date: {}\n", date));
        }
        output.push_str(&format!(
            "Total: {} {}\n",
            doc.total_amount, doc.currency
        ));
        output.push_str(&format!("Items: {}\n", doc.items.len()));
        output.push_str(&format!("Match score: {}\n", doc.reliability_score));
        if doc.is_flagged {
            output.push_str(&format!(
                "Flagged: {}\n",
                doc.flag_reason.as_deref().unwrap_or("")
            ));
        }
        if doc.already_exists {
            output.push_str(&format!(
                "Duplicate: {}\n",
                doc.duplicate_message.as_deref().unwrap_or("")
            ));
        }
        output.push('\n');
    }

    if documents.is_empty() {
        output.push_str("No purchase orders found.\n");
    }

    output
}
