//! Batch command - background processing of multiple extraction dumps.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use poex_core::batch::{BatchCoordinator, BatchState, BatchStatus};
use poex_core::{MemoryStore, PODocument, ReferenceCatalog};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Reference catalog CSV
    #[arg(short = 'r', long)]
    catalog: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: super::process::OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Status poll interval in milliseconds
    #[arg(long, default_value = "100")]
    poll_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = super::load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("json")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let catalog = ReferenceCatalog::from_path(&args.catalog)?;
    let coordinator = BatchCoordinator::new(
        Arc::new(catalog),
        Arc::new(config),
        Arc::new(MemoryStore::new()),
    );

    // Spawn one background batch per file, then poll until all terminal.
    let mut batches: Vec<(PathBuf, String)> = Vec::with_capacity(files.len());
    for path in &files {
        let id = coordinator.spawn(path.clone())?;
        debug!(batch = %id, path = %path.display(), "spawned");
        batches.push((path.clone(), id));
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut final_states: Vec<Option<BatchState>> = vec![None; batches.len()];
    while final_states.iter().any(Option::is_none) {
        for (i, (_, id)) in batches.iter().enumerate() {
            if final_states[i].is_some() {
                continue;
            }
            let state = coordinator.status(id)?;
            if matches!(state.status, BatchStatus::Done | BatchStatus::Error) {
                overall_pb.inc(1);
                final_states[i] = Some(state);
            }
        }
        tokio::time::sleep(Duration::from_millis(args.poll_ms)).await;
    }

    overall_pb.finish_with_message("Complete");

    let mut results: Vec<(PathBuf, BatchState)> = Vec::with_capacity(batches.len());
    for ((path, _), state) in batches.into_iter().zip(final_states) {
        if let Some(state) = state {
            results.push((path, state));
        }
    }

    // Write per-file outputs
    for (path, state) in &results {
        if state.status == BatchStatus::Error {
            warn!(path = %path.display(), error = ?state.error, "file failed");
            continue;
        }
        if let Some(output_dir) = &args.output_dir {
            let output_name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("po");
            let extension = match args.format {
                super::process::OutputFormat::Json => "json",
                super::process::OutputFormat::Csv => "csv",
                super::process::OutputFormat::Text => "txt",
            };
            let output_path = output_dir.join(format!("{}.{}", output_name, extension));
            let content = super::process::format_documents(&state.pos, args.format)?;
            fs::write(&output_path, content)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    // Generate summary if requested
    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    // Print summary
    let succeeded = results
        .iter()
        .filter(|(_, s)| s.status == BatchStatus::Done)
        .count();
    let failed = results.len() - succeeded;
    let documents: usize = results.iter().map(|(_, s)| s.pos.len()).sum();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} documents",
        style(succeeded).green(),
        style(failed).red(),
        documents
    );

    let failures: Vec<_> = results
        .iter()
        .filter(|(_, s)| s.status == BatchStatus::Error)
        .collect();
    if !failures.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for (path, state) in failures {
            println!(
                "  - {}: {}",
                path.display(),
                state.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// One summary row per finalized document across all files.
fn write_summary(path: &PathBuf, results: &[(PathBuf, BatchState)]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "po_number",
        "retailer",
        "debtor_code",
        "po_date",
        "total_amount",
        "currency",
        "items",
        "score",
        "flagged",
        "error",
    ])?;

    for (path, state) in results {
        let filename = path.file_name().and_then(|s| s.to_str()).unwrap_or("");

        if state.status == BatchStatus::Error {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                state.error.as_deref().unwrap_or(""),
            ])?;
            continue;
        }

        for doc in &state.pos {
            write_document_row(&mut wtr, filename, doc)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

fn write_document_row(
    wtr: &mut csv::Writer<fs::File>,
    filename: &str,
    doc: &PODocument,
) -> anyhow::Result<()> {
    wtr.write_record([
        filename.to_string(),
        "success".to_string(),
        doc.po_number.clone().unwrap_or_default(),
        doc.retailer_name_standardized.clone().unwrap_or_default(),
        doc.debtor_code.clone().unwrap_or_default(),
        doc.po_date.map(|d| d.to_string()).unwrap_or_default(),
        doc.total_amount.to_string(),
        doc.currency.clone(),
        doc.items.len().to_string(),
        doc.reliability_score.to_string(),
        doc.is_flagged.to_string(),
        String::new(),
    ])?;
    Ok(())
}
