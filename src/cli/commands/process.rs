//! Process command implementation
//!
//! Loads the trip log and template, runs one stamping batch, delivers the
//! per-driver workbooks, and prints a summary.

use super::shared::{create_spinner, format_size, load_configuration, setup_logging};
use crate::cli::args::ProcessArgs;
use crate::grid::InputGrid;
use crate::models::BatchStats;
use crate::processor::BatchProcessor;
use crate::processor::delivery::{RenderedOutput, render_outputs, write_archive, write_outputs};
use crate::template::Template;
use anyhow::{Context, Result};
use colored::*;
use indicatif::HumanDuration;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Where the workbooks of a run ended up
#[derive(Debug, Default)]
struct DeliveryReport {
    files: Vec<PathBuf>,
    archive: Option<PathBuf>,
    total_bytes: u64,
}

pub fn run_process(args: ProcessArgs) -> Result<()> {
    let start_time = Instant::now();
    setup_logging(&args.logging);

    info!("Starting payroll stamper");
    debug!("Command line arguments: {:?}", args);

    let config = args.apply_to(load_configuration(args.config.as_deref())?);
    debug!("Effective configuration: {:?}", config);
    let processor = BatchProcessor::new(config).context("Invalid configuration")?;

    let spinner = create_spinner(args.logging.show_progress(), "Reading trip log...");
    let grid = InputGrid::open(&args.input)
        .with_context(|| format!("Failed to read trip log {}", args.input.display()))?;

    if let Some(pb) = &spinner {
        pb.set_message("Loading template...");
    }
    let template = Template::open(&args.template)
        .with_context(|| format!("Failed to load template {}", args.template.display()))?;

    if let Some(pb) = &spinner {
        pb.set_message(format!("Stamping {} rows...", grid.row_count()));
    }
    let batch = processor.run(&grid, &template).context("Stamping failed")?;

    if let Some(pb) = &spinner {
        pb.set_message(format!("Writing {} workbooks...", batch.len()));
    }
    let outputs = render_outputs(&batch).context("Failed to render workbooks")?;
    let report = deliver(&args, &outputs)?;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if !args.logging.quiet {
        print_summary(batch.stats(), &report, start_time.elapsed());
    }
    Ok(())
}

fn deliver(args: &ProcessArgs, outputs: &[RenderedOutput]) -> Result<DeliveryReport> {
    let mut report = DeliveryReport {
        total_bytes: outputs.iter().map(|o| o.bytes.len() as u64).sum(),
        ..Default::default()
    };

    if !args.archive_only {
        report.files = write_outputs(outputs, &args.output_dir).with_context(|| {
            format!("Failed to write workbooks to {}", args.output_dir.display())
        })?;
    }
    if let Some(archive) = &args.archive {
        report.archive = Some(
            write_archive(outputs, archive)
                .with_context(|| format!("Failed to write archive {}", archive.display()))?,
        );
    }
    Ok(report)
}

fn print_summary(stats: &BatchStats, report: &DeliveryReport, elapsed: Duration) {
    println!("\n{}", "Payroll stamping complete".bright_green().bold());
    println!(
        "  {} {}",
        "Records stamped:".bright_cyan(),
        stats.records_processed.to_string().bright_white().bold()
    );
    println!(
        "  {} {}",
        "Drivers:".bright_cyan(),
        stats.drivers.to_string().bright_white().bold()
    );
    println!("  {} {}", "Rows read:".bright_cyan(), stats.rows_read);
    if stats.empty_rows_skipped > 0 {
        println!(
            "  {} {}",
            "Empty rows skipped:".bright_cyan(),
            stats.empty_rows_skipped
        );
    }
    if stats.records_truncated > 0 {
        println!(
            "  {} {}",
            "Trips over template capacity:".bright_yellow(),
            stats.records_truncated.to_string().bright_yellow().bold()
        );
    }
    println!(
        "  {} {}",
        "Output size:".bright_cyan(),
        format_size(report.total_bytes)
    );
    println!("  {} {}", "Time:".bright_cyan(), HumanDuration(elapsed));

    if !report.files.is_empty() {
        println!("\n{}", "Workbooks:".bright_cyan());
        for path in &report.files {
            println!("  {}", path.display());
        }
    }
    if let Some(archive) = &report.archive {
        println!("\n{} {}", "Archive:".bright_cyan(), archive.display());
    }
}
