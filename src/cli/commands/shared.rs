//! Shared components for CLI commands

use crate::cli::args::LoggingArgs;
use crate::config::StamperConfig;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Filter directive for this crate at `level`
fn crate_directive(level: &str) -> String {
    format!("{}={}", env!("CARGO_CRATE_NAME"), level)
}

/// Install the stderr subscriber; `RUST_LOG` overrides `-v`/`-q`
///
/// Quiet runs get compact lines without timestamps. Otherwise each line
/// carries the time since start.
pub fn setup_logging(args: &LoggingArgs) {
    use tracing_subscriber::{
        EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    };

    let level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(crate_directive(level)));

    let base = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let output = if args.quiet {
        base.compact().without_time().boxed()
    } else {
        base.with_timer(fmt::time::uptime()).boxed()
    };

    // A subscriber may already be installed when commands run in-process
    if tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .is_ok()
    {
        debug!("Logging at level {}", level);
    }
}

/// Default configuration, or the given TOML file layered over it
pub fn load_configuration(path: Option<&Path>) -> Result<StamperConfig> {
    match path {
        Some(path) => StamperConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(StamperConfig::default()),
    }
}

/// Spinner shown while a step runs, hidden in quiet mode
pub fn create_spinner(show: bool, message: &str) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Byte count in B, KB or MB
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let size = bytes as f64;
    if size < KB {
        format!("{bytes} B")
    } else if size < KB * KB {
        format!("{:.1} KB", size / KB)
    } else {
        format!("{:.1} MB", size / (KB * KB))
    }
}
