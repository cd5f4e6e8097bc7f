//! Command-line argument definitions for the payroll stamper
//!
//! Defines the CLI with the clap derive API and turns parsed arguments
//! into a [`StamperConfig`].

use crate::config::{OverflowPolicy, StamperConfig};
use crate::constants::DEFAULT_OUTPUT_DIR;
use crate::models::NameMatching;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stamp per-driver payroll workbooks from a trip log
///
/// Reads a trip-log workbook, groups trips by driver, and fills one copy
/// of a payroll template per driver.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "payroll-stamper",
    version,
    about = "Split a trip-log workbook into per-driver payroll workbooks"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Stamp a trip log into per-driver payroll workbooks
    Process(ProcessArgs),
    /// Print the effective template layout as TOML
    Layout(LayoutArgs),
}

/// Arguments for the process command
#[derive(Debug, Clone, Parser)]
pub struct ProcessArgs {
    /// Trip-log workbook (first worksheet is read)
    #[arg(short = 'i', long = "input", value_name = "XLSX")]
    pub input: PathBuf,

    /// Payroll template workbook
    #[arg(short = 't', long = "template", value_name = "XLSX")]
    pub template: PathBuf,

    /// Directory receiving one workbook per driver
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Also bundle all workbooks into this zip archive
    #[arg(long = "archive", value_name = "ZIP")]
    pub archive: Option<PathBuf>,

    /// Only write the zip archive, not the individual workbooks
    #[arg(long = "archive-only", requires = "archive")]
    pub archive_only: bool,

    /// TOML file overriding rows, layout, and grouping settings
    #[arg(short = 'c', long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Group drivers by raw name instead of trimmed, case-folded name
    #[arg(long = "exact-names")]
    pub exact_names: bool,

    /// Last template row a stepped trip id may be written to
    #[arg(long = "max-trip-row", value_name = "ROW")]
    pub max_trip_row: Option<u32>,

    /// What to do with trips past --max-trip-row
    #[arg(long = "on-overflow", value_enum, default_value_t = Overflow::Truncate)]
    pub on_overflow: Overflow,

    /// Do not stamp run date and pay period
    #[arg(long = "no-pay-period")]
    pub no_pay_period: bool,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

/// Arguments for the layout command
#[derive(Debug, Clone, Parser)]
pub struct LayoutArgs {
    /// Show the layout after applying this TOML file
    #[arg(short = 'c', long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct LoggingArgs {
    /// Increase logging verbosity
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl LoggingArgs {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

/// Overflow policy as spelled on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Overflow {
    /// Skip trips that do not fit and warn
    Truncate,
    /// Abort the run
    Fail,
}

impl From<Overflow> for OverflowPolicy {
    fn from(value: Overflow) -> Self {
        match value {
            Overflow::Truncate => OverflowPolicy::Truncate,
            Overflow::Fail => OverflowPolicy::Fail,
        }
    }
}

impl ProcessArgs {
    /// Apply command-line overrides on top of a base configuration
    pub fn apply_to(&self, mut config: StamperConfig) -> StamperConfig {
        if self.exact_names {
            config = config.with_name_matching(NameMatching::Exact);
        }
        if let Some(last_trip_row) = self.max_trip_row {
            config = config.with_capacity(last_trip_row, self.on_overflow.into());
        }
        if self.no_pay_period {
            config = config.without_pay_period();
        }
        config
    }
}
