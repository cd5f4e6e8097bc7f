//! Command implementations for the payroll stamper CLI
//!
//! Each subcommand lives in its own module; this module only dispatches.

pub mod layout;
pub mod process;
pub mod shared;

use crate::cli::args::{Args, Commands};
use anyhow::Result;

/// Run the subcommand selected on the command line
pub fn run(args: Args) -> Result<()> {
    match args.command {
        Commands::Process(process_args) => process::run_process(process_args),
        Commands::Layout(layout_args) => layout::run_layout(layout_args),
    }
}
