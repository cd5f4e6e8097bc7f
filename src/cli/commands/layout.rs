//! Layout command: print the effective configuration as TOML

use super::shared::{load_configuration, setup_logging};
use crate::cli::args::LayoutArgs;
use anyhow::{Context, Result};

pub fn run_layout(args: LayoutArgs) -> Result<()> {
    setup_logging(&args.logging);

    let config = load_configuration(args.config.as_deref())?;
    let toml = config
        .to_toml_string()
        .context("Failed to render configuration")?;
    print!("{}", toml);
    Ok(())
}
