//! Scramble - command-line tool generating an OpenAPI document.
//!
//! # Usage
//!
//! ```bash
//! scramble [OPTIONS] --routes <FILE> <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! scramble ./my-api --routes routes.yaml -o openapi.yaml
//! ```
//!
//! Generate JSON with a configuration file, skipping routes that fail:
//! ```bash
//! scramble ./my-api --routes routes.yaml --config scramble.yaml -f json --skip-failed
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use scramble::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Scramble starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("Document generation completed successfully");

    Ok(())
}
