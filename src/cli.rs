use crate::config::Config;
use crate::generator::{FailurePolicy, Generator, GeneratorOptions};
use crate::route::{RouteSource, RouteTable};
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// Scramble - generate an OpenAPI document from a route table and the handler sources
#[derive(Parser, Debug)]
#[command(name = "scramble")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Rust project holding the handlers
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Route manifest (YAML, or JSON when the file ends in .json)
    #[arg(short = 'r', long = "routes", value_name = "FILE")]
    pub routes_path: PathBuf,

    /// Configuration file (defaults apply when omitted)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Leave out routes whose analysis fails instead of aborting
    #[arg(long = "skip-failed")]
    pub skip_failed: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    if !args.routes_path.is_file() {
        anyhow::bail!("Route manifest not found: {}", args.routes_path.display());
    }

    info!("Project path: {}", args.project_path.display());
    info!("Route manifest: {}", args.routes_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let config = match &args.config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let routes = RouteTable::from_file(&args.routes_path)?;
    let route_count = routes.routes().len();
    info!("Loaded {} routes", route_count);

    let options = GeneratorOptions {
        failure_policy: if args.skip_failed {
            FailurePolicy::Skip
        } else {
            FailurePolicy::Abort
        },
        ..GeneratorOptions::default()
    };
    let generator = Generator::new(config, Box::new(routes), vec![args.project_path.clone()])
        .with_options(options);

    info!("Building document...");
    let document = generator.generate()?;

    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document)?,
    };

    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!("Wrote document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Summary:");
    info!("  - Routes registered: {}", route_count);
    info!("  - Operations: {}", document.operations().count());
    info!("  - Webhooks: {}", document.webhooks.len());
    info!("  - Component schemas: {}", document.components.schemas.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("scramble").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_arguments() {
        let args = parse(&["./app", "--routes", "routes.yaml", "-f", "json", "--skip-failed"]);
        assert_eq!(args.project_path, PathBuf::from("./app"));
        assert_eq!(args.routes_path, PathBuf::from("routes.yaml"));
        assert!(matches!(args.output_format, OutputFormat::Json));
        assert!(args.skip_failed);
        assert!(args.config_path.is_none());
    }

    #[test]
    fn test_routes_are_required() {
        assert!(CliArgs::try_parse_from(["scramble", "./app"]).is_err());
    }

    #[test]
    fn test_validation_rejects_missing_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().to_str().unwrap();
        let missing = temp_dir.path().join("routes.yaml");

        let args = parse(&[project, "--routes", missing.to_str().unwrap()]);
        assert!(parse_args_from_parsed(args).is_err());

        fs::write(&missing, "[]").unwrap();
        let args = parse(&[project, "--routes", missing.to_str().unwrap()]);
        assert!(parse_args_from_parsed(args).is_ok());
    }

    #[test]
    fn test_run_writes_document() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("controllers.rs"),
            "pub struct PingController;\nimpl PingController {\n    /// Ping.\n    pub fn show(&self) -> String { String::new() }\n}\n",
        )
        .unwrap();
        let routes = temp_dir.path().join("routes.yaml");
        fs::write(&routes, "- uri: api/ping\n  action: PingController@show\n").unwrap();
        let output = temp_dir.path().join("out").join("openapi.json");

        let args = parse(&[
            temp_dir.path().to_str().unwrap(),
            "--routes",
            routes.to_str().unwrap(),
            "-f",
            "json",
            "-o",
            output.to_str().unwrap(),
        ]);
        run(args).unwrap();

        let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(document["paths"]["/ping"]["get"]["summary"], "Ping.");
    }
}
