//! CLI for hugo-deps

mod args;

pub use args::{Args, Command};

use crate::analysis::{Analyzer, Severity};
use crate::config::{Config, OutputFormat};
use crate::error::{Error, Result};
use crate::output;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Exit code when the analysis itself succeeds but reports error-severity
/// diagnostics, so CI can fail on broken references without treating them
/// like tool crashes
const DIAGNOSTIC_FAILURE: u8 = 2;

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();

    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(args: Args) -> Result<ExitCode> {
    match args.command {
        Command::Analyze {
            path,
            format,
            output,
            ignore,
            config,
            no_modules,
            verbose,
            quiet,
        } => analyze(
            &path, &format, output, ignore, config, no_modules, verbose, quiet,
        ),

        Command::Version => {
            println!("hugo-deps {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn analyze(
    path: &Path,
    format: &str,
    output: Option<PathBuf>,
    ignore: Vec<String>,
    config: Option<PathBuf>,
    no_modules: bool,
    verbose: bool,
    quiet: bool,
) -> Result<ExitCode> {
    let mut cfg = match &config {
        Some(config_path) => Config::load(config_path)?,
        None => Config::load_or_default(Path::new("hugo-deps.toml")),
    };

    let format = parse_format(format)?;
    cfg.merge_cli(Some(format), output, ignore, no_modules);
    cfg.validate()?;

    if !path.exists() {
        return Err(Error::PathNotFound(path.to_path_buf()));
    }

    if verbose && !quiet {
        eprintln!("Analyzing: {}", path.display());
        eprintln!("Format: {:?}", cfg.output.format);
        eprintln!("Modules: {}", cfg.analysis.modules);
        eprintln!("Exclude: {:?}", cfg.analysis.exclude);
    }

    let analyzer = Analyzer::new(cfg.clone()).with_verbose(verbose && !quiet);
    let result = analyzer.analyze(path)?;

    if !quiet {
        let stats = result.graph.stats();
        eprintln!(
            "Analyzed {} templates: {} dependencies, {} diagnostics",
            stats.discovered,
            stats.edges,
            result.diagnostics.len()
        );
        if !result.parse_errors.is_empty() {
            eprintln!("Parse errors ({}):", result.parse_errors.len());
            let mut failed: Vec<_> = result.parse_errors.iter().collect();
            failed.sort();
            for (path, err) in failed.iter().take(5) {
                eprintln!("  {}: {}", path.display(), err);
            }
            if failed.len() > 5 {
                eprintln!("  ... and {} more", failed.len() - 5);
            }
        }
    }

    let rendered = output::render(&result, cfg.output.format)?;
    match &cfg.output.file {
        Some(file) => {
            if let Some(parent) = file.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(file, &rendered)?;
            if !quiet {
                eprintln!("Output written to: {}", file.display());
            }
        }
        None => println!("{rendered}"),
    }

    let has_errors = result
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error);
    if has_errors {
        Ok(ExitCode::from(DIAGNOSTIC_FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    match format {
        "tree" => Ok(OutputFormat::Tree),
        "json" => Ok(OutputFormat::Json),
        "mermaid" => Ok(OutputFormat::Mermaid),
        "dot" => Ok(OutputFormat::Dot),
        other => Err(Error::other(format!(
            "Unknown format: {other} (expected tree, json, mermaid, or dot)"
        ))),
    }
}
