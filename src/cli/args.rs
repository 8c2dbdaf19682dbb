//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Map Hugo template dependencies
#[derive(Parser, Debug)]
#[command(name = "hugo-deps")]
#[command(about = "Analyze Hugo template dependencies")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a Hugo project and print its template dependency graph
    Analyze {
        /// Path to the Hugo project (or a layouts directory)
        path: PathBuf,

        /// Output format (tree, json, mermaid, dot)
        #[arg(long, default_value = "tree")]
        format: String,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Glob patterns to exclude (can be repeated)
        #[arg(long)]
        ignore: Vec<String>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip Hugo module configuration
        #[arg(long)]
        no_modules: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Suppress status output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show version information
    Version,
}
