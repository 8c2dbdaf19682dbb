//! hugo-deps - Analyze Hugo template dependencies
//!
//! Scans a Hugo project's layouts, extracts partial / template / block
//! directives, resolves them to template files, and builds a dependency
//! graph with structural diagnostics (missing targets, cycles, deprecated
//! internal templates).

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;

// Re-export main types
pub use analysis::{AnalysisResult, Analyzer, DependencyGraph};
pub use config::Config;
pub use error::{Error, Result};
