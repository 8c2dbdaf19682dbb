// Output formatting for analysis results

pub mod diagrams;
pub mod json;
pub mod tree;

pub use diagrams::*;
pub use json::*;
pub use tree::*;

use crate::analysis::AnalysisResult;
use crate::config::OutputFormat;
use crate::error::Result;

/// Render an analysis result in the requested format
pub fn render(result: &AnalysisResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Tree => Ok(TreeFormatter::new().format(result)),
        OutputFormat::Json => JsonFormatter::new().format(result),
        OutputFormat::Mermaid => Ok(MermaidFormatter::new().format(result)),
        OutputFormat::Dot => Ok(DotFormatter::new().format(result)),
    }
}
