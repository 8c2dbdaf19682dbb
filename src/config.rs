use crate::error::{Error, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub description: Option<String>,
}

/// Analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Glob patterns (relative to the layouts root) to skip during discovery
    pub exclude: Vec<String>,
    /// Read Hugo module configuration for path rewrites
    pub modules: bool,
    pub follow_links: bool,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Write to this file instead of stdout
    pub file: Option<PathBuf>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Tree,
    Json,
    Mermaid,
    Dot,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Untitled Site".to_string(),
            description: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            exclude: vec![
                ".git/**".to_string(),
                "node_modules/**".to_string(),
                "public/**".to_string(),
                "resources/**".to_string(),
            ],
            modules: true,
            follow_links: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            file: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file or return defaults
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        output_file: Option<PathBuf>,
        ignore: Vec<String>,
        no_modules: bool,
    ) {
        if let Some(fmt) = format {
            self.output.format = fmt;
        }
        if output_file.is_some() {
            self.output.file = output_file;
        }
        if !ignore.is_empty() {
            self.analysis.exclude.extend(ignore);
        }
        if no_modules {
            self.analysis.modules = false;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.analysis.exclude {
            Pattern::new(pattern)
                .map_err(|e| Error::config_validation(format!("bad exclude pattern '{pattern}': {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.project.name, "Untitled Site");
        assert!(config.analysis.modules);
        assert_eq!(config.output.format, OutputFormat::Tree);
        assert!(config.output.file.is_none());
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[project]
name = "My Site"

[analysis]
modules = false
exclude = ["themes/vendor/**"]

[output]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.project.name, "My Site");
        assert!(!config.analysis.modules);
        assert_eq!(config.analysis.exclude, vec!["themes/vendor/**"]);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load(Path::new("/nonexistent/config.toml")).is_err());
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.project.name, "Untitled Site");
    }

    #[test]
    fn test_validation_rejects_bad_pattern() {
        let mut config = Config::default();
        config.analysis.exclude.push("[unclosed".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_cli_format() {
        let mut config = Config::default();
        config.merge_cli(Some(OutputFormat::Mermaid), None, vec![], false);
        assert_eq!(config.output.format, OutputFormat::Mermaid);
    }

    #[test]
    fn test_merge_cli_ignore_extends() {
        let mut config = Config::default();
        let initial = config.analysis.exclude.len();
        config.merge_cli(None, None, vec!["drafts/**".to_string()], false);
        assert_eq!(config.analysis.exclude.len(), initial + 1);
    }

    #[test]
    fn test_merge_cli_no_modules() {
        let mut config = Config::default();
        config.merge_cli(None, None, vec![], true);
        assert!(!config.analysis.modules);
    }

    #[test]
    fn test_merge_cli_output_file() {
        let mut config = Config::default();
        config.merge_cli(None, Some(PathBuf::from("graph.json")), vec![], false);
        assert_eq!(config.output.file, Some(PathBuf::from("graph.json")));
    }

    #[test]
    fn test_output_format_parsing() {
        let output: OutputConfig = toml::from_str(r#"format = "dot""#).unwrap();
        assert_eq!(output.format, OutputFormat::Dot);
    }
}
