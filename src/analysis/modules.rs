// Hugo module configuration
//
// Reads the project's Hugo config (hugo.toml / config.yaml / ...) and
// extracts module imports and replacement mappings into a ModuleMap. The
// resolver consumes the map as an explicit value; nothing here is global
// state.

use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Module path overrides extracted from Hugo configuration.
///
/// Maps a module path (e.g. `github.com/org/theme`) to the base path its
/// templates actually live under. Imports that could not be mapped are kept
/// so the analyzer can surface them as warnings.
#[derive(Debug, Clone, Default)]
pub struct ModuleMap {
    overrides: BTreeMap<String, String>,
    /// Declared module imports with no replacement and no vendored copy
    pub unresolved: Vec<String>,
}

impl ModuleMap {
    /// Create an empty map (no modules configured)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register an override: templates of `module` live under `base`
    pub fn insert(&mut self, module: impl Into<String>, base: impl Into<String>) {
        self.overrides.insert(module.into(), base.into());
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty() && self.unresolved.is_empty()
    }

    /// Rewrite a target that starts with a mapped module path.
    ///
    /// Longest prefix wins. Returns None when no override applies.
    pub fn rewrite(&self, target: &str) -> Option<String> {
        let mut best: Option<(&str, &str)> = None;
        for (module, base) in &self.overrides {
            let matches = target == module
                || target
                    .strip_prefix(module.as_str())
                    .map(|rest| rest.starts_with('/'))
                    .unwrap_or(false);
            if matches && best.map(|(m, _)| module.len() > m.len()).unwrap_or(true) {
                best = Some((module, base));
            }
        }
        best.map(|(module, base)| {
            let rest = &target[module.len()..];
            format!("{}{}", base.trim_end_matches('/'), rest)
        })
    }

    /// Path of the Hugo config file that would be read, if any
    pub fn config_path(root: &Path) -> Option<std::path::PathBuf> {
        find_config_file(root).map(|(path, _)| path)
    }

    /// Load the module map from a Hugo project's configuration.
    ///
    /// Missing config files yield an empty map. A config file that exists
    /// but fails to parse is an error; the caller degrades it to a warning.
    pub fn from_project(root: &Path) -> Result<Self> {
        let Some((path, format)) = find_config_file(root) else {
            return Ok(Self::empty());
        };

        let contents = std::fs::read_to_string(&path)?;
        let config: HugoConfig = match format {
            ConfigFormat::Toml => toml::from_str(&contents)?,
            ConfigFormat::Yaml => serde_yaml::from_str(&contents)?,
            ConfigFormat::Json => serde_json::from_str(&contents)?,
        };

        let replacements = config.module.replacement_pairs();
        let mut map = Self::empty();

        for import in &config.module.imports {
            let Some(module_path) = import.path.as_deref() else {
                continue;
            };
            if let Some(base) = replacements.get(module_path) {
                map.insert(module_path, base.clone());
            } else if vendored_theme_exists(root, module_path) {
                let name = module_path.rsplit('/').next().unwrap_or(module_path);
                map.insert(module_path, format!("themes/{name}"));
            } else {
                map.unresolved.push(module_path.to_string());
            }
        }

        // Replacements for modules never listed under imports still apply
        for (module, base) in replacements {
            map.overrides.entry(module).or_insert(base);
        }

        Ok(map)
    }
}

fn vendored_theme_exists(root: &Path, module_path: &str) -> bool {
    let name = module_path.rsplit('/').next().unwrap_or(module_path);
    root.join("themes").join(name).is_dir()
}

#[derive(Clone, Copy)]
enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

/// Locate the project config, in Hugo's own precedence order
fn find_config_file(root: &Path) -> Option<(std::path::PathBuf, ConfigFormat)> {
    let candidates = [
        ("hugo.toml", ConfigFormat::Toml),
        ("hugo.yaml", ConfigFormat::Yaml),
        ("hugo.yml", ConfigFormat::Yaml),
        ("hugo.json", ConfigFormat::Json),
        ("config.toml", ConfigFormat::Toml),
        ("config.yaml", ConfigFormat::Yaml),
        ("config.yml", ConfigFormat::Yaml),
        ("config.json", ConfigFormat::Json),
    ];

    for dir in [root.to_path_buf(), root.join("config").join("_default")] {
        for (name, format) in candidates {
            let path = dir.join(name);
            if path.is_file() {
                return Some((path, format));
            }
        }
    }
    None
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HugoConfig {
    module: ModuleSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModuleSection {
    imports: Vec<ModuleImport>,
    replacements: Replacements,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModuleImport {
    path: Option<String>,
}

/// Hugo accepts replacements as a single comma-separated string or a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Replacements {
    One(String),
    Many(Vec<String>),
}

impl Default for Replacements {
    fn default() -> Self {
        Replacements::Many(Vec::new())
    }
}

impl ModuleSection {
    /// Parse `"original -> replacement"` entries into a map
    fn replacement_pairs(&self) -> BTreeMap<String, String> {
        let entries: Vec<&str> = match &self.replacements {
            Replacements::One(s) => s.split(',').collect(),
            Replacements::Many(v) => v.iter().map(|s| s.as_str()).collect(),
        };

        let mut pairs = BTreeMap::new();
        for entry in entries {
            if let Some((original, replacement)) = entry.split_once("->") {
                let original = original.trim();
                let replacement = replacement.trim();
                if !original.is_empty() && !replacement.is_empty() {
                    pairs.insert(original.to_string(), replacement.to_string());
                }
            }
        }
        pairs
    }
}
