// Analysis pipeline: discovery, extraction, resolution, diagnostics

pub mod diagnostics;
pub mod graph;
pub mod modules;
pub mod resolver;

pub use diagnostics::*;
pub use graph::*;
pub use modules::*;
pub use resolver::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser::{
    is_template_file, CallKind, DirectiveExtractor, Extraction, TemplateKind, TemplateSource,
};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

/// Result of analyzing a Hugo site's templates
#[derive(Debug)]
pub struct AnalysisResult {
    /// The dependency graph with all nodes and edges
    pub graph: DependencyGraph,
    /// Structural findings over the finished graph
    pub diagnostics: Vec<Diagnostic>,
    /// Module path rewrites in effect during resolution
    pub module_map: ModuleMap,
    /// Files that failed to parse (path -> error message)
    pub parse_errors: HashMap<PathBuf, String>,
}

/// Main analyzer that orchestrates the analysis pipeline
pub struct Analyzer {
    config: Config,
    extractor: DirectiveExtractor,
    verbose: bool,
    cancel: Arc<AtomicBool>,
}

impl Analyzer {
    /// Create a new analyzer with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            extractor: DirectiveExtractor::new(),
            verbose: false,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create analyzer with verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Cooperative cancellation flag: set it from another thread to make a
    /// running analyze() return Error::Cancelled at the next checkpoint
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Analyze the Hugo project at the given path
    pub fn analyze(&self, root: &Path) -> Result<AnalysisResult> {
        if !root.is_dir() {
            return Err(Error::PathNotFound(root.to_path_buf()));
        }

        let (sources, mut parse_errors) = self.discover_templates(root)?;
        if sources.is_empty() {
            return Err(Error::analysis(format!(
                "No template files found under {}",
                root.display()
            )));
        }

        let module_map = self.load_modules(root);
        let (extractions, extract_errors) = self.extract_all(&sources)?;
        parse_errors.extend(extract_errors);
        let graph = self.build_graph(&extractions, module_map.clone());
        let diagnostics = DiagnosticsChecker::new(&graph).run(&module_map);

        Ok(AnalysisResult {
            graph,
            diagnostics,
            module_map,
            parse_errors,
        })
    }

    /// Discover template files and read their contents.
    ///
    /// The project's `layouts/` directory is the primary root; each theme
    /// under `themes/<name>/layouts/` contributes templates with ids
    /// prefixed `themes/<name>/`. A path that is itself a layouts tree
    /// (no `layouts/` child) is walked directly.
    fn discover_templates(
        &self,
        root: &Path,
    ) -> Result<(Vec<TemplateSource>, HashMap<PathBuf, String>)> {
        let mut roots: Vec<(PathBuf, String)> = Vec::new();

        let layouts = root.join("layouts");
        if layouts.is_dir() {
            roots.push((layouts, String::new()));
        } else {
            roots.push((root.to_path_buf(), String::new()));
        }

        let themes = root.join("themes");
        if themes.is_dir() {
            let mut theme_dirs: Vec<PathBuf> = std::fs::read_dir(&themes)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.join("layouts").is_dir())
                .collect();
            theme_dirs.sort();
            for theme in theme_dirs {
                let name = theme
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                roots.push((theme.join("layouts"), format!("themes/{name}/")));
            }
        }

        let excludes = self.exclude_patterns()?;
        let mut sources = Vec::new();
        let mut read_errors = HashMap::new();

        for (dir, prefix) in roots {
            for entry in WalkDir::new(&dir)
                .follow_links(self.config.analysis.follow_links)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_dir() || !is_template_file(path) {
                    continue;
                }

                let relative = path.strip_prefix(&dir).unwrap_or(path);
                let id = format!("{prefix}{}", relative.to_string_lossy());
                if self.is_excluded(&excludes, &id) {
                    continue;
                }

                // One unreadable file never aborts the whole run
                match std::fs::read_to_string(path) {
                    Ok(text) => sources.push(TemplateSource::new(id, text)),
                    Err(e) => {
                        read_errors.insert(path.to_path_buf(), e.to_string());
                    }
                }
            }
        }

        sources.sort_by(|a, b| a.id.cmp(&b.id));
        Ok((sources, read_errors))
    }

    fn exclude_patterns(&self) -> Result<Vec<Pattern>> {
        self.config
            .analysis
            .exclude
            .iter()
            .map(|p| Pattern::new(p).map_err(Error::from))
            .collect()
    }

    fn is_excluded(&self, patterns: &[Pattern], id: &str) -> bool {
        patterns.iter().any(|p| p.matches(id))
    }

    /// Read module configuration; a broken config degrades to a warning
    /// entry rather than aborting the run
    fn load_modules(&self, root: &Path) -> ModuleMap {
        if !self.config.analysis.modules {
            return ModuleMap::empty();
        }
        match ModuleMap::from_project(root) {
            Ok(map) => map,
            Err(e) => {
                let mut map = ModuleMap::empty();
                let config = ModuleMap::config_path(root)
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "hugo config".to_string());
                map.unresolved.push(format!("{config}: {e}"));
                map
            }
        }
    }

    /// Run directive extraction over every source in parallel
    fn extract_all(
        &self,
        sources: &[TemplateSource],
    ) -> Result<(Vec<(TemplateSource, Extraction)>, HashMap<PathBuf, String>)> {
        let progress = if self.verbose {
            let pb = ProgressBar::new(sources.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let results: Vec<(TemplateSource, crate::error::Result<Extraction>)> = sources
            .par_iter()
            .map(|source| {
                let extracted = if self.cancel.load(Ordering::Relaxed) {
                    Err(Error::Cancelled)
                } else {
                    self.extractor.extract(source)
                };
                if let Some(ref pb) = progress {
                    pb.set_message(source.id.clone());
                    pb.inc(1);
                }
                (source.clone(), extracted)
            })
            .collect();

        if let Some(pb) = progress {
            pb.finish_with_message("Extraction complete");
        }
        if self.cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let mut extractions = Vec::new();
        let mut errors = HashMap::new();
        for (source, result) in results {
            match result {
                Ok(extraction) => extractions.push((source, extraction)),
                Err(e) => {
                    errors.insert(PathBuf::from(&source.id), e.to_string());
                }
            }
        }
        Ok((extractions, errors))
    }

    /// Materialize nodes and edges from the extractions
    fn build_graph(
        &self,
        extractions: &[(TemplateSource, Extraction)],
        module_map: ModuleMap,
    ) -> DependencyGraph {
        let mut builder = GraphBuilder::new();

        // Block slot registry: slot name -> base template ids declaring it
        let mut slots: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (source, extraction) in extractions {
            let kind = if source.kind == TemplateKind::Layout && extraction.define_only {
                TemplateKind::BlockDefinition
            } else {
                source.kind
            };
            let node = builder.add_template(&source.id, kind);
            for name in extraction.defined_block_names() {
                builder.add_defined_block(node, name);
            }
            for slot in &extraction.block_slots {
                slots.entry(slot.name.clone()).or_default().insert(source.id.clone());
            }
        }

        let resolver = PathResolver::new(
            extractions.iter().map(|(s, _)| s.id.clone()),
            module_map,
        );

        for (source, extraction) in extractions {
            let from = match builder.node_id(&source.id) {
                Some(id) => id,
                None => builder.add_stub(&source.id),
            };

            for call in &extraction.calls {
                let kind = edge_kind(source.kind, call.kind);
                let cached = call.kind == CallKind::PartialCached;
                match resolver.resolve(call, source.kind) {
                    Resolution::Found { id } | Resolution::Internal { id } => {
                        let to = builder.add_stub(&id);
                        builder.add_edge(
                            from, to, kind, call.line,
                            call.context.clone(), call.optional, call.fallback, cached, true,
                        );
                    }
                    Resolution::Missing { id } => {
                        let to = builder.add_stub(&id);
                        builder.add_edge(
                            from, to, kind, call.line,
                            call.context.clone(), call.optional, call.fallback, cached, false,
                        );
                    }
                    Resolution::Invalid { reason, .. } => {
                        builder.record_invalid(from, call.target.clone(), call.line, reason);
                    }
                    Resolution::Unresolved => {
                        builder.record_dynamic(from, call.target.clone(), call.line);
                    }
                }
            }

            for define in &extraction.defines {
                let Some(bases) = slots.get(&define.name) else {
                    continue;
                };
                for base_id in bases {
                    if base_id == &source.id {
                        continue;
                    }
                    let to = match builder.node_id(base_id) {
                        Some(id) => id,
                        None => builder.add_stub(base_id),
                    };
                    builder.add_edge(
                        from, to, EdgeKind::BlockOverride, define.line,
                        define.context.clone(), false, false, false, true,
                    );
                }
            }
        }

        builder.finish()
    }
}

/// Edge kind for a call: shortcode callers get their own kind, with the
/// `cached` flag preserving the partialCached distinction
fn edge_kind(caller: TemplateKind, call: CallKind) -> EdgeKind {
    if caller == TemplateKind::Shortcode {
        return EdgeKind::ShortcodeCall;
    }
    match call {
        CallKind::Partial => EdgeKind::Partial,
        CallKind::PartialCached => EdgeKind::PartialCached,
        CallKind::Template => EdgeKind::Template,
    }
}
