// Target path resolution
//
// Converts a raw directive target plus the calling template's location into
// a canonical node id, or an Unresolved marker when the target is a computed
// expression. Resolution is a pure function of the resolver's inputs: the
// set of discovered template ids and the module map, both passed in
// explicitly.

use crate::analysis::modules::ModuleMap;
use crate::parser::{canonical_id, CallKind, RawDirective, TemplateKind};
use std::collections::HashMap;

/// Outcome of resolving one raw target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Resolved to a discovered template
    Found { id: String },
    /// Literal path with no discovered file behind it; a stub node is
    /// created and the edge is marked unresolved
    Missing { id: String },
    /// Deprecated `_internal/` namespace; resolves to a synthetic stub that
    /// counts as resolved but is flagged by the analyzer
    Internal { id: String },
    /// Target fails minimal path syntax checks
    Invalid { id: String, reason: String },
    /// Computed expression that does not fold to a constant; a modeling
    /// limit, not an error
    Unresolved,
}

/// Resolves directive targets against the discovered template set.
///
/// The lookup table mirrors Hugo's partial resolution rules: a partial can
/// be referenced by its bare name (`header.html`), by its partials-relative
/// subpath (`nav/menu.html`), or by an explicit namespace path
/// (`partials/header.html` / `_partials/header.html`).
#[derive(Debug)]
pub struct PathResolver {
    /// Canonical discovered ids only; template calls resolve against these
    lookup: HashMap<String, String>,
    /// Partial-namespace keys only, so bare partial names cannot
    /// accidentally hit a layout with the same file name
    partial_lookup: HashMap<String, String>,
    module_map: ModuleMap,
}

impl PathResolver {
    /// Build a resolver from the discovered canonical ids and the module map
    pub fn new(discovered: impl IntoIterator<Item = String>, module_map: ModuleMap) -> Self {
        let mut lookup = HashMap::new();
        let mut partial_lookup = HashMap::new();

        for id in discovered {
            let segments: Vec<&str> = id.split('/').collect();
            let partial_start = segments
                .iter()
                .position(|s| *s == "partials" || *s == "_partials");
            if let Some(start) = partial_start {
                let rest = &segments[start + 1..];
                if !rest.is_empty() {
                    let subpath = rest.join("/");
                    for key in [
                        format!("partials/{subpath}"),
                        format!("_partials/{subpath}"),
                        subpath,
                    ] {
                        partial_lookup.entry(key).or_insert_with(|| id.clone());
                    }
                }
                partial_lookup.entry(id.clone()).or_insert_with(|| id.clone());
            }
            lookup.insert(id.clone(), id);
        }

        Self {
            lookup,
            partial_lookup,
            module_map,
        }
    }

    /// Resolve one directive's target.
    ///
    /// `caller_kind` matters for shortcodes: they share the partial
    /// namespace, so their template references fall back to partial lookup.
    pub fn resolve(&self, directive: &RawDirective, caller_kind: TemplateKind) -> Resolution {
        if !directive.literal {
            return Resolution::Unresolved;
        }

        let raw = directive.target.trim();
        if let Some(invalid) = validate_path(raw) {
            return invalid;
        }

        let mut target = canonical_id(raw);
        if target.starts_with("_internal/") {
            return Resolution::Internal { id: target };
        }

        if let Some(rewritten) = self.module_map.rewrite(&target) {
            // The rewritten base may escape the root; check it like any path
            if let Some(invalid) = validate_path(&rewritten) {
                return invalid;
            }
            target = canonical_id(&rewritten);
        }

        match directive.kind {
            CallKind::Partial | CallKind::PartialCached => self.resolve_partial(&target),
            CallKind::Template => {
                if let Some(id) = self.lookup.get(&target) {
                    return Resolution::Found { id: id.clone() };
                }
                if caller_kind == TemplateKind::Shortcode {
                    // Shortcodes share the partial namespace
                    if let Resolution::Found { id } = self.resolve_partial(&target) {
                        return Resolution::Found { id };
                    }
                }
                Resolution::Missing { id: target }
            }
        }
    }

    /// Partial lookup relative to the partials root, caller-independent
    fn resolve_partial(&self, target: &str) -> Resolution {
        let candidates = if target.starts_with("partials/") || target.starts_with("_partials/") {
            vec![target.to_string()]
        } else {
            vec![
                target.to_string(),
                format!("partials/{target}"),
                format!("_partials/{target}"),
            ]
        };

        for candidate in &candidates {
            if let Some(id) = self.partial_lookup.get(candidate) {
                return Resolution::Found { id: id.clone() };
            }
        }

        let stub = if target.starts_with("partials/") || target.starts_with("_partials/") {
            target.to_string()
        } else {
            format!("partials/{target}")
        };
        Resolution::Missing { id: stub }
    }
}

/// Minimal path syntax checks: empty paths, empty segments, traversal above
/// the project root
fn validate_path(raw: &str) -> Option<Resolution> {
    if raw.is_empty() {
        return Some(Resolution::Invalid {
            id: String::new(),
            reason: "empty path".to_string(),
        });
    }
    if raw.contains("//") {
        return Some(Resolution::Invalid {
            id: canonical_id(raw),
            reason: "empty path segment".to_string(),
        });
    }

    let mut depth: i32 = 0;
    for segment in canonical_id(raw).split('/') {
        match segment {
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return Some(Resolution::Invalid {
                        id: canonical_id(raw),
                        reason: "path traversal above project root".to_string(),
                    });
                }
            }
            _ => depth += 1,
        }
    }
    None
}
