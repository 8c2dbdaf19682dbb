// Template source records and classification
//
// A TemplateSource is one discovered template file: its canonical id
// (layouts-relative path), a kind hint derived from the path, and the raw
// text. Discovery produces these; the extractor and resolver consume them.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of template, derived from its location under layouts/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// Regular layout template (single.html, list.html, home.html, ...)
    Layout,
    /// Reusable fragment under partials/ or _partials/
    Partial,
    /// Template invoked from content markup, under shortcodes/ or _shortcodes/
    Shortcode,
    /// Base template declaring block slots (baseof.html)
    Baseof,
    /// Template consisting solely of block define actions
    BlockDefinition,
}

impl TemplateKind {
    /// Classify a template from its layouts-relative path.
    ///
    /// Hugo's rules: files under partials/ or _partials/ are partials, files
    /// under shortcodes/ or _shortcodes/ are shortcodes, baseof.* files are
    /// base templates, everything else is a regular layout.
    pub fn from_path(relative_path: &str) -> Self {
        let segments: Vec<&str> = relative_path.split('/').collect();
        let dirs = &segments[..segments.len().saturating_sub(1)];

        if dirs.iter().any(|d| *d == "partials" || *d == "_partials") {
            return TemplateKind::Partial;
        }
        if dirs.iter().any(|d| *d == "shortcodes" || *d == "_shortcodes") {
            return TemplateKind::Shortcode;
        }

        let file_name = segments.last().copied().unwrap_or("");
        let stem = file_name.split('.').next().unwrap_or(file_name);
        if stem == "baseof" {
            return TemplateKind::Baseof;
        }

        TemplateKind::Layout
    }

    /// Short label used by formatters
    pub fn label(&self) -> &'static str {
        match self {
            TemplateKind::Layout => "layout",
            TemplateKind::Partial => "partial",
            TemplateKind::Shortcode => "shortcode",
            TemplateKind::Baseof => "baseof",
            TemplateKind::BlockDefinition => "block_definition",
        }
    }
}

/// One discovered template file handed to the analysis pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSource {
    /// Canonical id: layouts-relative path with `/` separators
    pub id: String,
    /// Kind hint from the file's location
    pub kind: TemplateKind,
    /// Raw template text
    pub text: String,
}

impl TemplateSource {
    /// Create a source record, canonicalizing the id
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = canonical_id(&id.into());
        let kind = TemplateKind::from_path(&id);
        Self {
            id,
            kind,
            text: text.into(),
        }
    }

    /// Create a source record from a path relative to a layouts root
    pub fn from_layout_path(path: &Path, text: impl Into<String>) -> Self {
        Self::new(path.to_string_lossy().into_owned(), text)
    }
}

/// Canonicalize a template id.
///
/// Backslashes become `/`, empty and `.` segments are dropped, so two ids
/// differing only in separators or `./` prefixes compare equal. `..` segments
/// are preserved; the resolver rejects ids that traverse above the root.
pub fn canonical_id(raw: &str) -> String {
    raw.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// File extensions Hugo treats as templates under layouts/
pub const TEMPLATE_EXTENSIONS: &[&str] = &[
    "html", "xml", "json", "svg", "js", "css", "txt", "rss", "atom", "mjs", "cjs",
];

/// Check whether a file name carries a template extension
pub fn is_template_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TEMPLATE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_kind_from_path_partial() {
        assert_eq!(
            TemplateKind::from_path("partials/header.html"),
            TemplateKind::Partial
        );
        assert_eq!(
            TemplateKind::from_path("_partials/nav/menu.html"),
            TemplateKind::Partial
        );
    }

    #[test]
    fn test_kind_from_path_shortcode() {
        assert_eq!(
            TemplateKind::from_path("shortcodes/youtube.html"),
            TemplateKind::Shortcode
        );
        assert_eq!(
            TemplateKind::from_path("_shortcodes/gallery.html"),
            TemplateKind::Shortcode
        );
    }

    #[test]
    fn test_kind_from_path_baseof() {
        assert_eq!(
            TemplateKind::from_path("_default/baseof.html"),
            TemplateKind::Baseof
        );
        assert_eq!(TemplateKind::from_path("baseof.html"), TemplateKind::Baseof);
    }

    #[test]
    fn test_kind_from_path_layout() {
        assert_eq!(
            TemplateKind::from_path("_default/single.html"),
            TemplateKind::Layout
        );
        assert_eq!(TemplateKind::from_path("index.html"), TemplateKind::Layout);
    }

    #[test]
    fn test_baseof_file_inside_partials_is_partial() {
        // Directory placement wins over the file name
        assert_eq!(
            TemplateKind::from_path("partials/baseof.html"),
            TemplateKind::Partial
        );
    }

    #[test]
    fn test_canonical_id_strips_dot_segments() {
        assert_eq!(canonical_id("./partials/header.html"), "partials/header.html");
        assert_eq!(canonical_id("partials//header.html"), "partials/header.html");
        assert_eq!(canonical_id("partials\\header.html"), "partials/header.html");
    }

    #[test]
    fn test_canonical_id_keeps_parent_segments() {
        assert_eq!(canonical_id("../outside.html"), "../outside.html");
    }

    #[test]
    fn test_template_source_canonicalizes() {
        let src = TemplateSource::new("./_default/list.html", "{{ .Content }}");
        assert_eq!(src.id, "_default/list.html");
        assert_eq!(src.kind, TemplateKind::Layout);
    }

    #[test]
    fn test_is_template_file() {
        assert!(is_template_file(&PathBuf::from("single.html")));
        assert!(is_template_file(&PathBuf::from("feed.xml")));
        assert!(is_template_file(&PathBuf::from("main.css")));
        assert!(!is_template_file(&PathBuf::from("notes.md")));
        assert!(!is_template_file(&PathBuf::from("Makefile")));
    }
}
