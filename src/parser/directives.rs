// Directive extraction from Hugo template text
//
// Scans one template's text and emits the raw inclusion directives it
// contains: partial / partialCached / template calls, block slot
// declarations, and define blocks. Conditional context is tracked with a
// depth stack over recognized action tokens rather than a full template
// parser, so nested if/range/with blocks mark the calls inside them as
// optional.

use crate::error::{Error, Result};
use crate::parser::template::TemplateSource;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Kind of call directive recognized by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Partial,
    PartialCached,
    Template,
}

/// One raw call directive occurrence, before path resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDirective {
    pub kind: CallKind,
    /// Target expression: quoted-literal contents, or the expression text
    pub target: String,
    /// True when the target was a literal string (or folded to one)
    pub literal: bool,
    /// 1-based line where the action opens
    pub line: usize,
    /// Verbatim source line of the opening action
    pub context: String,
    /// True when found inside a conditional branch that may not fire
    pub optional: bool,
    /// True when found inside a trailing bare `else`: the statically
    /// guaranteed fallback when no earlier existence check succeeds
    pub fallback: bool,
}

/// A `block "name"` slot declaration in a base template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSlot {
    pub name: String,
    pub line: usize,
}

/// A `define "name"` block in a derived template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefineBlock {
    pub name: String,
    pub line: usize,
    pub context: String,
}

/// Everything extracted from one template's text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    /// Call directives in source order
    pub calls: Vec<RawDirective>,
    /// Block slots declared via `block`
    pub block_slots: Vec<BlockSlot>,
    /// Override candidates declared via `define`
    pub defines: Vec<DefineBlock>,
    /// Inline partial definitions (`define "partials/..."`); these are a
    /// documented resolution limit and never produce edges
    pub inline_partials: Vec<String>,
    /// True when the file consists solely of define actions
    pub define_only: bool,
}

impl Extraction {
    /// Names of all blocks this template defines (slots and overrides)
    pub fn defined_block_names(&self) -> impl Iterator<Item = &str> {
        self.block_slots
            .iter()
            .map(|b| b.name.as_str())
            .chain(self.defines.iter().map(|d| d.name.as_str()))
    }
}

// (?s) lets the target capture cross newlines; actions may span lines
static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:\$[\w.]+\s*:?=\s*)?(partialCached|partial|template)\s+(.+)$")
        .expect("call pattern")
});

static NAMED_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(block|define)\s+"([^"]+)""#).expect("block pattern"));

/// Open control construct tracked on the depth stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construct {
    If(Branch),
    Range(Branch),
    With(Branch),
    Block,
    Define,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Then,
    ElseIf,
    Else,
}

/// Extracts raw directives from template text.
///
/// Extraction is a pure function of the input text: running it twice over
/// the same source yields identical occurrence sequences.
#[derive(Debug, Default)]
pub struct DirectiveExtractor;

impl DirectiveExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract all directives from one template
    pub fn extract(&self, source: &TemplateSource) -> Result<Extraction> {
        let stripped = strip_comments(&source.text);
        let context_lines: Vec<&str> = source.text.lines().collect();

        let mut out = Extraction::default();
        let mut stack: Vec<Construct> = Vec::new();
        let mut text_outside_defines = false;

        let bytes = stripped.as_bytes();
        let mut pos = 0;
        let mut line = 1;

        while pos < bytes.len() {
            if bytes[pos..].starts_with(b"{{") {
                let open_line = line;
                let close = find_bytes(bytes, pos + 2, b"}}").ok_or_else(|| {
                    Error::parse(
                        source.id.clone(),
                        format!("unterminated template action at line {open_line}"),
                    )
                })?;
                let body = &stripped[pos + 2..close];
                line += body.bytes().filter(|b| *b == b'\n').count();
                pos = close + 2;

                let context = context_lines
                    .get(open_line - 1)
                    .map(|l| l.trim().to_string())
                    .unwrap_or_default();
                handle_action(body, open_line, context, &mut stack, &mut out);
            } else {
                let b = bytes[pos];
                if b == b'\n' {
                    line += 1;
                } else if !b.is_ascii_whitespace() && !in_define(&stack) {
                    text_outside_defines = true;
                }
                pos += 1;
            }
        }

        out.define_only = out.calls.is_empty()
            && out.block_slots.is_empty()
            && (!out.defines.is_empty() || !out.inline_partials.is_empty())
            && !text_outside_defines;

        Ok(out)
    }
}

fn in_define(stack: &[Construct]) -> bool {
    stack.iter().any(|c| matches!(c, Construct::Define))
}

/// Optionality of a call at the current stack depth.
///
/// Returns (optional, fallback). A call with no enclosing conditional is
/// unconditional. A call whose every enclosing conditional is an `if` sitting
/// in its bare `else` branch is the guaranteed fallback. Anything else is
/// optional: existence checks, else-if chains, range and with bodies cannot
/// be evaluated statically.
fn call_flags(stack: &[Construct]) -> (bool, bool) {
    let conditionals: Vec<&Construct> = stack
        .iter()
        .filter(|c| matches!(c, Construct::If(_) | Construct::Range(_) | Construct::With(_)))
        .collect();

    if conditionals.is_empty() {
        return (false, false);
    }
    if conditionals
        .iter()
        .all(|c| matches!(c, Construct::If(Branch::Else)))
    {
        return (false, true);
    }
    (true, false)
}

fn handle_action(
    body: &str,
    line: usize,
    context: String,
    stack: &mut Vec<Construct>,
    out: &mut Extraction,
) {
    let body = trim_action(body);

    if body == "end" || body.starts_with("end ") {
        stack.pop();
        return;
    }
    if body.starts_with("else if ") || body == "else if" {
        set_branch(stack, Branch::ElseIf);
        return;
    }
    if body == "else" {
        set_branch(stack, Branch::Else);
        return;
    }
    if body.starts_with("if ") {
        stack.push(Construct::If(Branch::Then));
        return;
    }
    if body.starts_with("range ") {
        stack.push(Construct::Range(Branch::Then));
        return;
    }
    if body.starts_with("with ") {
        stack.push(Construct::With(Branch::Then));
        return;
    }
    if let Some(caps) = NAMED_BLOCK_RE.captures(body) {
        let name = caps[2].to_string();
        match &caps[1] {
            "block" => {
                out.block_slots.push(BlockSlot { name, line });
                stack.push(Construct::Block);
            }
            _ => {
                if name.starts_with("partials/") || name.starts_with("_partials/") {
                    out.inline_partials.push(name);
                } else {
                    out.defines.push(DefineBlock {
                        name,
                        line,
                        context: context.clone(),
                    });
                }
                stack.push(Construct::Define);
            }
        }
        return;
    }

    if let Some(caps) = CALL_RE.captures(body) {
        let kind = match &caps[1] {
            "partial" => CallKind::Partial,
            "partialCached" => CallKind::PartialCached,
            _ => CallKind::Template,
        };
        let (target, literal) = parse_target(&caps[2]);
        let (optional, fallback) = call_flags(stack);
        out.calls.push(RawDirective {
            kind,
            target,
            literal,
            line,
            context,
            optional,
            fallback,
        });
    }
}

/// Strip whitespace and `{{-` / `-}}` trim markers from an action body
fn trim_action(body: &str) -> &str {
    let mut b = body.trim();
    if let Some(rest) = b.strip_prefix('-') {
        if rest.starts_with(char::is_whitespace) {
            b = rest.trim_start();
        }
    }
    if let Some(rest) = b.strip_suffix('-') {
        if rest.ends_with(char::is_whitespace) {
            b = rest.trim_end();
        }
    }
    b
}

fn set_branch(stack: &mut [Construct], branch: Branch) {
    if let Some(top) = stack.last_mut() {
        match top {
            Construct::If(b) | Construct::Range(b) | Construct::With(b) => *b = branch,
            _ => {}
        }
    }
}

/// Parse the target expression following a call keyword.
///
/// A quoted string is a literal. A parenthesized bare string literal folds to
/// that constant. Everything else is a computed expression and stays
/// unresolvable.
fn parse_target(rest: &str) -> (String, bool) {
    let rest = rest.trim();

    if let Some(after) = rest.strip_prefix('"') {
        if let Some(end) = after.find('"') {
            return (after[..end].to_string(), true);
        }
    }

    if rest.starts_with('(') {
        if let Some(group) = balanced_group(rest) {
            let inner = group[1..group.len() - 1].trim();
            if let Some(after) = inner.strip_prefix('"') {
                if let Some(end) = after.find('"') {
                    if after[end + 1..].trim().is_empty() {
                        return (after[..end].to_string(), true);
                    }
                }
            }
            return (group.to_string(), false);
        }
    }

    let token = rest.split_whitespace().next().unwrap_or(rest);
    (token.to_string(), false)
}

/// Extract a balanced parenthesized group from the start of `s`
fn balanced_group(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn find_bytes(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Remove Hugo `{{/* ... */}}` comments (which may nest) and HTML comments,
/// replacing each with its newlines so line numbers stay accurate.
fn strip_comments(content: &str) -> String {
    let no_hugo = strip_hugo_comments(content);
    strip_html_comments(&no_hugo)
}

fn strip_hugo_comments(content: &str) -> String {
    let bytes = content.as_bytes();
    let mut result = String::with_capacity(content.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(b"{{/*") || bytes[i..].starts_with(b"{{- /*") {
            let start = i;
            let mut depth = 1;
            i += if bytes[i..].starts_with(b"{{/*") { 4 } else { 6 };
            while i < bytes.len() && depth > 0 {
                if bytes[i..].starts_with(b"{{/*") {
                    depth += 1;
                    i += 4;
                } else if bytes[i..].starts_with(b"*/}}") {
                    depth -= 1;
                    i += 4;
                } else if bytes[i..].starts_with(b"*/ -}}") {
                    depth -= 1;
                    i += 6;
                } else {
                    i += 1;
                }
            }
            for b in &bytes[start..i.min(bytes.len())] {
                if *b == b'\n' {
                    result.push('\n');
                }
            }
        } else {
            // Byte-wise copy is safe: the branch condition only triggers on
            // ASCII delimiters, so multi-byte chars pass through intact
            let ch_len = utf8_len(bytes[i]);
            result.push_str(&content[i..i + ch_len]);
            i += ch_len;
        }
    }

    result
}

fn strip_html_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("<!--") {
        result.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => {
                let comment = &rest[start..start + end + 3];
                result.extend(comment.chars().filter(|c| *c == '\n'));
                rest = &rest[start + end + 3..];
            }
            None => {
                // Unterminated comment swallows the remainder
                result.extend(rest[start..].chars().filter(|c| *c == '\n'));
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        _ => 2,
    }
}
