//! Front-matter and section-marker parsing.
//!
//! A document is a `---` delimited YAML block followed by Markdown prose.
//! Named sections are wrapped in marker lines:
//!
//! ```text
//! ## Context
//! [START OF SECTION]
//! ...
//! [END OF SECTION]
//! ```
//!
//! A start marker takes its label from `[START OF SECTION: Label]` when given,
//! otherwise from the closest heading above it.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::document::{Document, DocumentId, Frontmatter, Section};
use crate::error::{CasebookError, MalformedReason, Result};

static START_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[START OF SECTION(?::\s*(.*?))?\s*\]$").expect("valid start marker pattern")
});
static END_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[END OF SECTION(?::\s*(.*?))?\s*\]$").expect("valid end marker pattern")
});
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+(.+)$").expect("valid heading pattern"));

const UNNAMED_SOURCE: &str = "<input>";

/// Parse a document without recording where it came from.
pub fn parse_document(text: &str) -> Result<Document> {
    parse(None, text)
}

/// Parse a document, remembering `source` (usually a file path) for errors
/// and reports.
pub fn parse_named(source: &str, text: &str) -> Result<Document> {
    parse(Some(source), text)
}

fn parse(source: Option<&str>, text: &str) -> Result<Document> {
    let source_name = source.unwrap_or(UNNAMED_SOURCE);
    let normalized = text.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.lines().collect();

    let (frontmatter, body_start) = split_frontmatter(source_name, &lines)?;
    let sections = extract_sections(source_name, &lines, body_start)?;
    let body = lines[body_start..].join("\n").trim().to_string();

    let id = DocumentId::new(
        &frontmatter.text("client").unwrap_or_default(),
        &frontmatter.text("title").unwrap_or_default(),
    );

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let content_hash = format!("{:x}", hasher.finalize());

    debug!(
        source = source_name,
        document.id = %id,
        fields = frontmatter.len(),
        sections = sections.len(),
        "parsed document"
    );

    Ok(Document {
        id,
        source: source.map(str::to_string),
        frontmatter,
        sections,
        body,
        content_hash,
    })
}

/// Returns the front-matter and the index of the first body line.
fn split_frontmatter(source: &str, lines: &[&str]) -> Result<(Frontmatter, usize)> {
    if lines.first().map(|line| line.trim()) != Some("---") {
        return Err(CasebookError::malformed(source, MalformedReason::MissingFrontmatter));
    }

    let close = lines
        .iter()
        .skip(1)
        .position(|line| line.trim() == "---")
        .map(|offset| offset + 1)
        .ok_or_else(|| CasebookError::malformed(source, MalformedReason::UnterminatedFrontmatter))?;

    let raw = lines[1..close].join("\n");
    let value: Value = serde_yaml::from_str(&raw).map_err(|e| {
        CasebookError::malformed(source, MalformedReason::InvalidFrontmatter(e.to_string()))
    })?;

    let mapping = match value {
        Value::Null => Default::default(),
        Value::Mapping(mapping) => mapping,
        _ => return Err(CasebookError::malformed(source, MalformedReason::FrontmatterNotMapping)),
    };

    Ok((Frontmatter::new(mapping), close + 1))
}

enum Marker<'a> {
    Start(Option<&'a str>),
    End(Option<&'a str>),
}

fn marker(line: &str) -> Option<Marker<'_>> {
    fn label<'a>(caps: regex::Captures<'a>) -> Option<&'a str> {
        caps.get(1).map(|m| m.as_str().trim()).filter(|label| !label.is_empty())
    }

    let line = line.trim();
    if let Some(caps) = START_MARKER.captures(line) {
        return Some(Marker::Start(label(caps)));
    }
    END_MARKER.captures(line).map(|caps| Marker::End(label(caps)))
}

/// Section label from a heading line: the text before any `:`.
fn heading_label(line: &str) -> Option<(String, String)> {
    let caps = HEADING.captures(line.trim())?;
    let heading = caps.get(1)?.as_str().trim();
    let label = heading.split(':').next().unwrap_or_default().trim();
    (!label.is_empty()).then(|| (label.to_string(), heading.to_string()))
}

struct OpenSection {
    label: String,
    heading: Option<String>,
    line: usize,
    content: Vec<String>,
}

fn extract_sections(source: &str, lines: &[&str], body_start: usize) -> Result<Vec<Section>> {
    let malformed = |reason| CasebookError::malformed(source, reason);

    let mut sections = Vec::new();
    let mut seen = HashSet::new();
    let mut pending_heading: Option<(String, String)> = None;
    let mut open: Option<OpenSection> = None;

    for (index, raw) in lines.iter().enumerate().skip(body_start) {
        let line = index + 1;
        match marker(raw) {
            Some(Marker::Start(explicit)) => {
                if let Some(current) = &open {
                    return Err(malformed(MalformedReason::NestedStart {
                        line,
                        open: current.label.clone(),
                    }));
                }
                let (label, heading) = match (explicit, pending_heading.take()) {
                    (Some(label), heading) => (label.to_string(), heading.map(|(_, h)| h)),
                    (None, Some((label, heading))) => (label, Some(heading)),
                    (None, None) => return Err(malformed(MalformedReason::MissingLabel { line })),
                };
                if !seen.insert(label.clone()) {
                    return Err(malformed(MalformedReason::DuplicateLabel { line, label }));
                }
                open = Some(OpenSection { label, heading, line, content: Vec::new() });
            }
            Some(Marker::End(explicit)) => {
                let Some(current) = open.take() else {
                    return Err(malformed(MalformedReason::UnmatchedEnd { line }));
                };
                if let Some(found) = explicit.filter(|found| *found != current.label) {
                    return Err(malformed(MalformedReason::MismatchedEnd {
                        line,
                        expected: current.label,
                        found: found.to_string(),
                    }));
                }
                sections.push(Section {
                    label: current.label,
                    content: current.content.join("\n").trim().to_string(),
                    heading: current.heading,
                });
            }
            None => match open.as_mut() {
                Some(current) => current.content.push((*raw).to_string()),
                None => {
                    if let Some(heading) = heading_label(raw) {
                        pending_heading = Some(heading);
                    }
                }
            },
        }
    }

    if let Some(current) = open {
        return Err(malformed(MalformedReason::UnclosedSection {
            line: current.line,
            label: current.label,
        }));
    }

    Ok(sections)
}
