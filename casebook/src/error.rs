//! Error types for the `casebook` crate.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::validator::Violation;

/// Errors that can occur while parsing, validating or indexing case studies.
#[derive(Debug, Error)]
pub enum CasebookError {
    /// The document text is structurally broken and could not be parsed.
    #[error("Malformed document ({source_name}): {reason}")]
    MalformedDocument {
        /// Where the text came from (file path or caller-supplied name).
        source_name: String,
        /// What exactly was wrong with the structure.
        reason: MalformedReason,
    },

    /// The document parsed but its metadata breaks the schema.
    #[error("{}", schema_violation_message(.id, .violations))]
    SchemaViolation {
        /// Identifier of the offending document.
        id: String,
        /// Every field-level violation, in schema order.
        violations: Vec<Violation>,
    },

    /// Reading a document or directory failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// The path being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A report could not be encoded.
    #[error("Render error: {0}")]
    Render(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CasebookError {
    pub(crate) fn malformed(source_name: &str, reason: MalformedReason) -> Self {
        Self::MalformedDocument { source_name: source_name.to_string(), reason }
    }

    /// Returns the field-level violations when this is a schema failure.
    pub fn violations(&self) -> Option<&[Violation]> {
        match self {
            Self::SchemaViolation { violations, .. } => Some(violations),
            _ => None,
        }
    }
}

fn schema_violation_message(id: &str, violations: &[Violation]) -> String {
    match violations.first() {
        Some(first) if violations.len() > 1 => format!(
            "Schema violation ({id}): {first} (and {} more)",
            violations.len() - 1
        ),
        Some(first) => format!("Schema violation ({id}): {first}"),
        None => format!("Schema violation ({id})"),
    }
}

/// The structural reason a document was rejected by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// The text does not start with a `---` line.
    MissingFrontmatter,
    /// The opening `---` has no closing partner.
    UnterminatedFrontmatter,
    /// The front-matter is not valid YAML.
    InvalidFrontmatter(String),
    /// The front-matter parsed, but not to a key/value mapping.
    FrontmatterNotMapping,
    /// An end marker appeared with no section open.
    UnmatchedEnd { line: usize },
    /// A start marker appeared while another section was still open.
    NestedStart { line: usize, open: String },
    /// A section was still open when the text ended.
    UnclosedSection { line: usize, label: String },
    /// A start marker had neither an explicit label nor a preceding heading.
    MissingLabel { line: usize },
    /// An explicitly labelled end marker closed a differently labelled section.
    MismatchedEnd { line: usize, expected: String, found: String },
    /// Two sections share a label.
    DuplicateLabel { line: usize, label: String },
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFrontmatter => {
                write!(f, "missing opening frontmatter delimiter (`---`)")
            }
            Self::UnterminatedFrontmatter => {
                write!(f, "missing closing frontmatter delimiter (`---`)")
            }
            Self::InvalidFrontmatter(message) => write!(f, "invalid frontmatter: {message}"),
            Self::FrontmatterNotMapping => write!(f, "frontmatter is not a key/value mapping"),
            Self::UnmatchedEnd { line } => {
                write!(f, "line {line}: end marker without a matching start marker")
            }
            Self::NestedStart { line, open } => {
                write!(f, "line {line}: start marker while section '{open}' is still open")
            }
            Self::UnclosedSection { line, label } => {
                write!(f, "line {line}: section '{label}' is never closed")
            }
            Self::MissingLabel { line } => {
                write!(f, "line {line}: start marker has no label and no preceding heading")
            }
            Self::MismatchedEnd { line, expected, found } => {
                write!(f, "line {line}: end marker for '{found}' closes section '{expected}'")
            }
            Self::DuplicateLabel { line, label } => {
                write!(f, "line {line}: section label '{label}' is already used")
            }
        }
    }
}

/// A convenience result type for casebook operations.
pub type Result<T> = std::result::Result<T, CasebookError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Rule;

    #[test]
    fn schema_violation_message_summarizes_count() {
        let err = CasebookError::SchemaViolation {
            id: "Acme/Demo".to_string(),
            violations: vec![
                Violation::new("client", Rule::Missing),
                Violation::new("industry", Rule::Missing),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Schema violation (Acme/Demo): client: required field is missing (and 1 more)"
        );
        assert_eq!(err.violations().map(<[Violation]>::len), Some(2));
    }

    #[test]
    fn malformed_message_includes_source_and_line() {
        let err = CasebookError::malformed("a.md", MalformedReason::UnmatchedEnd { line: 7 });
        assert_eq!(
            err.to_string(),
            "Malformed document (a.md): line 7: end marker without a matching start marker"
        );
    }
}
