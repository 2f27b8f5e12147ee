//! Structured case-study document processing.
//!
//! This crate provides:
//! - Front-matter and `[START/END OF SECTION]` parsing
//! - Schema validation that reports every field-level violation
//! - An in-memory index queryable by client, industry, tech stack and metric
//! - Deterministic CSV, JSON, Markdown and plain-text reports
//! - Section-aware chunking and directory batch loading

pub mod aggregator;
pub mod batch;
pub mod chunking;
pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod parser;
pub mod render;
pub mod schema;
pub mod validator;

pub use aggregator::{AddOutcome, Aggregator, Dimension};
pub use batch::{Batch, BatchEntry, BatchSummary, load_directory, parse_batch};
pub use chunking::{Chunk, SectionChunker};
pub use config::{CasebookConfig, CasebookConfigBuilder};
pub use discovery::discover_documents;
pub use document::{Document, DocumentId, Frontmatter, Metadata, Metric, ProjectStatus, Section};
pub use error::{CasebookError, MalformedReason, Result};
pub use parser::{parse_document, parse_named};
pub use render::{Column, Report, ReportFormat};
pub use schema::{FieldKind, FieldSpec, PROJECT_TYPES, Schema};
pub use validator::{Rule, Validator, Violation, validate};
