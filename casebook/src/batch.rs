//! Batch parsing and ingestion.
//!
//! A failure on one document never aborts the batch: every input gets its own
//! entry holding either the parsed [`Document`] or the reason it was rejected.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::{AddOutcome, Aggregator};
use crate::discovery::discover_documents;
use crate::document::Document;
use crate::error::{CasebookError, Result};
use crate::parser::parse_named;

/// The outcome for one input of a batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub name: String,
    pub outcome: Result<Document>,
    pub processing_time_ms: u64,
}

impl BatchEntry {
    pub fn document(&self) -> Option<&Document> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&CasebookError> {
        self.outcome.as_ref().err()
    }
}

/// Parsed inputs in the order they were supplied.
#[derive(Debug, Default)]
pub struct Batch {
    entries: Vec<BatchEntry>,
}

/// Counts produced by [`Batch::ingest_into`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub parsed: usize,
    pub malformed: usize,
    pub invalid: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub unchanged: usize,
}

impl BatchSummary {
    pub fn rejected(&self) -> usize {
        self.malformed + self.invalid
    }
}

impl Batch {
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.entries.iter().filter_map(BatchEntry::document)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &CasebookError)> {
        self.entries.iter().filter_map(|e| e.error().map(|err| (e.name.as_str(), err)))
    }

    /// Add every parsed document to `aggregator`, counting what happened.
    pub fn ingest_into(&self, aggregator: &Aggregator) -> BatchSummary {
        let mut summary = BatchSummary { total: self.entries.len(), ..Default::default() };

        for entry in &self.entries {
            let document = match &entry.outcome {
                Ok(document) => document,
                Err(err) => {
                    warn!(source = %entry.name, error = %err, "skipping unparseable document");
                    summary.malformed += 1;
                    continue;
                }
            };
            summary.parsed += 1;

            match aggregator.add(document) {
                Ok(AddOutcome::Inserted) => summary.inserted += 1,
                Ok(AddOutcome::Replaced) => summary.replaced += 1,
                Ok(AddOutcome::Unchanged) => summary.unchanged += 1,
                Err(err) => {
                    warn!(source = %entry.name, error = %err, "document failed validation");
                    summary.invalid += 1;
                }
            }
        }

        info!(
            total = summary.total,
            inserted = summary.inserted,
            replaced = summary.replaced,
            unchanged = summary.unchanged,
            rejected = summary.rejected(),
            "batch ingested"
        );
        summary
    }
}

/// Parse `(name, text)` pairs independently.
pub fn parse_batch<I, N, T>(inputs: I) -> Batch
where
    I: IntoIterator<Item = (N, T)>,
    N: Into<String>,
    T: AsRef<str>,
{
    let entries = inputs
        .into_iter()
        .map(|(name, text)| {
            let name = name.into();
            let started = Instant::now();
            let outcome = parse_named(&name, text.as_ref());
            BatchEntry { name, outcome, processing_time_ms: elapsed_ms(started) }
        })
        .collect();
    Batch { entries }
}

/// Discover and parse every Markdown document under `root`.
///
/// Unreadable files become failed entries; invalid UTF-8 is replaced rather
/// than rejected.
///
/// # Errors
///
/// Returns [`CasebookError::Io`] only if `root` itself cannot be read.
pub fn load_directory(root: impl AsRef<Path>) -> Result<Batch> {
    let root = root.as_ref();
    let files = discover_documents(root)?;
    let mut entries = Vec::with_capacity(files.len());

    for path in files {
        let name = path.display().to_string();
        let started = Instant::now();
        let outcome = std::fs::read(&path)
            .map_err(|source| CasebookError::Io { path: path.clone(), source })
            .and_then(|bytes| parse_named(&name, &String::from_utf8_lossy(&bytes)));
        entries.push(BatchEntry { name, outcome, processing_time_ms: elapsed_ms(started) });
    }

    info!(root = %root.display(), files = entries.len(), "loaded documents");
    Ok(Batch { entries })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
