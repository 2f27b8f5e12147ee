//! Section-aware chunking.
//!
//! Every section becomes at least one chunk headed by `## {label}`. Sections
//! longer than the limit are split at paragraph boundaries and the header is
//! repeated on every part, so each chunk still says where it came from.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::document::{Document, Section};

/// Used when a document has no delimited sections at all.
pub const WHOLE_DOCUMENT_LABEL: &str = "Document";

/// A piece of a [`Document`] sized for retrieval, with provenance metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// `{document_id}_{chunk_index}`.
    pub id: String,
    pub text: String,
    pub document_id: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct SectionChunker {
    max_chunk_size: usize,
}

impl SectionChunker {
    /// `max_chunk_size` is measured in bytes of chunk text, header included.
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let fallback;
        let sections: &[Section] = if document.sections().is_empty() {
            if document.body().is_empty() {
                return Vec::new();
            }
            fallback = [Section {
                label: WHOLE_DOCUMENT_LABEL.to_string(),
                content: document.body().to_string(),
                heading: None,
            }];
            &fallback
        } else {
            document.sections()
        };

        let base = base_metadata(document);
        let mut chunks = Vec::new();

        for section in sections {
            let parts = split_section(section, self.max_chunk_size);
            let total = parts.len();
            for (part_index, text) in parts.into_iter().enumerate() {
                let chunk_index = chunks.len();
                let mut metadata = base.clone();
                metadata.insert("chunk_index".to_string(), chunk_index.to_string());
                metadata.insert("section".to_string(), section.label.clone());
                metadata.insert("section_chunk_index".to_string(), part_index.to_string());
                metadata.insert("total_section_chunks".to_string(), total.to_string());
                let role = if total == 1 {
                    "section_complete".to_string()
                } else {
                    format!("section_part_{}_of_{total}", part_index + 1)
                };
                metadata.insert("chunk_role".to_string(), role);

                chunks.push(Chunk {
                    id: format!("{}_{chunk_index}", document.id()),
                    text,
                    document_id: document.id().to_string(),
                    metadata,
                });
            }
        }

        chunks
    }
}

impl Default for SectionChunker {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_CHUNK_SIZE)
    }
}

fn base_metadata(document: &Document) -> BTreeMap<String, String> {
    let meta = document.metadata();
    let mut out = BTreeMap::new();
    out.insert("document_id".to_string(), document.id().to_string());
    if let Some(source) = document.source() {
        out.insert("source".to_string(), source.to_string());
    }
    for (key, value) in [("title", Some(meta.title)), ("client", Some(meta.client))]
        .into_iter()
        .chain([
            ("industry", meta.industry),
            ("project_type", meta.project_type),
            ("function", meta.function),
            ("project_status", meta.project_status.map(|s| s.to_string())),
        ])
    {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            out.insert(key.to_string(), value);
        }
    }
    if !meta.tech_stack.is_empty() {
        let stack = meta.tech_stack.into_iter().collect::<Vec<_>>().join(", ");
        out.insert("tech_stack".to_string(), stack);
    }
    out
}

/// Split one section into header-prefixed parts of at most `max` bytes where
/// paragraph boundaries allow it. A single paragraph over the limit is kept
/// whole.
fn split_section(section: &Section, max: usize) -> Vec<String> {
    let header = format!("## {}", section.label);
    if section.content.is_empty() {
        return vec![header];
    }
    let whole = format!("{header}\n\n{}", section.content);
    if whole.len() <= max {
        return vec![whole];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    for paragraph in section.content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let projected = header.len() + 2 + current.len() + 2 + paragraph.len();
        if !current.is_empty() && projected > max {
            parts.push(format!("{header}\n\n{}", current));
            current.clear();
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    if !current.is_empty() {
        parts.push(format!("{header}\n\n{current}"));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn document(body: &str) -> Document {
        parse_document(&format!(
            "---\ntitle: Dashboard\nclient: ABC Home\nindustry: Home Services\nproject_type: BI_Analytics\n---\n{body}"
        ))
        .unwrap()
    }

    #[test]
    fn small_sections_become_single_chunks() {
        let doc = document(
            "## Context\n[START OF SECTION]\nShort context.\n[END OF SECTION]\n## Challenge\n[START OF SECTION]\nShort challenge.\n[END OF SECTION]\n",
        );
        let chunks = SectionChunker::new(1500).chunk(&doc);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "## Context\n\nShort context.");
        assert_eq!(chunks[1].id, "ABC-Home/Dashboard_1");
        assert_eq!(chunks[1].metadata["section"], "Challenge");
        assert_eq!(chunks[1].metadata["chunk_role"], "section_complete");
        assert_eq!(chunks[1].metadata["client"], "ABC Home");
        assert_eq!(chunks[1].metadata["project_type"], "BI_Analytics");
        assert!(!chunks[1].metadata.contains_key("function"));
    }

    #[test]
    fn long_sections_split_at_paragraphs_and_repeat_header() {
        let paragraphs = ["a".repeat(40), "b".repeat(40), "c".repeat(40)];
        let doc = document(&format!(
            "## Solution\n[START OF SECTION]\n{}\n[END OF SECTION]\n",
            paragraphs.join("\n\n")
        ));
        let chunks = SectionChunker::new(100).chunk(&doc);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, format!("## Solution\n\n{}\n\n{}", paragraphs[0], paragraphs[1]));
        assert_eq!(chunks[1].text, format!("## Solution\n\n{}", paragraphs[2]));
        assert_eq!(chunks[0].metadata["chunk_role"], "section_part_1_of_2");
        assert_eq!(chunks[1].metadata["section_chunk_index"], "1");
        assert!(chunks.iter().all(|c| c.text.len() <= 100));
    }

    #[test]
    fn oversized_paragraph_is_kept_whole() {
        let big = "x".repeat(300);
        let doc = document(&format!("## Results\n[START OF SECTION]\n{big}\n[END OF SECTION]\n"));
        let chunks = SectionChunker::new(100).chunk(&doc);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.ends_with(&big));
    }

    #[test]
    fn documents_without_sections_fall_back_to_body() {
        let chunks = SectionChunker::default().chunk(&document("Plain prose only."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata["section"], WHOLE_DOCUMENT_LABEL);
        assert!(SectionChunker::default().chunk(&document("")).is_empty());
    }
}
