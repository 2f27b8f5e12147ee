//! In-memory index over validated case studies.
//!
//! [`Aggregator`] keeps documents keyed by `(client, title)` behind a
//! `std::sync::RwLock`. Writers are serialized; readers run concurrently and
//! always observe a fully rebuilt index.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::{Document, DocumentId, Metric};
use crate::error::{CasebookError, Result};
use crate::schema::Schema;
use crate::validator::validate;

/// A facet the index can be queried by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Client,
    Industry,
    ProjectType,
    TechStack,
    MetricType,
    Function,
    ProjectStatus,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Client,
        Dimension::Industry,
        Dimension::ProjectType,
        Dimension::TechStack,
        Dimension::MetricType,
        Dimension::Function,
        Dimension::ProjectStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Industry => "industry",
            Self::ProjectType => "project_type",
            Self::TechStack => "tech_stack",
            Self::MetricType => "metric_type",
            Self::Function => "function",
            Self::ProjectStatus => "project_status",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = CasebookError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| CasebookError::Config(format!("unknown dimension '{s}'")))
    }
}

/// What `add` did with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Inserted,
    /// An entry with the same client and title existed and was overwritten.
    Replaced,
    /// The same content was already stored.
    Unchanged,
}

type IdentityKey = (String, String);

#[derive(Debug, Default)]
struct State {
    documents: BTreeMap<IdentityKey, Arc<Document>>,
    by_id: HashMap<DocumentId, IdentityKey>,
    index: HashMap<Dimension, HashMap<String, BTreeSet<DocumentId>>>,
}

impl State {
    fn rebuild(&mut self) {
        let mut index: HashMap<Dimension, HashMap<String, BTreeSet<DocumentId>>> = HashMap::new();
        self.by_id.clear();

        for (key, doc) in &self.documents {
            self.by_id.insert(doc.id().clone(), key.clone());
            for (dimension, value) in facets(doc) {
                index
                    .entry(dimension)
                    .or_default()
                    .entry(index_key(&value))
                    .or_default()
                    .insert(doc.id().clone());
            }
        }

        self.index = index;
    }

    fn resolve(&self, ids: &BTreeSet<DocumentId>) -> Vec<Arc<Document>> {
        let mut keys: Vec<&IdentityKey> = ids.iter().filter_map(|id| self.by_id.get(id)).collect();
        keys.sort();
        keys.into_iter().filter_map(|key| self.documents.get(key)).cloned().collect()
    }
}

fn facets(doc: &Document) -> Vec<(Dimension, String)> {
    let meta = doc.metadata();
    let mut out = vec![(Dimension::Client, meta.client)];
    out.extend(meta.industry.map(|v| (Dimension::Industry, v)));
    out.extend(meta.project_type.map(|v| (Dimension::ProjectType, v)));
    out.extend(meta.function.map(|v| (Dimension::Function, v)));
    out.extend(meta.project_status.map(|v| (Dimension::ProjectStatus, v.to_string())));
    out.extend(meta.tech_stack.into_iter().map(|v| (Dimension::TechStack, v)));
    out.extend(meta.metrics.into_iter().map(|m| (Dimension::MetricType, m.metric_type)));
    out
}

fn index_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Collects validated documents and answers facet queries over them.
///
/// # Example
///
/// ```rust,ignore
/// use casebook::{Aggregator, Dimension, Schema, parse_document};
///
/// let aggregator = Aggregator::new(Schema::case_study());
/// aggregator.add(&parse_document(text)?)?;
/// let retail = aggregator.query(Dimension::Industry, "E-commerce");
/// ```
#[derive(Debug, Default)]
pub struct Aggregator {
    schema: Schema,
    state: RwLock<State>,
}

impl Aggregator {
    pub fn new(schema: Schema) -> Self {
        Self { schema, state: RwLock::new(State::default()) }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate and store a document.
    ///
    /// A document with the same client and title as a stored one replaces it.
    ///
    /// # Errors
    ///
    /// Returns [`CasebookError::SchemaViolation`] if the document breaks the
    /// schema. Nothing is stored in that case.
    pub fn add(&self, document: &Document) -> Result<AddOutcome> {
        let violations = validate(document, &self.schema);
        if !violations.is_empty() {
            warn!(
                document.id = %document.id(),
                violations = violations.len(),
                "rejected document failing schema"
            );
            return Err(CasebookError::SchemaViolation {
                id: document.id().to_string(),
                violations,
            });
        }

        let key = (document.client(), document.title());
        let mut state = self.write();
        let outcome = match state.documents.get(&key) {
            Some(existing) if existing.content_hash() == document.content_hash() => {
                return Ok(AddOutcome::Unchanged);
            }
            Some(_) => AddOutcome::Replaced,
            None => AddOutcome::Inserted,
        };

        state.documents.insert(key, Arc::new(document.clone()));
        state.rebuild();
        debug!(
            document.id = %document.id(),
            ?outcome,
            total = state.documents.len(),
            "indexed document"
        );
        Ok(outcome)
    }

    pub fn remove(&self, client: &str, title: &str) -> Option<Arc<Document>> {
        let mut state = self.write();
        let removed = state.documents.remove(&(client.to_string(), title.to_string()))?;
        state.rebuild();
        Some(removed)
    }

    pub fn get(&self, id: &DocumentId) -> Option<Arc<Document>> {
        let state = self.read();
        state.by_id.get(id).and_then(|key| state.documents.get(key)).cloned()
    }

    /// Documents whose `dimension` matches `value`, ignoring case, ordered by
    /// client then title.
    pub fn query(&self, dimension: Dimension, value: &str) -> Vec<Arc<Document>> {
        let state = self.read();
        match state.index.get(&dimension).and_then(|values| values.get(&index_key(value))) {
            Some(ids) => state.resolve(ids),
            None => Vec::new(),
        }
    }

    pub fn query_ids(&self, dimension: Dimension, value: &str) -> BTreeSet<DocumentId> {
        self.read()
            .index
            .get(&dimension)
            .and_then(|values| values.get(&index_key(value)))
            .cloned()
            .unwrap_or_default()
    }

    /// Like [`Aggregator::query`], but an unknown dimension name yields an
    /// empty result instead of an error.
    pub fn query_named(&self, dimension: &str, value: &str) -> Vec<Arc<Document>> {
        match dimension.parse() {
            Ok(dimension) => self.query(dimension, value),
            Err(_) => Vec::new(),
        }
    }

    /// Every metric of `metric_type`, paired with its document, in document
    /// order and then in the order the metrics were declared.
    pub fn all_by_metric_type(&self, metric_type: &str) -> Vec<(Arc<Document>, Metric)> {
        let wanted = index_key(metric_type);
        let state = self.read();
        let Some(ids) = state.index.get(&Dimension::MetricType).and_then(|v| v.get(&wanted)) else {
            return Vec::new();
        };

        state
            .resolve(ids)
            .into_iter()
            .flat_map(|doc| {
                doc.metadata()
                    .metrics
                    .into_iter()
                    .filter(|m| index_key(&m.metric_type) == wanted)
                    .map(|m| (Arc::clone(&doc), m))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Distinct values seen for a facet, in index (lowercased) form.
    pub fn values(&self, dimension: Dimension) -> BTreeSet<String> {
        self.read()
            .index
            .get(&dimension)
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every stored document, ordered by client then title.
    pub fn documents(&self) -> Vec<Arc<Document>> {
        self.read().documents.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn doc(client: &str, title: &str, extra: &str) -> Document {
        parse_document(&format!(
            "---\ntitle: {title}\nclient: {client}\nindustry: E-commerce\n{extra}\n---\nBody\n"
        ))
        .unwrap()
    }

    #[test]
    fn add_reports_insert_replace_and_unchanged() {
        let agg = Aggregator::default();
        let first = doc("PPTG", "Returns", "function: Ops");
        assert_eq!(agg.add(&first).unwrap(), AddOutcome::Inserted);
        assert_eq!(agg.add(&first).unwrap(), AddOutcome::Unchanged);

        let revised = doc("PPTG", "Returns", "function: Support");
        assert_eq!(agg.add(&revised).unwrap(), AddOutcome::Replaced);
        assert_eq!(agg.len(), 1);
        assert!(agg.query(Dimension::Function, "ops").is_empty());
        assert_eq!(agg.query(Dimension::Function, "SUPPORT").len(), 1);
    }

    #[test]
    fn clients_differing_by_case_are_queried_separately() {
        let agg = Aggregator::default();
        let metric = "metrics: [{type: uptime, value: 99, unit: percent}]";
        let upper = doc("ACME", "Study", &format!("function: Ops\n{metric}"));
        let lower = doc("Acme", "Study", "function: Support");
        agg.add(&upper).unwrap();
        agg.add(&lower).unwrap();
        assert_eq!(agg.len(), 2);
        assert_ne!(upper.id(), lower.id());

        let ops: Vec<String> =
            agg.query(Dimension::Function, "ops").iter().map(|d| d.client()).collect();
        assert_eq!(ops, vec!["ACME"]);
        let support: Vec<String> =
            agg.query(Dimension::Function, "support").iter().map(|d| d.client()).collect();
        assert_eq!(support, vec!["Acme"]);

        let uptime = agg.all_by_metric_type("uptime");
        assert_eq!(uptime.len(), 1);
        assert_eq!(uptime[0].0.client(), "ACME");
        assert_eq!(agg.query(Dimension::Client, "acme").len(), 2);
    }

    #[test]
    fn invalid_documents_are_not_stored() {
        let agg = Aggregator::default();
        let missing_client = parse_document("---\ntitle: t\nindustry: Retail\n---\n").unwrap();
        let err = agg.add(&missing_client).unwrap_err();
        assert_eq!(err.violations().unwrap()[0].field, "client");
        assert!(agg.is_empty());
        assert!(agg.query(Dimension::Industry, "Retail").is_empty());
    }

    #[test]
    fn unitless_key_metrics_keep_a_document_out_of_the_index() {
        let agg = Aggregator::default();
        let legacy = doc("PPTG", "Returns", "key_metrics:\n  error_reduction: 90");
        assert_eq!(legacy.metadata().metrics.len(), 1);

        let err = agg.add(&legacy).unwrap_err();
        assert_eq!(err.violations().unwrap()[0].field, "key_metrics.error_reduction.unit");
        assert!(agg.all_by_metric_type("error_reduction").is_empty());
    }

    #[test]
    fn unmatched_queries_return_empty() {
        let agg = Aggregator::default();
        agg.add(&doc("Vita Coco", "Forecasting", "")).unwrap();
        assert!(agg.query(Dimension::TechStack, "Rust").is_empty());
        assert!(agg.query_ids(Dimension::Client, "nobody").is_empty());
        assert!(agg.query_named("budget", "10").is_empty());
        assert!(agg.all_by_metric_type("uptime").is_empty());
        assert_eq!(agg.query_named("client", "vita coco").len(), 1);
    }

    #[test]
    fn remove_drops_document_from_index() {
        let agg = Aggregator::default();
        let d = doc("ABC Home", "Andi", "tech_stack: [n8n]");
        agg.add(&d).unwrap();
        assert!(agg.get(d.id()).is_some());
        assert!(agg.remove("ABC Home", "Andi").is_some());
        assert!(agg.get(d.id()).is_none());
        assert!(agg.values(Dimension::TechStack).is_empty());
        assert!(agg.remove("ABC Home", "Andi").is_none());
    }

    #[test]
    fn dimension_names_parse_loosely() {
        assert_eq!("tech-stack".parse::<Dimension>().unwrap(), Dimension::TechStack);
        assert_eq!("Industry".parse::<Dimension>().unwrap(), Dimension::Industry);
        assert!("budget".parse::<Dimension>().is_err());
    }
}
