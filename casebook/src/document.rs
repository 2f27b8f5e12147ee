//! Data types for parsed case-study documents, their sections and metadata.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Identifier derived from a document's client and title.
///
/// Distinct `(client, title)` pairs always give distinct ids: case is kept,
/// spaces become `-`, and every other non-alphanumeric byte is `%XX` escaped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Build the identifier for a `(client, title)` pair.
    pub fn new(client: &str, title: &str) -> Self {
        Self(format!("{}/{}", escape_id(client), escape_id(title)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape_id(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b if b.is_ascii_alphanumeric() => out.push(char::from(b)),
            b' ' => out.push('-'),
            b => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// The raw front-matter mapping, in the order the keys were written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frontmatter(Mapping);

impl Frontmatter {
    pub fn new(mapping: Mapping) -> Self {
        Self(mapping)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Keys as strings. Non-string keys are rendered through YAML.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.0.keys().map(|key| match key {
            Value::String(s) => s.clone(),
            other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    /// Scalar text for `key`, trimmed. Numbers are rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Lifecycle state of an engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    Ongoing,
    Completed,
    Planned,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] =
        [ProjectStatus::Ongoing, ProjectStatus::Completed, ProjectStatus::Planned];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "Ongoing",
            Self::Completed => "Completed",
            Self::Planned => "Planned",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown project status '{s}'"))
    }
}

/// A quantified outcome such as `{type: success_rate, value: 90, unit: percent}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub value: f64,
    pub unit: String,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{}={}", self.metric_type, self.value)
        } else {
            write!(f, "{}={} {}", self.metric_type, self.value, self.unit)
        }
    }
}

/// Typed view over a document's front-matter.
///
/// Extraction is lenient: values of the wrong shape are skipped here and
/// reported by the validator instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub title: String,
    pub client: String,
    pub industry: Option<String>,
    pub project_type: Option<String>,
    pub tech_stack: BTreeSet<String>,
    pub function: Option<String>,
    pub project_status: Option<ProjectStatus>,
    pub metrics: Vec<Metric>,
    pub testimonial: bool,
    pub team: Vec<String>,
    pub duration: Option<String>,
}

impl Metadata {
    pub fn from_frontmatter(fm: &Frontmatter) -> Self {
        let non_empty = |key: &str| fm.text(key).filter(|s| !s.is_empty());

        let mut tech_stack = BTreeSet::new();
        for key in ["tech_stack", "technologies_used"] {
            if let Some(value) = fm.get(key) {
                tech_stack.extend(text_list(value));
            }
        }

        let mut metrics = Vec::new();
        if let Some(Value::Sequence(items)) = fm.get("metrics") {
            metrics.extend(items.iter().filter_map(metric_from_entry));
        }
        if let Some(Value::Mapping(entries)) = fm.get("key_metrics") {
            metrics.extend(entries.iter().filter_map(|(key, value)| {
                metric_from_keyed(key.as_str()?, value)
            }));
        }

        Self {
            title: fm.text("title").unwrap_or_default(),
            client: fm.text("client").unwrap_or_default(),
            industry: non_empty("industry"),
            project_type: non_empty("project_type"),
            tech_stack,
            function: non_empty("function"),
            project_status: fm.text("project_status").and_then(|s| s.parse().ok()),
            metrics,
            testimonial: fm.get("testimonial").and_then(Value::as_bool).unwrap_or(false),
            team: fm.get("team").map(text_list).unwrap_or_default(),
            duration: non_empty("duration"),
        }
    }
}

/// Strings from a list value, or a single string. Blank entries are dropped.
pub(crate) fn text_list(value: &Value) -> Vec<String> {
    let items: Vec<&Value> = match value {
        Value::Sequence(items) => items.iter().collect(),
        other => vec![other],
    };
    items
        .into_iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Finite value of a YAML scalar: a number, or a string that parses as one.
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn metric_from_entry(entry: &Value) -> Option<Metric> {
    let map = entry.as_mapping()?;
    let metric_type = map.get("type")?.as_str()?.trim().to_string();
    let value = numeric(map.get("value")?)?;
    let unit = map.get("unit").and_then(Value::as_str).unwrap_or_default().trim().to_string();
    Some(Metric { metric_type, value, unit })
}

fn metric_from_keyed(key: &str, value: &Value) -> Option<Metric> {
    let metric_type = key.trim().to_string();
    match value {
        Value::Mapping(map) => {
            let value = numeric(map.get("value")?)?;
            let unit =
                map.get("unit").and_then(Value::as_str).unwrap_or_default().trim().to_string();
            Some(Metric { metric_type, value, unit })
        }
        scalar => Some(Metric { metric_type, value: numeric(scalar)?, unit: String::new() }),
    }
}

/// A labelled block of prose delimited by section markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub label: String,
    pub content: String,
    /// The Markdown heading the label was taken from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
}

/// One parsed case study or capability overview. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub(crate) id: DocumentId,
    pub(crate) source: Option<String>,
    pub(crate) frontmatter: Frontmatter,
    pub(crate) sections: Vec<Section>,
    pub(crate) body: String,
    pub(crate) content_hash: String,
}

impl Document {
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn frontmatter(&self) -> &Frontmatter {
        &self.frontmatter
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, label: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.label == label)
    }

    /// Everything after the front-matter, markers included.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// SHA-256 of the raw text, hex encoded.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn metadata(&self) -> Metadata {
        Metadata::from_frontmatter(&self.frontmatter)
    }

    pub fn client(&self) -> String {
        self.frontmatter.text("client").unwrap_or_default()
    }

    pub fn title(&self) -> String {
        self.frontmatter.text("title").unwrap_or_default()
    }

    /// Canonical text with the same front-matter and the same sections in
    /// the same order. Prose outside sections is not carried over.
    pub fn skeleton(&self) -> String {
        let mut out = String::from("---\n");
        if !self.frontmatter.is_empty() {
            let yaml = serde_yaml::to_string(self.frontmatter.as_mapping()).unwrap_or_default();
            out.push_str(yaml.trim_end());
            out.push('\n');
        }
        out.push_str("---\n");
        for section in &self.sections {
            out.push_str(&format!("\n## {}\n\n", section.label));
            out.push_str(&format!("[START OF SECTION: {}]\n", section.label));
            if !section.content.is_empty() {
                out.push_str(&section.content);
                out.push('\n');
            }
            out.push_str("[END OF SECTION]\n");
        }
        out
    }
}
