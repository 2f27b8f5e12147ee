//! Declarative front-matter schemas.

use serde::{Deserialize, Serialize};

use crate::document::ProjectStatus;

/// Project categories accepted by the default case-study schema.
pub const PROJECT_TYPES: &[&str] = &[
    "AI_ML",
    "BI_Analytics",
    "Workflow_Automation",
    "Data_Engineering",
    "Web_Development",
    "Mobile_App",
    "API_Integration",
    "Cloud_Migration",
    "Database_Optimization",
    "ETL_Pipeline",
    "Dashboard",
    "Chatbot",
    "Process_Automation",
    "System_Integration",
    "Data_Migration",
];

/// The shape a front-matter value must have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// A non-empty string. Numbers are accepted as their textual form.
    Text,
    /// A list of strings, or a single string.
    TextSet,
    Boolean,
    /// Either a list of `{type, value, unit}` entries or a mapping from
    /// metric type to `{value, unit}`.
    Metrics,
    /// A string drawn from a fixed set, compared exactly.
    Enumeration { allowed: Vec<String> },
}

impl FieldKind {
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enumeration { allowed: values.into_iter().map(Into::into).collect() }
    }

    /// Human-readable name used in violation messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::TextSet => "list of strings",
            Self::Boolean => "boolean",
            Self::Metrics => "list of metrics",
            Self::Enumeration { .. } => "enumerated string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, required: true }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, required: false }
    }
}

/// An ordered set of field rules. Violations are reported in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldSpec>,
    /// Report fields the schema does not declare.
    #[serde(default)]
    pub strict: bool,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields, strict: false }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The schema for client case studies and capability overviews.
    pub fn case_study() -> Self {
        use FieldKind::*;
        Self::new(vec![
            FieldSpec::required("title", Text),
            FieldSpec::required("client", Text),
            FieldSpec::required("industry", Text),
            FieldSpec::optional(
                "project_type",
                FieldKind::enumeration(PROJECT_TYPES.iter().copied()),
            ),
            FieldSpec::optional("tech_stack", TextSet),
            FieldSpec::optional("technologies_used", TextSet),
            FieldSpec::optional("function", Text),
            FieldSpec::optional(
                "project_status",
                FieldKind::enumeration(ProjectStatus::ALL.iter().map(ProjectStatus::as_str)),
            ),
            FieldSpec::optional("metrics", Metrics),
            FieldSpec::optional("key_metrics", Metrics),
            FieldSpec::optional("testimonial", Boolean),
            FieldSpec::optional("team", TextSet),
            FieldSpec::optional("duration", Text),
        ])
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::case_study()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_study_requires_identity_fields() {
        let schema = Schema::case_study();
        let required: Vec<_> =
            schema.fields.iter().filter(|f| f.required).map(|f| f.name.as_str()).collect();
        assert_eq!(required, vec!["title", "client", "industry"]);
        assert!(!schema.strict);
    }

    #[test]
    fn schema_loads_from_json() {
        let schema: Schema = serde_json::from_value(serde_json::json!({
            "strict": true,
            "fields": [
                {"name": "title", "kind": "text", "required": true},
                {"name": "stage", "kind": "enumeration", "allowed": ["alpha", "beta"]}
            ]
        }))
        .unwrap();
        assert!(schema.strict);
        assert_eq!(
            schema.field("stage").map(|f| &f.kind),
            Some(&FieldKind::enumeration(["alpha", "beta"]))
        );
        assert!(!schema.field("stage").unwrap().required);
    }
}
