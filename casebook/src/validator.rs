//! Schema validation for parsed documents.
//!
//! Validation never fails: every problem with the front-matter, including
//! values of the wrong shape, is reported as a [`Violation`].

use std::fmt;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::document::{Document, Frontmatter, numeric};
use crate::schema::{FieldKind, FieldSpec, Schema};

/// The rule a field broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    Missing,
    Empty,
    WrongType { expected: String },
    NotAllowed { value: String, allowed: Vec<String> },
    NotNumeric { value: String },
    MissingUnit,
    UnknownField,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "required field is missing"),
            Self::Empty => write!(f, "value must not be empty"),
            Self::WrongType { expected } => write!(f, "expected {expected}"),
            Self::NotAllowed { value, allowed } => {
                write!(f, "'{value}' is not one of: {}", allowed.join(", "))
            }
            Self::NotNumeric { value } => write!(f, "'{value}' is not a number"),
            Self::MissingUnit => write!(f, "unit must be a non-empty label"),
            Self::UnknownField => write!(f, "field is not declared in the schema"),
        }
    }
}

/// A single field-level problem. `field` is a path such as `metrics[1].unit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    #[serde(flatten)]
    pub rule: Rule,
}

impl Violation {
    pub fn new(field: impl Into<String>, rule: Rule) -> Self {
        Self { field: field.into(), rule }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.rule)
    }
}

/// Checks documents against a fixed [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct Validator {
    schema: Schema,
}

impl Validator {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn validate(&self, document: &Document) -> Vec<Violation> {
        validate(document, &self.schema)
    }
}

/// Validate `document` against `schema`. An empty result means valid.
pub fn validate(document: &Document, schema: &Schema) -> Vec<Violation> {
    validate_frontmatter(document.frontmatter(), schema)
}

pub fn validate_frontmatter(frontmatter: &Frontmatter, schema: &Schema) -> Vec<Violation> {
    let mut out = Vec::new();

    for spec in &schema.fields {
        match frontmatter.get(&spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    out.push(Violation::new(&spec.name, Rule::Missing));
                }
            }
            Some(value) => check_field(spec, value, &mut out),
        }
    }

    if schema.strict {
        for key in frontmatter.keys() {
            if schema.field(&key).is_none() {
                out.push(Violation::new(key, Rule::UnknownField));
            }
        }
    }

    out
}

fn check_field(spec: &FieldSpec, value: &Value, out: &mut Vec<Violation>) {
    let name = spec.name.as_str();
    match &spec.kind {
        FieldKind::Text => check_text(name, value, out),
        FieldKind::TextSet => match value {
            Value::String(s) if s.trim().is_empty() => out.push(Violation::new(name, Rule::Empty)),
            Value::String(_) => {}
            Value::Sequence(items) => {
                if items.is_empty() && spec.required {
                    out.push(Violation::new(name, Rule::Empty));
                }
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        out.push(wrong_type(format!("{name}[{i}]"), "string"));
                    }
                }
            }
            _ => out.push(wrong_type(name, spec.kind.describe())),
        },
        FieldKind::Boolean => {
            if !value.is_bool() {
                out.push(wrong_type(name, spec.kind.describe()));
            }
        }
        FieldKind::Enumeration { allowed } => match value.as_str() {
            Some(s) if allowed.iter().any(|a| a == s.trim()) => {}
            Some(s) => out.push(Violation::new(
                name,
                Rule::NotAllowed { value: s.to_string(), allowed: allowed.clone() },
            )),
            None => out.push(wrong_type(name, spec.kind.describe())),
        },
        FieldKind::Metrics => match value {
            Value::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    let path = format!("{name}[{i}]");
                    match item.as_mapping() {
                        Some(entry) => check_metric_entry(&path, entry, out),
                        None => out.push(wrong_type(path, "metric mapping")),
                    }
                }
            }
            Value::Mapping(entries) => {
                for (key, item) in entries {
                    let Some(key) = key.as_str() else {
                        out.push(wrong_type(name, "metric type names"));
                        continue;
                    };
                    let path = format!("{name}.{key}");
                    match item {
                        Value::Mapping(entry) => {
                            check_value(&path, entry, out);
                            check_unit(&path, entry, out);
                        }
                        scalar if numeric(scalar).is_some() => {
                            out.push(Violation::new(format!("{path}.unit"), Rule::MissingUnit));
                        }
                        scalar => out.push(Violation::new(
                            path,
                            Rule::NotNumeric { value: scalar_text(scalar) },
                        )),
                    }
                }
            }
            _ => out.push(wrong_type(name, spec.kind.describe())),
        },
    }
}

fn check_text(path: &str, value: &Value, out: &mut Vec<Violation>) {
    match value {
        Value::String(s) if s.trim().is_empty() => out.push(Violation::new(path, Rule::Empty)),
        Value::String(_) | Value::Number(_) => {}
        _ => out.push(wrong_type(path, "string")),
    }
}

fn check_metric_entry(path: &str, entry: &Mapping, out: &mut Vec<Violation>) {
    let type_path = format!("{path}.type");
    match entry.get("type") {
        None | Some(Value::Null) => out.push(Violation::new(type_path, Rule::Missing)),
        Some(value) => check_text(&type_path, value, out),
    }
    check_value(path, entry, out);
    check_unit(path, entry, out);
}

fn check_value(path: &str, entry: &Mapping, out: &mut Vec<Violation>) {
    let value_path = format!("{path}.value");
    match entry.get("value") {
        None | Some(Value::Null) => out.push(Violation::new(value_path, Rule::Missing)),
        Some(value) if numeric(value).is_none() => out.push(Violation::new(
            value_path,
            Rule::NotNumeric { value: scalar_text(value) },
        )),
        Some(_) => {}
    }
}

fn check_unit(path: &str, entry: &Mapping, out: &mut Vec<Violation>) {
    let has_unit = entry.get("unit").and_then(Value::as_str).is_some_and(|u| !u.trim().is_empty());
    if !has_unit {
        out.push(Violation::new(format!("{path}.unit"), Rule::MissingUnit));
    }
}

fn wrong_type(path: impl Into<String>, expected: &str) -> Violation {
    Violation::new(path, Rule::WrongType { expected: expected.to_string() })
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
    }
}
