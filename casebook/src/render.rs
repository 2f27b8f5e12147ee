//! Tabular reports over a set of documents.
//!
//! Rows are always sorted by client and then title, so the same input set
//! renders to the same bytes regardless of the order it was supplied in.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::document::Document;
use crate::error::{CasebookError, Result};

/// A metadata column that can appear in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Id,
    Client,
    Title,
    Industry,
    ProjectType,
    ProjectStatus,
    Function,
    TechStack,
    Metrics,
    Testimonial,
    Sections,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Id,
        Column::Client,
        Column::Title,
        Column::Industry,
        Column::ProjectType,
        Column::ProjectStatus,
        Column::Function,
        Column::TechStack,
        Column::Metrics,
        Column::Testimonial,
        Column::Sections,
    ];

    pub fn default_set() -> Vec<Column> {
        vec![Column::Client, Column::Title, Column::Industry, Column::ProjectType, Column::Metrics]
    }

    /// Key used for JSON objects and `--columns` parsing.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Client => "client",
            Self::Title => "title",
            Self::Industry => "industry",
            Self::ProjectType => "project_type",
            Self::ProjectStatus => "project_status",
            Self::Function => "function",
            Self::TechStack => "tech_stack",
            Self::Metrics => "metrics",
            Self::Testimonial => "testimonial",
            Self::Sections => "sections",
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Client => "Client",
            Self::Title => "Title",
            Self::Industry => "Industry",
            Self::ProjectType => "Project Type",
            Self::ProjectStatus => "Status",
            Self::Function => "Function",
            Self::TechStack => "Tech Stack",
            Self::Metrics => "Metrics",
            Self::Testimonial => "Testimonial",
            Self::Sections => "Sections",
        }
    }

    fn cell(&self, doc: &Document) -> String {
        let meta = doc.metadata();
        match self {
            Self::Id => doc.id().to_string(),
            Self::Client => meta.client,
            Self::Title => meta.title,
            Self::Industry => meta.industry.unwrap_or_default(),
            Self::ProjectType => meta.project_type.unwrap_or_default(),
            Self::ProjectStatus => meta.project_status.map(|s| s.to_string()).unwrap_or_default(),
            Self::Function => meta.function.unwrap_or_default(),
            Self::TechStack => meta.tech_stack.into_iter().collect::<Vec<_>>().join("; "),
            Self::Metrics => {
                meta.metrics.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
            }
            Self::Testimonial => if meta.testimonial { "yes" } else { "no" }.to_string(),
            Self::Sections => {
                doc.sections().iter().map(|s| s.label.as_str()).collect::<Vec<_>>().join("; ")
            }
        }
    }
}

impl FromStr for Column {
    type Err = CasebookError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.key() == wanted)
            .ok_or_else(|| CasebookError::Config(format!("unknown column '{s}'")))
    }
}

/// Output encoding for a [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Csv,
    Json,
    Markdown,
    #[default]
    Text,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Text => "text",
        })
    }
}

impl FromStr for ReportFormat {
    type Err = CasebookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "text" | "txt" => Ok(Self::Text),
            other => Err(CasebookError::Config(format!("unknown report format '{other}'"))),
        }
    }
}

/// One row per document, with cells in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Report {
    /// Build a report. A `(client, title)` pair appearing more than once is
    /// kept once.
    pub fn new<I>(documents: I, columns: &[Column]) -> Self
    where
        I: IntoIterator,
        I::Item: Borrow<Document>,
    {
        let mut seen = HashSet::new();
        let mut keyed: Vec<((String, String), Vec<String>)> = Vec::new();
        for item in documents {
            let doc: &Document = item.borrow();
            let key = (doc.client(), doc.title());
            if !seen.insert(key.clone()) {
                continue;
            }
            let cells = columns.iter().map(|c| c.cell(doc)).collect();
            keyed.push((key, cells));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        Self { columns: columns.to_vec(), rows: keyed.into_iter().map(|(_, row)| row).collect() }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Csv => self.to_csv(),
            ReportFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| CasebookError::Render(e.to_string())),
            ReportFormat::Markdown => Ok(self.to_markdown()),
            ReportFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_csv(&self) -> Result<String> {
        let render_err = |e: csv::Error| CasebookError::Render(e.to_string());
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(self.columns.iter().map(Column::key)).map_err(render_err)?;
        for row in &self.rows {
            writer.write_record(row).map_err(render_err)?;
        }
        let bytes = writer.into_inner().map_err(|e| CasebookError::Render(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CasebookError::Render(e.to_string()))
    }

    fn to_markdown(&self) -> String {
        let line = |cells: Vec<String>| format!("| {} |\n", cells.join(" | "));
        let mut out = line(self.columns.iter().map(|c| c.header().to_string()).collect());
        out.push_str(&line(self.columns.iter().map(|_| "---".to_string()).collect()));
        for row in &self.rows {
            out.push_str(&line(row.iter().map(|cell| cell.replace('|', "\\|")).collect()));
        }
        out
    }

    fn to_text(&self) -> String {
        let mut widths: Vec<usize> =
            self.columns.iter().map(|c| c.header().chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |cells: Vec<&str>| {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            format!("{}\n", padded.join("  ").trim_end())
        };

        let mut out = line(self.columns.iter().map(Column::header).collect());
        let rules: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&line(rules.iter().map(String::as_str).collect()));
        for row in &self.rows {
            out.push_str(&line(row.iter().map(String::as_str).collect()));
        }
        out
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Row<'a>(&'a [Column], &'a [String]);

        impl Serialize for Row<'_> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (column, cell) in self.0.iter().zip(self.1) {
                    map.serialize_entry(column.key(), cell)?;
                }
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Row(&self.columns, row))?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn doc(client: &str, title: &str) -> Document {
        parse_document(&format!(
            "---\ntitle: {title}\nclient: {client}\nindustry: Retail\ntech_stack: [Snowflake, dbt]\nmetrics:\n  - {{type: uplift, value: 12, unit: percent}}\n---\n"
        ))
        .unwrap()
    }

    #[test]
    fn rows_sort_by_client_then_title() {
        let docs =
            vec![doc("Vita Coco", "Forecast"), doc("ABC Home", "Zeta"), doc("ABC Home", "Andi")];
        let report = Report::new(&docs, &[Column::Client, Column::Title]);
        let order: Vec<_> = report.rows().iter().map(|r| r.join("/")).collect();
        assert_eq!(order, vec!["ABC Home/Andi", "ABC Home/Zeta", "Vita Coco/Forecast"]);
    }

    #[test]
    fn duplicate_documents_collapse() {
        let d = doc("ABC Home", "Andi");
        let report = Report::new([&d, &d], &Column::default_set());
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn clients_differing_by_case_get_separate_rows() {
        let report = Report::new([doc("ACME", "Study"), doc("Acme", "Study")], &[Column::Client]);
        assert_eq!(report.render(ReportFormat::Csv).unwrap(), "client\nACME\nAcme\n");
    }

    #[test]
    fn csv_and_markdown_render_cells() {
        let columns = [Column::Client, Column::TechStack, Column::Metrics];
        let report = Report::new([doc("ABC Home", "Andi")], &columns);
        assert_eq!(
            report.render(ReportFormat::Csv).unwrap(),
            "client,tech_stack,metrics\nABC Home,Snowflake; dbt,uplift=12 percent\n"
        );
        assert_eq!(
            report.render(ReportFormat::Markdown).unwrap(),
            "| Client | Tech Stack | Metrics |\n| --- | --- | --- |\n| ABC Home | Snowflake; dbt | uplift=12 percent |\n"
        );
    }

    #[test]
    fn json_keeps_column_order() {
        let report = Report::new([doc("ABC Home", "Andi")], &[Column::Title, Column::Client]);
        let json = report.render(ReportFormat::Json).unwrap();
        assert!(json.find("\"title\"").unwrap() < json.find("\"client\"").unwrap());
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["client"], "ABC Home");
    }

    #[test]
    fn text_table_aligns_columns() {
        let report = Report::new([doc("ABC Home", "Andi")], &[Column::Client, Column::Title]);
        assert_eq!(
            report.render(ReportFormat::Text).unwrap(),
            "Client    Title\n--------  -----\nABC Home  Andi\n"
        );
    }

    #[test]
    fn columns_and_formats_parse() {
        assert_eq!("tech-stack".parse::<Column>().unwrap(), Column::TechStack);
        assert!("budget".parse::<Column>().is_err());
        assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
