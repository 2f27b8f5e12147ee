use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use casebook::{
    Aggregator, CasebookConfig, Column, Dimension, Document, Report, ReportFormat, SectionChunker,
    load_directory, parse_named, validate as validate_document,
};
use tracing::info;

const CONFIG_ENV: &str = "CASEBOOK_CONFIG";

/// Resolve the run configuration: `--config`, then `$CASEBOOK_CONFIG`, then defaults.
pub fn load_config(path: Option<PathBuf>, strict: bool) -> Result<CasebookConfig> {
    let path = path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let mut config = match path {
        Some(path) => CasebookConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => CasebookConfig::default(),
    };
    if strict {
        config.strict_schema = true;
    }
    Ok(config)
}

pub struct ValidateOutcome {
    pub output: String,
    pub failures: usize,
}

/// One line per document, with its violations indented beneath it.
pub fn validate(path: &Path, config: &CasebookConfig) -> Result<ValidateOutcome> {
    let batch = load_directory(path)
        .with_context(|| format!("Failed to load documents from {}", path.display()))?;
    let schema = config.schema();
    let mut output = String::new();
    let mut failures = 0;

    for entry in batch.entries() {
        match &entry.outcome {
            Err(err) => {
                failures += 1;
                let _ = writeln!(output, "FAIL {}: {err}", entry.name);
            }
            Ok(document) => {
                let violations = validate_document(document, &schema);
                if violations.is_empty() {
                    let _ = writeln!(output, "ok   {}", entry.name);
                    continue;
                }
                failures += 1;
                let _ = writeln!(output, "FAIL {}", entry.name);
                for violation in violations {
                    let _ = writeln!(output, "     - {violation}");
                }
            }
        }
    }

    let _ = writeln!(output, "{} documents, {failures} failed", batch.len());
    info!(documents = batch.len(), failures, "validation finished");
    Ok(ValidateOutcome { output, failures })
}

#[derive(Debug, Default)]
pub struct ReportRequest {
    pub format: Option<String>,
    pub columns: Vec<String>,
    pub filter: Option<String>,
}

pub fn report(path: &Path, config: &CasebookConfig, request: &ReportRequest) -> Result<String> {
    let format = match &request.format {
        Some(name) => name.parse::<ReportFormat>()?,
        None => config.report_format,
    };
    let columns = if request.columns.is_empty() {
        config.default_columns.clone()
    } else {
        request.columns.iter().map(|c| c.parse::<Column>()).collect::<casebook::Result<_>>()?
    };

    let aggregator = ingest(path, config)?;
    let documents: Vec<Arc<Document>> = match &request.filter {
        Some(filter) => {
            let (dimension, value) = parse_filter(filter)?;
            aggregator.query(dimension, value)
        }
        None => aggregator.documents(),
    };

    let report = Report::new(documents, &columns);
    Ok(report.render(format)?)
}

pub fn metrics(path: &Path, config: &CasebookConfig, metric_type: &str) -> Result<String> {
    let aggregator = ingest(path, config)?;
    let mut output = String::new();
    for (document, metric) in aggregator.all_by_metric_type(metric_type) {
        let _ = writeln!(
            output,
            "{}\t{}\t{}\t{}",
            document.client(),
            document.title(),
            metric.value,
            metric.unit
        );
    }
    Ok(output)
}

pub fn chunks(file: &Path, config: &CasebookConfig, max_chunk_size: Option<usize>) -> Result<String> {
    let max_chunk_size = max_chunk_size.unwrap_or(config.max_chunk_size);
    if max_chunk_size == 0 {
        bail!("--max-chunk-size must be greater than zero");
    }
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let document = parse_named(&file.display().to_string(), &text)?;
    let chunks = SectionChunker::new(max_chunk_size).chunk(&document);
    Ok(serde_json::to_string_pretty(&chunks)?)
}

fn ingest(path: &Path, config: &CasebookConfig) -> Result<Aggregator> {
    let batch = load_directory(path)
        .with_context(|| format!("Failed to load documents from {}", path.display()))?;
    let aggregator = Aggregator::new(config.schema());
    batch.ingest_into(&aggregator);
    Ok(aggregator)
}

fn parse_filter(filter: &str) -> Result<(Dimension, &str)> {
    let Some((dimension, value)) = filter.split_once('=') else {
        bail!("--where expects DIMENSION=VALUE, got '{filter}'");
    };
    Ok((dimension.parse()?, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path) {
        let study = |client: &str, industry: &str| {
            format!(
                "---\ntitle: Forecasting\nclient: {client}\nindustry: {industry}\n\
                 metrics:\n  - {{type: revenue_lift, value: 8, unit: percent}}\n---\n\
                 ## Context\n[START OF SECTION]\nAbout {client}.\n[END OF SECTION]\n"
            )
        };
        std::fs::write(dir.join("vita.md"), study("Vita Coco", "CPG")).unwrap();
        std::fs::write(dir.join("abc.md"), study("ABC Home", "Home Services")).unwrap();
        std::fs::write(dir.join("orphan.md"), "---\ntitle: Orphan\n---\n").unwrap();
    }

    #[test]
    fn validate_flags_the_document_without_client() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let outcome = validate(dir.path(), &CasebookConfig::default()).unwrap();
        assert_eq!(outcome.failures, 1);
        assert!(outcome.output.contains("orphan.md"));
        assert!(outcome.output.contains("client"));
        assert!(outcome.output.ends_with("3 documents, 1 failed\n"));
    }

    #[test]
    fn report_filters_and_orders_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let config = CasebookConfig::default();

        let all = ReportRequest {
            format: Some("csv".into()),
            columns: vec!["client".into()],
            filter: None,
        };
        assert_eq!(report(dir.path(), &config, &all).unwrap(), "client\nABC Home\nVita Coco\n");

        let cpg = ReportRequest { filter: Some("industry=cpg".into()), ..all };
        assert_eq!(report(dir.path(), &config, &cpg).unwrap(), "client\nVita Coco\n");

        let bad = ReportRequest { filter: Some("colour=red".into()), ..Default::default() };
        assert!(report(dir.path(), &config, &bad).is_err());
    }

    #[test]
    fn metrics_lists_each_matching_document() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let output = metrics(dir.path(), &CasebookConfig::default(), "revenue_lift").unwrap();
        assert_eq!(
            output,
            "ABC Home\tForecasting\t8\tpercent\nVita Coco\tForecasting\t8\tpercent\n"
        );
    }

    #[test]
    fn chunks_are_printed_as_json() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let json = chunks(&dir.path().join("vita.md"), &CasebookConfig::default(), None).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["metadata"]["section"], "Context");

        assert!(chunks(&dir.path().join("vita.md"), &CasebookConfig::default(), Some(0)).is_err());
    }
}
