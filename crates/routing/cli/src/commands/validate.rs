//! `routectl validate`: compile document-type files

use crate::definition::load_document_type;
use crate::output::{self, OutputFormat};
use anyhow::bail;
use routing_engine::RouteGraph;
use serde::Serialize;
use tabled::Tabled;

/// Result of validating one file
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ValidationReport {
    #[tabled(rename = "FILE")]
    pub file: String,
    #[tabled(rename = "TYPE")]
    pub document_type: String,
    #[tabled(rename = "NODES")]
    pub nodes: usize,
    #[tabled(rename = "EDGES")]
    pub edges: usize,
    #[tabled(rename = "ORDER")]
    pub order: String,
    #[tabled(rename = "ERROR")]
    pub error: String,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.error.is_empty()
    }
}

/// Load and compile one definition file
pub fn validate_file(path: &str) -> ValidationReport {
    let mut report = ValidationReport {
        file: path.to_string(),
        document_type: String::new(),
        nodes: 0,
        edges: 0,
        order: String::new(),
        error: String::new(),
    };

    let document_type = match load_document_type(path) {
        Ok(dt) => dt,
        Err(e) => {
            report.error = format!("{:#}", e);
            return report;
        }
    };
    report.document_type = document_type.name.clone();
    report.nodes = document_type.node_count();
    report.edges = document_type.edge_count();

    match RouteGraph::compile(document_type) {
        Ok(graph) => report.order = graph.topological_order().join(" → "),
        Err(e) => report.error = e.to_string(),
    }
    report
}

pub fn execute(files: &[String], format: OutputFormat) -> anyhow::Result<()> {
    let reports: Vec<ValidationReport> = files.iter().map(|f| validate_file(f)).collect();
    let failed = reports.iter().filter(|r| !r.is_valid()).count();

    match format {
        OutputFormat::Json => output::print_json(&reports)?,
        OutputFormat::Text => {
            for report in &reports {
                if report.is_valid() {
                    output::print_success(&format!(
                        "{}: {} ({} nodes)",
                        report.file, report.document_type, report.nodes
                    ));
                } else {
                    output::print_error(&format!("{}: {}", report.file, report.error));
                }
            }
            output::print_table(reports);
        }
    }

    if failed > 0 {
        bail!("{} of {} definitions failed validation", failed, files.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_demo_definition_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/travel.toml");
        let report = validate_file(path);
        assert!(report.is_valid(), "{}", report.error);
        assert_eq!(report.document_type, "TravelRequest");
        assert_eq!(report.nodes, 7);
        assert_eq!(report.edges, 7);
        assert!(report.order.starts_with("AdHoc → Review → Split"));
        assert!(report.order.ends_with("Join → Notify"));
    }

    #[test]
    fn test_cycle_is_reported() {
        let file = write_temp(
            ".toml",
            r#"
            name = "Loop"

            [[nodes]]
            name = "A"
            node_type = "approve"
            next = ["B"]

            [[nodes]]
            name = "B"
            node_type = "approve"
            next = ["A"]
            "#,
        );
        let report = validate_file(file.path().to_str().unwrap());
        assert!(!report.is_valid());
        assert_eq!(report.document_type, "Loop");
        assert!(report.order.is_empty());
    }

    #[test]
    fn test_unknown_successor_is_reported() {
        let file = write_temp(
            ".json",
            r#"{ "name": "Broken", "nodes": [
                { "name": "AdHoc", "node_type": "ad_hoc", "next": ["Nowhere"] }
            ] }"#,
        );
        let report = validate_file(file.path().to_str().unwrap());
        assert!(report.error.contains("Nowhere"), "{}", report.error);
    }

    #[test]
    fn test_execute_fails_when_any_file_is_invalid() {
        let bad = write_temp(".toml", "name = \"Empty\"\nnodes = []\n");
        let good = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/travel.toml").to_string();
        let files = vec![good, bad.path().to_str().unwrap().to_string()];
        assert!(execute(&files, OutputFormat::Json).is_err());
        assert!(execute(&files[..1], OutputFormat::Text).is_ok());
    }
}
