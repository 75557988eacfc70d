//! Loading document types and scripts from TOML or JSON files

use anyhow::{bail, Context};
use routing_types::DocumentType;
use serde::de::DeserializeOwned;
use std::path::Path;

/// File formats chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(FileFormat::Toml),
            Some("json") => Ok(FileFormat::Json),
            other => bail!(
                "unsupported file extension {:?} for {} (expected .toml or .json)",
                other.unwrap_or(""),
                path.display()
            ),
        }
    }
}

/// Parse a string in the given format
pub fn parse_str<T: DeserializeOwned>(source: &str, format: FileFormat) -> anyhow::Result<T> {
    match format {
        FileFormat::Toml => Ok(toml::from_str(source)?),
        FileFormat::Json => Ok(serde_json::from_str(source)?),
    }
}

/// Read and parse a file, picking the format from its extension
pub fn load_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let format = FileFormat::from_path(path)?;
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_str(&source, format).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn load_document_type(path: impl AsRef<Path>) -> anyhow::Result<DocumentType> {
    let path = path.as_ref();
    let document_type: DocumentType = load_file(path)?;
    tracing::debug!(
        file = %path.display(),
        document_type = %document_type.name,
        nodes = document_type.node_count(),
        "Definition loaded"
    );
    Ok(document_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use routing_types::{JoinPolicy, NodeType};
    use std::io::Write;

    const TRAVEL: &str = include_str!("../demos/travel.toml");

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            FileFormat::from_path(Path::new("a/b.toml")).unwrap(),
            FileFormat::Toml
        );
        assert_eq!(
            FileFormat::from_path(Path::new("b.json")).unwrap(),
            FileFormat::Json
        );
        assert!(FileFormat::from_path(Path::new("b.yaml")).is_err());
        assert!(FileFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_parse_demo_definition() {
        let dt: DocumentType = parse_str(TRAVEL, FileFormat::Toml).unwrap();
        assert_eq!(dt.name, "TravelRequest");
        assert_eq!(dt.node_count(), 7);
        assert_eq!(
            dt.node("Join").unwrap().node_type,
            NodeType::Join {
                policy: JoinPolicy::All
            }
        );
        assert_eq!(dt.superusers.len(), 1);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "name": "Memo",
                "nodes": [
                    {{ "name": "AdHoc", "node_type": "ad_hoc" }}
                ]
            }}"#
        )
        .unwrap();

        let dt = load_document_type(file.path()).unwrap();
        assert_eq!(dt.name, "Memo");
        assert_eq!(dt.node("AdHoc").unwrap().node_type, NodeType::AdHoc);
    }

    #[test]
    fn test_load_reports_file_name() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "name = ").unwrap();
        let err = load_document_type(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse"));
    }
}
