use std::path::Path;

use form_model::Document;

use crate::error::DocumentError;

/// Parse a YAML (or JSON) document. Blank input is an empty document.
pub fn parse_document(contents: &str) -> Result<Document, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(Document::new());
    }
    serde_yaml::from_str(contents)
}

pub fn read_document(path: &Path) -> Result<Document, DocumentError> {
    let contents = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_document(&contents).map_err(|e| DocumentError::Yaml {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn to_yaml_string(document: &Document) -> Result<String, DocumentError> {
    serde_yaml::to_string(document).map_err(DocumentError::Serialize)
}

pub fn write_document(path: &Path, document: &Document) -> Result<(), DocumentError> {
    let contents = to_yaml_string(document)?;
    std::fs::write(path, contents).map_err(|e| DocumentError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
