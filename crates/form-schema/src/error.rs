#![deny(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid JSON for page {page}: {source}")]
    InvalidJson {
        page: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse TOML manifest {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("invalid manifest path {path}: {message}")]
    InvalidPath { path: PathBuf, message: String },

    #[error("invalid sha256 for {path}: {message}")]
    InvalidSha256 { path: PathBuf, message: String },

    #[error("missing file listed in manifest: {path}")]
    MissingFile { path: PathBuf },

    #[error("sha256 mismatch for {path} (expected {expected}, got {actual})")]
    Sha256Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("unknown field type '{kind}' for field {field} on page {page}")]
    UnknownFieldKind {
        page: String,
        field: String,
        kind: String,
    },

    #[error("invalid maxlength '{value}' for field {field} on page {page}")]
    InvalidMaxLength {
        page: String,
        field: String,
        value: String,
    },

    #[error("dependency cycle on page {page}: {cycle}")]
    DependencyCycle { page: String, cycle: String },

    #[error(transparent)]
    Model(#[from] form_model::ModelError),
}

impl SchemaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_json(page: &str, source: serde_json::Error) -> Self {
        Self::InvalidJson {
            page: page.to_string(),
            source,
        }
    }

    /// Attach the file path to an in-memory JSON parse failure.
    pub(crate) fn at_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::InvalidJson { source, .. } => Self::Json {
                path: path.into(),
                source,
            },
            other => other,
        }
    }
}
