#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};

pub const MANIFEST_SCHEMA: &str = "form-engine.catalog";
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub manifest: ManifestHeader,
    #[serde(default)]
    pub notes: Option<ManifestNotes>,
    #[serde(default)]
    pub pages: Vec<ManifestPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestHeader {
    pub schema: String,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestNotes {
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestPage {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    pub schema: String,
    #[serde(default)]
    pub schema_sha256: Option<String>,
    pub mapping: String,
    #[serde(default)]
    pub mapping_sha256: Option<String>,
}
