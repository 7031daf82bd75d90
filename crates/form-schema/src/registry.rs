#![deny(unsafe_code)]

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use form_model::{CatalogPage, FormCatalog};

use crate::error::SchemaError;
use crate::hash::sha256_hex;
use crate::loaders::{load_mapping, load_schema};
use crate::manifest::{MANIFEST_SCHEMA, MANIFEST_SCHEMA_VERSION, Manifest, ManifestPage};

#[derive(Debug, Clone, serde::Serialize)]
pub struct CatalogSummary {
    pub catalog_dir: PathBuf,
    pub page_count: usize,
    pub field_count: usize,
    pub rule_count: usize,
    pub mapping_count: usize,
    pub pinned_file_count: usize,
    pub unpinned_file_count: usize,
}

/// Load `manifest.toml` from `catalog_dir`, verify every pinned hash and
/// build the catalog in manifest order.
pub fn verify_and_load(catalog_dir: &Path) -> Result<(FormCatalog, CatalogSummary), SchemaError> {
    let manifest = load_manifest(&catalog_dir.join("manifest.toml"))?;
    validate_manifest(&manifest)?;

    let mut summary = CatalogSummary {
        catalog_dir: catalog_dir.to_path_buf(),
        page_count: manifest.pages.len(),
        field_count: 0,
        rule_count: 0,
        mapping_count: 0,
        pinned_file_count: 0,
        unpinned_file_count: 0,
    };

    let mut pages = Vec::with_capacity(manifest.pages.len());
    for entry in &manifest.pages {
        let schema_path = catalog_dir.join(&entry.schema);
        let mapping_path = catalog_dir.join(&entry.mapping);
        for (path, pin) in [
            (&schema_path, entry.schema_sha256.as_deref()),
            (&mapping_path, entry.mapping_sha256.as_deref()),
        ] {
            if verify_file(path, pin)? {
                summary.pinned_file_count += 1;
            } else {
                summary.unpinned_file_count += 1;
            }
        }

        let schema = load_schema(&entry.name, &schema_path)?;
        let mapping = load_mapping(&entry.name, &mapping_path)?;
        summary.field_count += schema.all_fields().len();
        summary.rule_count += schema.rules().len();
        summary.mapping_count += mapping.len();
        tracing::debug!(page = %entry.name, mappings = mapping.len(), "page loaded");

        pages.push(CatalogPage {
            name: entry.name.clone(),
            title: entry.title.clone(),
            category: entry.category.clone(),
            schema,
            mapping,
        });
    }

    let catalog = FormCatalog::new(pages)?;
    tracing::info!(
        catalog = %catalog_dir.display(),
        pages = summary.page_count,
        "catalog verified"
    );
    Ok((catalog, summary))
}

fn load_manifest(path: &Path) -> Result<Manifest, SchemaError> {
    let contents = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
    toml::from_str(&contents).map_err(|e| SchemaError::Toml {
        path: path.to_path_buf(),
        source: e,
    })
}

fn validate_manifest(manifest: &Manifest) -> Result<(), SchemaError> {
    if manifest.manifest.schema != MANIFEST_SCHEMA {
        return Err(SchemaError::InvalidManifest {
            message: format!("unsupported schema: {}", manifest.manifest.schema),
        });
    }
    if manifest.manifest.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(SchemaError::InvalidManifest {
            message: format!(
                "unsupported schema_version: {}",
                manifest.manifest.schema_version
            ),
        });
    }

    let mut names: BTreeSet<&str> = BTreeSet::new();
    for page in &manifest.pages {
        validate_page(page)?;
        if !names.insert(page.name.as_str()) {
            return Err(SchemaError::InvalidManifest {
                message: format!("duplicate page: {}", page.name),
            });
        }
    }
    Ok(())
}

fn validate_page(page: &ManifestPage) -> Result<(), SchemaError> {
    if page.name.trim().is_empty() {
        return Err(SchemaError::InvalidManifest {
            message: "page name must not be empty".to_string(),
        });
    }
    validate_path(&page.schema)?;
    validate_path(&page.mapping)?;
    if let Some(sha) = &page.schema_sha256 {
        validate_sha(sha, &page.schema)?;
    }
    if let Some(sha) = &page.mapping_sha256 {
        validate_sha(sha, &page.mapping)?;
    }
    Ok(())
}

/// Returns whether the file carried a pin.
fn verify_file(path: &Path, pin: Option<&str>) -> Result<bool, SchemaError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SchemaError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            SchemaError::io(path, e)
        }
    })?;

    let Some(pin) = pin else {
        return Ok(false);
    };
    let actual = sha256_hex(&bytes);
    let expected = pin.to_ascii_lowercase();
    if actual != expected {
        return Err(SchemaError::Sha256Mismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(true)
}

fn validate_sha(sha: &str, path: &str) -> Result<(), SchemaError> {
    if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SchemaError::InvalidSha256 {
            path: PathBuf::from(path),
            message: "sha256 must be 64 hex characters".to_string(),
        });
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<(), SchemaError> {
    if path.contains('\\') {
        return Err(SchemaError::InvalidPath {
            path: PathBuf::from(path),
            message: "manifest path must use '/' separators".to_string(),
        });
    }

    let p = Path::new(path);
    if p.is_absolute() {
        return Err(SchemaError::InvalidPath {
            path: p.to_path_buf(),
            message: "manifest path must be relative".to_string(),
        });
    }
    if p.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(SchemaError::InvalidPath {
            path: p.to_path_buf(),
            message: "manifest path must not leave the catalog directory".to_string(),
        });
    }
    Ok(())
}
