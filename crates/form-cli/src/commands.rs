//! Command implementations. Each returns a report the binary renders.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use form_document::{count_fields_by_page, read_document, to_yaml_string};
use form_engine::{Completion, FormSession, SessionOptions};
use form_model::{AnswerMap, FormCatalog, LogEntry, MemoryLog};
use form_schema::{CatalogSummary, verify_and_load};
use serde::Serialize;
use tracing::{info, info_span, trace, warn};

use crate::logging::redact_value;

/// Instance count of one repeated group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub page: String,
    pub group: String,
    pub instances: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub answers: AnswerMap,
    pub groups: Vec<GroupCount>,
    pub diagnostics: Vec<LogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageProgress {
    pub page: String,
    pub title: String,
    pub completion: Completion,
    /// Answered leaves counted directly on the document.
    pub document_fields: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub pages: Vec<PageProgress>,
    pub total: Completion,
    pub diagnostics: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub yaml: String,
    pub pages: usize,
    pub diagnostics: Vec<LogEntry>,
}

pub fn load_catalog(catalog_dir: &Path) -> Result<(FormCatalog, CatalogSummary)> {
    let (catalog, summary) = verify_and_load(catalog_dir)
        .with_context(|| format!("load catalog {}", catalog_dir.display()))?;
    info!(
        catalog = %catalog_dir.display(),
        pages = summary.page_count,
        fields = summary.field_count,
        "catalog loaded"
    );
    Ok((catalog, summary))
}

pub fn run_verify(catalog_dir: &Path) -> Result<CatalogSummary> {
    let _span = info_span!("verify", catalog = %catalog_dir.display()).entered();
    let (_, summary) = load_catalog(catalog_dir)?;
    if summary.unpinned_file_count > 0 {
        warn!(unpinned = summary.unpinned_file_count, "catalog has unpinned files");
    }
    Ok(summary)
}

pub fn run_import(catalog_dir: &Path, document_path: &Path) -> Result<ImportReport> {
    let _span = info_span!("import", document = %document_path.display()).entered();
    let (mut session, log) = open_session(catalog_dir)?;
    let document = read_document(document_path)
        .with_context(|| format!("read document {}", document_path.display()))?;
    session.load_document(&document);

    for (id, value) in session.answers().iter() {
        trace!(id, value = redact_value(value), "imported answer");
    }
    let groups = group_counts(&session)?;
    info!(
        answers = session.answers().len(),
        groups = groups.len(),
        "document imported"
    );
    Ok(ImportReport {
        answers: session.answers().clone(),
        groups,
        diagnostics: report_diagnostics(&log),
    })
}

pub fn run_export(catalog_dir: &Path, answers_path: &Path) -> Result<ExportReport> {
    let _span = info_span!("export", answers = %answers_path.display()).entered();
    let (mut session, log) = open_session(catalog_dir)?;
    let contents = fs::read_to_string(answers_path)
        .with_context(|| format!("read answers {}", answers_path.display()))?;
    let answers: AnswerMap = serde_json::from_str(&contents)
        .with_context(|| format!("parse answers {}", answers_path.display()))?;
    session.replace_answers(answers);

    let document = session.export_document();
    let yaml = to_yaml_string(&document).context("serialize document")?;
    info!(pages = document.len(), "document exported");
    Ok(ExportReport {
        yaml,
        pages: document.len(),
        diagnostics: report_diagnostics(&log),
    })
}

pub fn run_progress(catalog_dir: &Path, document_path: &Path) -> Result<ProgressReport> {
    let _span = info_span!("progress", document = %document_path.display()).entered();
    let (mut session, log) = open_session(catalog_dir)?;
    let document = read_document(document_path)
        .with_context(|| format!("read document {}", document_path.display()))?;
    session.load_document(&document);
    let counts = count_fields_by_page(&document);

    let mut total = Completion::default();
    let mut pages = Vec::new();
    for (name, completion) in session.completion_by_page() {
        total = total + completion;
        let title = session
            .catalog()
            .page(name)
            .map(|page| page.title.clone())
            .unwrap_or_default();
        pages.push(PageProgress {
            page: name.to_string(),
            title,
            completion,
            document_fields: counts.by_page.get(name).copied().unwrap_or(0),
        });
    }
    Ok(ProgressReport {
        pages,
        total,
        diagnostics: report_diagnostics(&log),
    })
}

fn open_session(catalog_dir: &Path) -> Result<(FormSession, Arc<MemoryLog>)> {
    let (catalog, _) = load_catalog(catalog_dir)?;
    let log = Arc::new(MemoryLog::new());
    let session = FormSession::with_log(catalog, log.clone(), SessionOptions::default());
    Ok((session, log))
}

fn group_counts(session: &FormSession) -> Result<Vec<GroupCount>> {
    let mut counts = Vec::new();
    for page in session.catalog().page_names() {
        let groups = session.groups(page)?;
        for key in groups.keys() {
            counts.push(GroupCount {
                page: page.to_string(),
                group: key.to_string(),
                instances: groups.instance_count(key.as_str())?,
            });
        }
    }
    Ok(counts)
}

/// Diagnostics recorded so far, mirrored to `tracing`.
fn report_diagnostics(log: &MemoryLog) -> Vec<LogEntry> {
    let entries = log.entries();
    for entry in &entries {
        match &entry.data {
            Some(data) => warn!(scope = %entry.scope, data = %data, "{}", entry.message),
            None => warn!(scope = %entry.scope, "{}", entry.message),
        }
    }
    entries
}
