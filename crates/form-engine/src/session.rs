//! Form session state management.
//!
//! A [`FormSession`] owns the single answer map shared by every page of a
//! catalog, plus each page's repeated groups and visibility state. Every
//! state transition goes through it so visibility never drifts from what the
//! answers imply.

use std::sync::Arc;

use form_document::{Codec, ImportedDocument};
use form_model::{
    AnswerMap, DiagnosticLog, Document, FieldDefinition, FormCatalog, NOT_APPLICABLE, TracingLog,
};
use serde::{Deserialize, Serialize};

use crate::completion::{Completion, count_completion};
use crate::error::{EngineError, Result};
use crate::groups::RepeatedGroupManager;
use crate::resolver::{ChangeOutcome, DEFAULT_MAX_CHAIN_DEPTH, DependencyResolver, VisibilityState};

/// Tunables for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Nested chain depth at which expansion stops.
    pub max_chain_depth: usize,
    /// Value stored for fields whose not-applicable toggle is set on import.
    pub not_applicable: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            not_applicable: NOT_APPLICABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct PageSession {
    groups: RepeatedGroupManager,
    state: VisibilityState,
}

/// Answers and derived state for a whole catalog.
pub struct FormSession {
    catalog: FormCatalog,
    pages: Vec<PageSession>,
    answers: AnswerMap,
    log: Arc<dyn DiagnosticLog>,
    options: SessionOptions,
}

impl FormSession {
    /// Create a session with no answers, logging through `tracing`.
    pub fn new(catalog: FormCatalog) -> Self {
        Self::with_log(catalog, Arc::new(TracingLog), SessionOptions::default())
    }

    pub fn with_log(
        catalog: FormCatalog,
        log: Arc<dyn DiagnosticLog>,
        options: SessionOptions,
    ) -> Self {
        let pages = catalog
            .pages()
            .iter()
            .map(|page| PageSession {
                groups: RepeatedGroupManager::from_schema(&page.schema),
                state: VisibilityState::default(),
            })
            .collect();
        let mut session = Self {
            catalog,
            pages,
            answers: AnswerMap::new(),
            log,
            options,
        };
        session.rederive_all();
        session
    }

    pub fn catalog(&self) -> &FormCatalog {
        &self.catalog
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self, page: &str) -> Result<&VisibilityState> {
        let position = self.position(page)?;
        Ok(&self.pages[position].state)
    }

    /// Visible fields of `page` in display order.
    pub fn visible_fields(&self, page: &str) -> Result<&[FieldDefinition]> {
        Ok(self.state(page)?.fields())
    }

    pub fn groups(&self, page: &str) -> Result<&RepeatedGroupManager> {
        let position = self.position(page)?;
        Ok(&self.pages[position].groups)
    }

    /// Store an answer and update visibility when it belongs to a visible
    /// choice field of `page`.
    pub fn set_answer(
        &mut self,
        page: &str,
        id: &str,
        value: impl Into<String>,
    ) -> Result<ChangeOutcome> {
        let position = self.position(page)?;
        self.answers.set(id, value);
        Ok(self.apply_change(position, id))
    }

    /// Remove an answer; visibility follows as for [`Self::set_answer`].
    pub fn clear_answer(&mut self, page: &str, id: &str) -> Result<ChangeOutcome> {
        let position = self.position(page)?;
        self.answers.remove(id);
        Ok(self.apply_change(position, id))
    }

    /// Add an instance to a repeated group; returns its group index.
    pub fn add_group_instance(&mut self, page: &str, label: &str) -> Result<usize> {
        let position = self.position(page)?;
        let index = self.pages[position].groups.add_instance(label)?;
        self.rederive(position);
        Ok(index)
    }

    /// Remove instance `index` of a repeated group, shifting later instances
    /// down. Returns `None` when the group was already empty.
    pub fn remove_group_instance(
        &mut self,
        page: &str,
        label: &str,
        index: usize,
    ) -> Result<Option<usize>> {
        let position = self.position(page)?;
        let removed = self.pages[position].groups.remove_instance(
            label,
            index,
            &mut self.answers,
            self.log.as_ref(),
        )?;
        if removed.is_some() {
            self.rederive(position);
        }
        Ok(removed)
    }

    pub fn remove_last_group_instance(&mut self, page: &str, label: &str) -> Result<Option<usize>> {
        let position = self.position(page)?;
        let removed =
            self.pages[position]
                .groups
                .remove_last(label, &mut self.answers, self.log.as_ref())?;
        if removed.is_some() {
            self.rederive(position);
        }
        Ok(removed)
    }

    pub fn completion(&self, page: &str) -> Result<Completion> {
        let state = self.state(page)?;
        Ok(count_completion(state.fields(), &self.answers))
    }

    /// Completion of every page in catalog order.
    pub fn completion_by_page(&self) -> Vec<(&str, Completion)> {
        self.catalog
            .pages()
            .iter()
            .zip(&self.pages)
            .map(|(page, session)| {
                (
                    page.name.as_str(),
                    count_completion(session.state.fields(), &self.answers),
                )
            })
            .collect()
    }

    /// Replace all answers with the contents of `document`.
    ///
    /// Group instances are recreated to cover every imported index, then
    /// every page is derived from scratch.
    pub fn load_document(&mut self, document: &Document) -> ImportedDocument {
        let imported = self.codec().import_document(document, &self.catalog);
        self.replace_answers(imported.answers.clone());
        tracing::info!(
            answers = self.answers.len(),
            pages = self.catalog.len(),
            "document loaded"
        );
        imported
    }

    /// Replace all answers, rebuild group instances and re-derive every page.
    pub fn replace_answers(&mut self, answers: AnswerMap) {
        self.answers = answers;
        for page in &mut self.pages {
            page.groups.clear();
            let keys: Vec<String> = page.groups.keys().map(ToString::to_string).collect();
            for key in keys {
                let highest = page
                    .groups
                    .definition(&key)
                    .map(|definition| definition.highest_answered_index(&self.answers))
                    .unwrap_or(0);
                for _ in 0..highest {
                    if let Err(err) = page.groups.add_instance(&key) {
                        tracing::warn!(group = %key, error = %err, "group instance not restored");
                        break;
                    }
                }
            }
        }
        self.rederive_all();
    }

    pub fn export_document(&self) -> Document {
        self.codec().export_document(&self.answers, &self.catalog)
    }

    fn codec(&self) -> Codec<'_> {
        Codec::new(self.log.as_ref()).with_not_applicable(&self.options.not_applicable)
    }

    fn apply_change(&mut self, position: usize, id: &str) -> ChangeOutcome {
        let schema = &self.catalog.pages()[position].schema;
        let page = &mut self.pages[position];
        let layout = page.groups.layout(schema);
        DependencyResolver::new(schema)
            .with_max_depth(self.options.max_chain_depth)
            .apply_change(&layout, &mut page.state, id, &self.answers)
    }

    fn position(&self, page: &str) -> Result<usize> {
        self.catalog
            .pages()
            .iter()
            .position(|candidate| candidate.name == page)
            .ok_or_else(|| EngineError::UnknownPage(page.to_string()))
    }

    fn rederive(&mut self, position: usize) {
        let schema = &self.catalog.pages()[position].schema;
        let layout = self.pages[position].groups.layout(schema);
        let state = DependencyResolver::new(schema)
            .with_max_depth(self.options.max_chain_depth)
            .resolve(&layout, &self.answers);
        self.pages[position].state = state;
    }

    fn rederive_all(&mut self) {
        for position in 0..self.pages.len() {
            self.rederive(position);
        }
    }
}

impl std::fmt::Debug for FormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("pages", &self.catalog.len())
            .field("answers", &self.answers.len())
            .field("options", &self.options)
            .finish()
    }
}
