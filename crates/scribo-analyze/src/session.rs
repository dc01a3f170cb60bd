//! Author-facing state: the document, both rule collections and the analysis
//! state of each kind. Every mutation is persisted immediately; collections
//! and results are replaced wholesale, never merged.

use std::collections::HashSet;
use std::sync::Arc;

use scribo_core::defaults;
use scribo_core::highlight::{locate_highlights, Highlight};
use scribo_core::state;
use scribo_core::{
    content_hash, next_id, AnalysisCache, ChecklistItem, ChecklistResult, Guideline,
    GuidelineViolation, RuleKind, SchemaError, Store,
};

use crate::analyzer::Analyzer;
use crate::orchestrator::{AnalysisError, Orchestrator, Ticket};
use crate::Reviewable;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisState<T> {
    pub is_analyzing: bool,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> Default for AnalysisState<T> {
    fn default() -> Self {
        Self {
            is_analyzing: false,
            result: None,
            error: None,
        }
    }
}

/// One kind's rules, analysis state and edit-mode draft.
#[derive(Debug, Clone)]
pub struct RuleBook<R: Reviewable> {
    items: Vec<R>,
    analysis: AnalysisState<R::Outcome>,
    draft: Option<String>,
}

impl<R: Tracked> RuleBook<R> {
    /// Stored collection, or the built-in defaults if none was ever stored.
    /// Defaults are only written back when the collection is truly absent.
    fn restore(store: &dyn Store) -> Self {
        let items = match state::load_rules::<R>(store) {
            Ok(Some(items)) => items,
            Ok(None) => {
                let seeded = R::defaults();
                tracing::info!(kind = %R::KIND, count = seeded.len(), "seeding default rules");
                state::save_rules(store, &seeded);
                seeded
            }
            Err(e) => {
                tracing::warn!(kind = %R::KIND, error = %e, "stored rules unreadable, using defaults for now");
                R::defaults()
            }
        };
        Self {
            items,
            analysis: AnalysisState {
                result: state::load_latest_result::<R>(store),
                ..AnalysisState::default()
            },
            draft: None,
        }
    }
}

impl<R: Reviewable> RuleBook<R> {
    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn analysis(&self) -> &AnalysisState<R::Outcome> {
        &self.analysis
    }

    pub fn is_edit_mode(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }
}

impl<R: Reviewable> RuleBook<R> {
    fn settle(
        &mut self,
        store: &dyn Store,
        current_hash: &str,
        ticket: Ticket<R>,
        outcome: Result<R::Outcome, AnalysisError>,
    ) -> bool {
        self.analysis.is_analyzing = false;

        if ticket.content_hash != current_hash {
            tracing::debug!(kind = %R::KIND, "document changed during analysis, dropping outcome");
            return false;
        }

        match outcome {
            Ok(result) => {
                state::save_latest_result::<R>(store, Some(&result));
                self.analysis.result = Some(result);
                self.analysis.error = None;
            }
            Err(e) => self.analysis.error = Some(e.to_string()),
        }
        true
    }
}

/// Clears the analyzing flag when dropped, so an abandoned call never
/// leaves a kind marked as in flight.
struct InFlight<'a, R: Reviewable>(&'a mut RuleBook<R>);

impl<R: Reviewable> Drop for InFlight<'_, R> {
    fn drop(&mut self) {
        self.0.analysis.is_analyzing = false;
    }
}

/// Run a dispatched ticket and settle its outcome into `book` as soon as it arrives.
async fn run_and_settle<R: Reviewable>(
    book: &mut RuleBook<R>,
    ticket: Option<Ticket<R>>,
    orchestrator: &Orchestrator,
    store: &dyn Store,
    current_hash: &str,
) {
    let Some(ticket) = ticket else {
        return;
    };
    let mut in_flight = InFlight(book);
    let outcome = orchestrator.run(&ticket).await;
    in_flight.0.settle(store, current_hash, ticket, outcome);
}

/// Gives generic session code access to the book of a rule kind.
pub trait Tracked: Reviewable {
    fn book(session: &Session) -> &RuleBook<Self>;
    fn book_mut(session: &mut Session) -> &mut RuleBook<Self>;
    fn defaults() -> Vec<Self>;
}

impl Tracked for Guideline {
    fn book(session: &Session) -> &RuleBook<Self> {
        &session.guidelines
    }

    fn book_mut(session: &mut Session) -> &mut RuleBook<Self> {
        &mut session.guidelines
    }

    fn defaults() -> Vec<Self> {
        defaults::default_guidelines()
    }
}

impl Tracked for ChecklistItem {
    fn book(session: &Session) -> &RuleBook<Self> {
        &session.checklist
    }

    fn book_mut(session: &mut Session) -> &mut RuleBook<Self> {
        &mut session.checklist
    }

    fn defaults() -> Vec<Self> {
        defaults::default_checklist()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GuidelinePatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

pub struct Session {
    store: Arc<dyn Store>,
    orchestrator: Orchestrator,
    document: String,
    guidelines: RuleBook<Guideline>,
    checklist: RuleBook<ChecklistItem>,
    selected_guideline: Option<u32>,
}

impl Session {
    /// Restore the last known state from `store`.
    pub fn open(store: Arc<dyn Store>, analyzer: Arc<dyn Analyzer>) -> Self {
        let orchestrator = Orchestrator::new(analyzer, AnalysisCache::new(store.clone()));
        let document = state::load_document(store.as_ref());
        let guidelines = RuleBook::restore(store.as_ref());
        let checklist = RuleBook::restore(store.as_ref());
        Self {
            store,
            orchestrator,
            document,
            guidelines,
            checklist,
            selected_guideline: None,
        }
    }

    pub fn cache(&self) -> &AnalysisCache {
        self.orchestrator.cache()
    }

    // --- Document ---

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn set_document(&mut self, text: impl Into<String>) {
        self.document = text.into();
        state::save_document(self.store.as_ref(), &self.document);
    }

    // --- Rules ---

    pub fn book<R: Tracked>(&self) -> &RuleBook<R> {
        R::book(self)
    }

    pub fn rules<R: Tracked>(&self) -> &[R] {
        R::book(self).items()
    }

    pub fn analysis<R: Tracked>(&self) -> &AnalysisState<R::Outcome> {
        R::book(self).analysis()
    }

    /// Replace a whole collection. Invalid records and records repeating an
    /// earlier id are dropped; returns how many were kept.
    pub fn replace_rules<R: Tracked>(&mut self, rules: Vec<R>) -> usize {
        let mut seen = HashSet::new();
        let kept: Vec<R> = rules
            .into_iter()
            .filter(|rule| {
                if let Err(e) = rule.validate() {
                    tracing::warn!(kind = %R::KIND, id = rule.id(), error = %e, "dropping invalid rule");
                    return false;
                }
                if !seen.insert(rule.id()) {
                    tracing::warn!(kind = %R::KIND, id = rule.id(), "dropping rule with duplicate id");
                    return false;
                }
                true
            })
            .collect();
        let count = kept.len();
        self.commit_rules(kept);
        count
    }

    pub fn reset_rules<R: Tracked>(&mut self) -> usize {
        self.replace_rules(R::defaults())
    }

    fn commit_rules<R: Tracked>(&mut self, items: Vec<R>) {
        state::save_rules(self.store.as_ref(), &items);
        R::book_mut(self).items = items;
    }

    fn push_rule<R: Tracked>(&mut self, rule: R) -> Result<u32, SchemaError> {
        rule.validate()?;
        let id = rule.id();
        let mut items = self.rules::<R>().to_vec();
        items.push(rule);
        self.commit_rules(items);
        Ok(id)
    }

    /// Apply `edit` to the rule with `id`. `Ok(false)` if there is no such rule.
    fn edit_rule<R: Tracked>(&mut self, id: u32, edit: impl FnOnce(&mut R)) -> Result<bool, SchemaError> {
        let mut items = self.rules::<R>().to_vec();
        let Some(rule) = items.iter_mut().find(|r| r.id() == id) else {
            return Ok(false);
        };
        edit(rule);
        rule.validate()?;
        self.commit_rules(items);
        Ok(true)
    }

    fn remove_rule<R: Tracked>(&mut self, id: u32) -> bool {
        let items = self.rules::<R>();
        let before = items.len();
        let kept: Vec<R> = items.iter().filter(|r| r.id() != id).cloned().collect();
        if kept.len() == before {
            return false;
        }
        self.commit_rules(kept);
        true
    }

    /// Id for a new rule of kind `R`.
    fn fresh_id<R: Tracked>(&self) -> Result<u32, SchemaError> {
        next_id(self.rules::<R>()).ok_or_else(|| SchemaError::Constraint {
            path: "id".into(),
            message: format!("no {} id left after {}", R::KIND, u32::MAX),
        })
    }

    pub fn add_guideline(&mut self, title: &str, description: &str) -> Result<u32, SchemaError> {
        let guideline = Guideline {
            id: self.fresh_id::<Guideline>()?,
            title: title.trim().to_string(),
            description: description.trim().to_string(),
        };
        self.push_rule(guideline)
    }

    pub fn update_guideline(&mut self, id: u32, patch: GuidelinePatch) -> Result<bool, SchemaError> {
        self.edit_rule::<Guideline>(id, |g| {
            if let Some(title) = patch.title {
                g.title = title.trim().to_string();
            }
            if let Some(description) = patch.description {
                g.description = description.trim().to_string();
            }
        })
    }

    pub fn delete_guideline(&mut self, id: u32) -> bool {
        if self.selected_guideline == Some(id) {
            self.selected_guideline = None;
        }
        self.remove_rule::<Guideline>(id)
    }

    pub fn add_item(&mut self, text: &str) -> Result<u32, SchemaError> {
        let item = ChecklistItem {
            id: self.fresh_id::<ChecklistItem>()?,
            text: text.trim().to_string(),
        };
        self.push_rule(item)
    }

    pub fn update_item(&mut self, id: u32, text: &str) -> Result<bool, SchemaError> {
        self.edit_rule::<ChecklistItem>(id, |item| item.text = text.trim().to_string())
    }

    pub fn delete_item(&mut self, id: u32) -> bool {
        self.remove_rule::<ChecklistItem>(id)
    }

    // --- Edit mode, import and export ---

    /// Start editing the collection as markdown; returns the initial draft.
    pub fn enter_edit_mode<R: Tracked>(&mut self) -> &str {
        let markdown = R::encode(self.rules::<R>());
        R::book_mut(self).draft.insert(markdown).as_str()
    }

    /// Replace the draft. Ignored outside edit mode.
    pub fn set_markdown<R: Tracked>(&mut self, markdown: impl Into<String>) {
        let book = R::book_mut(self);
        if book.draft.is_some() {
            book.draft = Some(markdown.into());
        }
    }

    /// Leave edit mode, decoding the draft into the collection when `save`.
    /// Returns the number of rules kept, or `None` if nothing was saved.
    pub fn exit_edit_mode<R: Tracked>(&mut self, save: bool) -> Option<usize> {
        let draft = R::book_mut(self).draft.take()?;
        if !save {
            return None;
        }
        Some(self.replace_rules(R::decode(&draft)))
    }

    pub fn export<R: Tracked>(&self) -> String {
        R::encode(self.rules::<R>())
    }

    /// Replace the collection with the rules decoded from `markdown`.
    pub fn import<R: Tracked>(&mut self, markdown: &str) -> usize {
        let count = self.replace_rules(R::decode(markdown));
        tracing::info!(kind = %R::KIND, count, "imported rules");
        count
    }

    // --- Analysis ---

    /// Mark `R` as analyzing and capture what to send. `None` when there is
    /// nothing to analyze, in which case no state changes.
    pub fn dispatch<R: Tracked>(&mut self) -> Option<Ticket<R>> {
        let ticket = Ticket::new(&self.document, self.rules::<R>())?;
        let analysis = &mut R::book_mut(self).analysis;
        analysis.is_analyzing = true;
        analysis.error = None;
        Some(ticket)
    }

    /// Apply the outcome of a dispatched analysis. The analyzing flag always
    /// clears; the outcome is dropped if the document changed since dispatch.
    /// Returns whether the outcome was applied.
    pub fn settle<R: Tracked>(
        &mut self,
        ticket: Ticket<R>,
        outcome: Result<R::Outcome, AnalysisError>,
    ) -> bool {
        let current = content_hash(&self.document);
        let store = self.store.clone();
        R::book_mut(self).settle(store.as_ref(), &current, ticket, outcome)
    }

    pub async fn analyze<R: Tracked>(&mut self) {
        let ticket = self.dispatch::<R>();
        let current = content_hash(&self.document);
        let store = self.store.clone();
        let orchestrator = self.orchestrator.clone();
        run_and_settle(R::book_mut(self), ticket, &orchestrator, store.as_ref(), &current).await;
    }

    /// Analyze both kinds concurrently. Each kind settles as soon as its own
    /// call returns; a failed or stalled kind leaves the other untouched.
    pub async fn analyze_all(&mut self) {
        let guideline_ticket = self.dispatch::<Guideline>();
        let checklist_ticket = self.dispatch::<ChecklistItem>();
        let current = content_hash(&self.document);

        let Session {
            store,
            orchestrator,
            guidelines,
            checklist,
            ..
        } = self;
        let store: &dyn Store = &**store;
        let orchestrator: &Orchestrator = orchestrator;

        tokio::join!(
            run_and_settle(guidelines, guideline_ticket, orchestrator, store, &current),
            run_and_settle(checklist, checklist_ticket, orchestrator, store, &current),
        );
    }

    /// Load the cached result of `R` for the current document, if any.
    pub fn recall_cached<R: Tracked>(&mut self) -> bool {
        let Some(result) = self.cache().load::<R>(&self.document) else {
            return false;
        };
        state::save_latest_result::<R>(self.store.as_ref(), Some(&result));
        R::book_mut(self).analysis.result = Some(result);
        true
    }

    pub fn clear_cache(&self, kind: RuleKind) {
        self.cache().clear(kind);
    }

    // --- Lookups ---

    pub fn select_guideline(&mut self, id: Option<u32>) {
        self.selected_guideline = id;
    }

    pub fn selected_guideline(&self) -> Option<u32> {
        self.selected_guideline
    }

    /// Violations reported for a guideline; empty for unknown or orphaned ids.
    pub fn violations_for(&self, guideline_id: u32) -> Vec<&GuidelineViolation> {
        self.guidelines
            .analysis
            .result
            .iter()
            .flat_map(|r| r.violations.iter())
            .filter(|v| v.guideline_id == guideline_id)
            .collect()
    }

    pub fn checklist_result(&self, item_id: u32) -> Option<&ChecklistResult> {
        self.checklist
            .analysis
            .result
            .as_ref()?
            .results
            .iter()
            .find(|r| r.id == item_id)
    }

    /// Spans to highlight in the document: those of the selected guideline,
    /// or of every violation when none is selected.
    pub fn highlights(&self) -> Vec<Highlight> {
        let Some(result) = &self.guidelines.analysis.result else {
            return vec![];
        };
        let violations: Vec<GuidelineViolation> = result
            .violations
            .iter()
            .filter(|v| self.selected_guideline.map_or(true, |id| v.guideline_id == id))
            .cloned()
            .collect();
        locate_highlights(&self.document, &violations)
    }
}
