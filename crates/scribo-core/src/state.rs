//! Last known state: current rule collections, the most recent result per
//! kind and the document text, each under a fixed key. Independent of the
//! content-addressed history in [`crate::cache`].

use crate::store::{self, Store, StoreError};
use crate::{Rule, RuleKind};

pub const DOCUMENT_KEY: &str = "document";

pub fn rules_key(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::Guidelines => "guidelines",
        RuleKind::Checklist => "checklist",
    }
}

pub fn latest_result_key(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::Guidelines => "guidelines-analysis",
        RuleKind::Checklist => "checklist-analysis",
    }
}

/// Stored collection, or `None` if nothing (valid) was ever stored. Errors
/// when the collection exists but cannot be read right now.
pub fn load_rules<R: Rule>(store: &dyn Store) -> Result<Option<Vec<R>>, StoreError> {
    store::validated_get_records::<R>(store, rules_key(R::KIND))
}

pub fn save_rules<R: Rule>(store: &dyn Store, rules: &[R]) {
    store::put(store, rules_key(R::KIND), &rules);
}

pub fn load_latest_result<R: Rule>(store: &dyn Store) -> Option<R::Outcome> {
    store::validated_get::<R::Outcome>(store, latest_result_key(R::KIND))
}

/// `None` removes the stored result.
pub fn save_latest_result<R: Rule>(store: &dyn Store, result: Option<&R::Outcome>) {
    let key = latest_result_key(R::KIND);
    match result {
        Some(result) => store::put(store, key, result),
        None => store::discard(store, key),
    }
}

pub fn load_document(store: &dyn Store) -> String {
    match store.get(DOCUMENT_KEY) {
        Ok(Some(serde_json::Value::String(text))) => text,
        Ok(Some(_)) => {
            tracing::warn!("stored document is not text, removing");
            store::discard(store, DOCUMENT_KEY);
            String::new()
        }
        Ok(None) => String::new(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to load document");
            String::new()
        }
    }
}

pub fn save_document(store: &dyn Store, text: &str) {
    store::put(store, DOCUMENT_KEY, &text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::cache_prefix;
    use crate::store::MemoryStore;
    use crate::{ChecklistAnalysisResult, ChecklistItem, Guideline};
    use serde_json::json;

    #[test]
    fn fixed_keys_never_collide_with_cache() {
        for kind in RuleKind::ALL {
            for prefix in RuleKind::ALL.map(cache_prefix) {
                assert!(!rules_key(kind).starts_with(&prefix));
                assert!(!latest_result_key(kind).starts_with(&prefix));
                assert!(!DOCUMENT_KEY.starts_with(&prefix));
            }
        }
    }

    #[test]
    fn absent_and_empty_collections_differ() {
        let store = MemoryStore::new();
        assert_eq!(load_rules::<Guideline>(&store).unwrap(), None);
        save_rules::<Guideline>(&store, &[]);
        assert_eq!(load_rules::<Guideline>(&store).unwrap(), Some(vec![]));
    }

    #[test]
    fn latest_result_can_be_cleared() {
        let store = MemoryStore::new();
        let result = ChecklistAnalysisResult {
            results: vec![],
            analyzed_at: "2024-01-01T00:00:00Z".into(),
        };
        save_latest_result::<ChecklistItem>(&store, Some(&result));
        assert_eq!(load_latest_result::<ChecklistItem>(&store), Some(result));
        save_latest_result::<ChecklistItem>(&store, None);
        assert_eq!(load_latest_result::<ChecklistItem>(&store), None);
    }

    #[test]
    fn document_must_be_text() {
        let store = MemoryStore::new();
        assert_eq!(load_document(&store), "");
        save_document(&store, "Draft");
        assert_eq!(load_document(&store), "Draft");
        store.set(DOCUMENT_KEY, &json!(42)).unwrap();
        assert_eq!(load_document(&store), "");
        assert_eq!(store.get(DOCUMENT_KEY).unwrap(), None);
    }
}
