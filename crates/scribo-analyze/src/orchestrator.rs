use std::sync::Arc;

use thiserror::Error;

use scribo_core::schema;
use scribo_core::{content_hash, AnalysisCache, Rule};

use crate::analyzer::{AnalyzeRequest, Analyzer, AnalyzerError};
use crate::Reviewable;

/// What the author sees when an analysis does not produce a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The analyzer failed or refused the request.
    #[error("{0}")]
    Remote(String),

    /// The analyzer answered, but not in the agreed shape.
    #[error("{0}")]
    InvalidData(String),
}

/// Everything one analysis call needs, captured when it is dispatched.
#[derive(Debug, Clone)]
pub struct Ticket<R: Rule> {
    pub text: String,
    pub content_hash: String,
    pub rules: Vec<R>,
}

impl<R: Rule> Ticket<R> {
    /// `None` when there is nothing to analyze: blank text or no rules.
    pub fn new(text: &str, rules: &[R]) -> Option<Self> {
        if text.trim().is_empty() || rules.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            content_hash: content_hash(text),
            rules: rules.to_vec(),
        })
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    analyzer: Arc<dyn Analyzer>,
    cache: AnalysisCache,
}

impl Orchestrator {
    pub fn new(analyzer: Arc<dyn Analyzer>, cache: AnalysisCache) -> Self {
        Self { analyzer, cache }
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Analyze `text` against `rules`. Resolves to `Ok(None)` without calling
    /// the analyzer when there is nothing to analyze.
    pub async fn analyze<R: Reviewable>(
        &self,
        text: &str,
        rules: &[R],
    ) -> Result<Option<R::Outcome>, AnalysisError> {
        match Ticket::new(text, rules) {
            Some(ticket) => self.run(&ticket).await.map(Some),
            None => Ok(None),
        }
    }

    /// Send one request, validate the answer and cache it for the ticket's text.
    pub async fn run<R: Reviewable>(&self, ticket: &Ticket<R>) -> Result<R::Outcome, AnalysisError> {
        let request = AnalyzeRequest::new(&ticket.text, &ticket.rules);

        let value = self.analyzer.analyze(&request).await.map_err(|e| {
            tracing::warn!(kind = %R::KIND, error = %e, "analysis request failed");
            match e {
                AnalyzerError::Malformed(_) => {
                    AnalysisError::InvalidData(R::INVALID_DATA_MESSAGE.to_string())
                }
                other => AnalysisError::Remote(
                    other.message().unwrap_or(R::FAILURE_MESSAGE).to_string(),
                ),
            }
        })?;

        let outcome = schema::parse_value::<R::Outcome>(value).map_err(|e| {
            tracing::error!(kind = %R::KIND, error = %e, "invalid analysis result from analyzer");
            AnalysisError::InvalidData(R::INVALID_DATA_MESSAGE.to_string())
        })?;

        self.cache.save::<R>(&ticket.text, &outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use scribo_core::{ChecklistItem, Guideline, MemoryStore, Store};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned {
        reply: Result<Value, AnalyzerError>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(reply: Result<Value, AnalyzerError>) -> Arc<Self> {
            Arc::new(Self { reply, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl Analyzer for Canned {
        async fn analyze(&self, _request: &AnalyzeRequest) -> Result<Value, AnalyzerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn setup(analyzer: Arc<Canned>) -> (Orchestrator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = AnalysisCache::new(store.clone());
        (Orchestrator::new(analyzer, cache), store)
    }

    fn guidelines() -> Vec<Guideline> {
        vec![Guideline { id: 1, title: "Plain words".into(), description: String::new() }]
    }

    #[tokio::test]
    async fn nothing_to_analyze_makes_no_call() {
        let analyzer = Canned::new(Ok(json!({})));
        let (orchestrator, store) = setup(analyzer.clone());

        assert_eq!(orchestrator.analyze("", &guidelines()).await, Ok(None));
        assert_eq!(orchestrator.analyze("  \n\t", &guidelines()).await, Ok(None));
        assert_eq!(orchestrator.analyze::<ChecklistItem>("text", &[]).await, Ok(None));

        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn valid_result_is_cached() {
        let reply = json!({
            "violations": [{ "guidelineId": 1, "textVerbatim": ["leverage"], "reason": "jargon" }],
            "analyzedAt": "2024-05-01T10:00:00.000Z"
        });
        let (orchestrator, _store) = setup(Canned::new(Ok(reply)));

        let result = orchestrator.analyze("We leverage synergy", &guidelines()).await.unwrap().unwrap();
        assert_eq!(result.violations[0].reason, "jargon");
        assert_eq!(
            orchestrator.cache().load::<Guideline>("We leverage synergy"),
            Some(result)
        );
    }

    #[tokio::test]
    async fn invalid_shape_is_a_distinct_error() {
        let reply = json!({ "violations": [{ "guidelineId": "one", "reason": "r" }] });
        let (orchestrator, store) = setup(Canned::new(Ok(reply)));

        let err = orchestrator.analyze("text", &guidelines()).await.unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidData("Received invalid data from analysis API".into())
        );
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let analyzer = Canned::new(Err(AnalyzerError::rejected(500, "OpenAI quota exceeded")));
        let (orchestrator, _) = setup(analyzer);
        let err = orchestrator.analyze("text", &guidelines()).await.unwrap_err();
        assert_eq!(err.to_string(), "OpenAI quota exceeded");
    }

    #[tokio::test]
    async fn generic_message_without_body() {
        let analyzer = Canned::new(Err(AnalyzerError::Rejected { status: 502, body: None }));
        let (orchestrator, _) = setup(analyzer);
        let items = vec![ChecklistItem { id: 1, text: "Intro".into() }];
        let err = orchestrator.analyze("text", &items).await.unwrap_err();
        assert_eq!(err, AnalysisError::Remote("Checklist analysis failed".into()));
    }

    #[tokio::test]
    async fn unparsable_body_is_invalid_data() {
        let analyzer = Canned::new(Err(AnalyzerError::Malformed("expected value".into())));
        let (orchestrator, _) = setup(analyzer);
        let items = vec![ChecklistItem { id: 1, text: "Intro".into() }];
        let err = orchestrator.analyze("text", &items).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Received invalid data from checklist analysis API"
        );
    }
}
