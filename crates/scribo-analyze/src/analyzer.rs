//! The contract between the orchestrator and whatever performs the review.
//! Responses are untrusted JSON; the orchestrator validates them.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use scribo_core::RuleKind;

use crate::Reviewable;

/// Outbound request: `{ text, guidelines }` or `{ text, checklistItems }`.
/// Rules travel with every call so the reviewer always sees the current set.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeRequest {
    pub kind: RuleKind,
    pub body: Value,
}

impl AnalyzeRequest {
    pub fn new<R: Reviewable>(text: &str, rules: &[R]) -> Self {
        let mut body = serde_json::Map::new();
        body.insert("text".to_string(), json!(text));
        body.insert(R::RULES_FIELD.to_string(), json!(rules));
        Self {
            kind: R::KIND,
            body: Value::Object(body),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    /// The analyzer answered with a failure status. `body` is its error
    /// payload when it sent one, usually `{ "error": "..." }`.
    #[error("analyzer rejected the request (status {status})")]
    Rejected { status: u16, body: Option<Value> },

    #[error("{0}")]
    Transport(String),

    #[error("analyzer response is not JSON: {0}")]
    Malformed(String),
}

impl AnalyzerError {
    pub fn rejected(status: u16, message: &str) -> Self {
        AnalyzerError::Rejected {
            status,
            body: Some(json!({ "error": message })),
        }
    }

    /// Human-readable message carried by the error body, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            AnalyzerError::Rejected { body: Some(body), .. } => {
                body.get("error").and_then(Value::as_str).filter(|m| !m.is_empty())
            }
            AnalyzerError::Transport(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<Value, AnalyzerError>;
}

/// Posts requests to `{base_url}/api/analyze/{kind}`.
pub struct HttpAnalyzer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalyzer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn endpoint(&self, kind: RuleKind) -> String {
        format!(
            "{}/api/analyze/{}",
            self.base_url.trim_end_matches('/'),
            kind.as_str()
        )
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<Value, AnalyzerError> {
        let url = self.endpoint(request.kind);
        tracing::debug!(%url, "posting analysis request");

        let response = self
            .client
            .post(&url)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| AnalyzerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.ok();
            return Err(AnalyzerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AnalyzerError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribo_core::{ChecklistItem, Guideline};

    #[test]
    fn request_body_carries_rules() {
        let request = AnalyzeRequest::new(
            "Draft",
            &[ChecklistItem { id: 1, text: "Has intro".into() }],
        );
        assert_eq!(request.kind, RuleKind::Checklist);
        assert_eq!(
            request.body,
            json!({ "text": "Draft", "checklistItems": [{ "id": 1, "text": "Has intro" }] })
        );

        let request = AnalyzeRequest::new::<Guideline>("Draft", &[]);
        assert_eq!(request.body, json!({ "text": "Draft", "guidelines": [] }));
    }

    #[test]
    fn error_message_comes_from_body() {
        assert_eq!(
            AnalyzerError::rejected(500, "AI provider not configured").message(),
            Some("AI provider not configured")
        );
        let bare = AnalyzerError::Rejected { status: 502, body: Some(json!({ "detail": "x" })) };
        assert_eq!(bare.message(), None);
        assert_eq!(AnalyzerError::Malformed("eof".into()).message(), None);
    }

    #[test]
    fn endpoint_joins_base_url() {
        let analyzer = HttpAnalyzer::new("http://localhost:5173/");
        assert_eq!(
            analyzer.endpoint(RuleKind::Guidelines),
            "http://localhost:5173/api/analyze/guidelines"
        );
    }
}
