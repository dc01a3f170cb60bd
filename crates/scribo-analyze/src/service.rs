//! In-process reviewer: validates the request, asks the configured model and
//! returns the stamped result exactly as a remote analyzer endpoint would.

use async_trait::async_trait;
use serde_json::Value;

use scribo_core::schema::{self, SchemaError};
use scribo_core::{ai_configured, AiSettings, ChecklistItem, Guideline, RuleKind, Validate};

use crate::analyzer::{AnalyzeRequest, Analyzer, AnalyzerError};
use crate::{engine, parse, prompt, Reviewable};

const BAD_REQUEST: u16 = 400;
const SERVER_ERROR: u16 = 500;

pub struct LlmAnalyzer {
    settings: AiSettings,
}

impl LlmAnalyzer {
    pub fn new(settings: AiSettings) -> Self {
        Self { settings }
    }

    async fn review<R: Reviewable>(&self, body: &Value) -> Result<Value, AnalyzerError> {
        let (text, rules) = read_request::<R>(body).map_err(|e| {
            tracing::warn!(kind = %R::KIND, error = %e, "invalid analysis request");
            AnalyzerError::rejected(BAD_REQUEST, "Invalid request data")
        })?;

        if !ai_configured(&self.settings) {
            return Err(AnalyzerError::rejected(SERVER_ERROR, "AI provider not configured"));
        }

        let system = prompt::system_prompt::<R>();
        let user_msg = prompt::user_message(&rules, &text);

        tracing::info!(
            kind = %R::KIND,
            provider = %self.settings.provider,
            model = %self.settings.model,
            rules = rules.len(),
            "sending text for review"
        );

        let raw = engine::generate(&self.settings, &system, &user_msg)
            .await
            .map_err(|e| {
                tracing::error!(kind = %R::KIND, error = %e, "model call failed");
                AnalyzerError::rejected(SERVER_ERROR, &e.to_string())
            })?;
        tracing::debug!(kind = %R::KIND, %raw, "raw model output");

        let report = parse::parse_report::<R>(&raw).ok_or_else(|| {
            AnalyzerError::rejected(SERVER_ERROR, "Invalid response format from AI provider")
        })?;

        let outcome = R::finish(report, analyzed_at());
        if let Err(e) = outcome.validate() {
            tracing::error!(kind = %R::KIND, error = %e, "model produced an invalid result");
            return Err(AnalyzerError::rejected(
                SERVER_ERROR,
                "Failed to create valid analysis result",
            ));
        }

        serde_json::to_value(&outcome)
            .map_err(|e| AnalyzerError::rejected(SERVER_ERROR, &e.to_string()))
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<Value, AnalyzerError> {
        match request.kind {
            RuleKind::Guidelines => self.review::<Guideline>(&request.body).await,
            RuleKind::Checklist => self.review::<ChecklistItem>(&request.body).await,
        }
    }
}

/// Current time as RFC 3339 with milliseconds, e.g. `2024-05-01T10:00:00.000Z`.
fn analyzed_at() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn read_request<R: Reviewable>(body: &Value) -> Result<(String, Vec<R>), SchemaError> {
    let text = body.get("text").and_then(Value::as_str).unwrap_or_default();
    if text.is_empty() {
        return Err(SchemaError::Constraint {
            path: "text".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    let rules = body.get(R::RULES_FIELD).cloned().unwrap_or(Value::Null);
    let rules = schema::parse_value::<Vec<R>>(rules)?;
    Ok((text.to_string(), rules))
}
