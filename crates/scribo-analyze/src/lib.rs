pub mod analyzer;
pub mod engine;
pub mod orchestrator;
mod parse;
mod prompt;
pub mod service;
pub mod session;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use scribo_core::{
    AnalysisResult, ChecklistAnalysisResult, ChecklistItem, ChecklistResult, Guideline,
    GuidelineViolation, Rule,
};

pub use analyzer::{AnalyzeRequest, Analyzer, AnalyzerError, HttpAnalyzer};
pub use orchestrator::{AnalysisError, Orchestrator, Ticket};
pub use service::LlmAnalyzer;
pub use session::{AnalysisState, GuidelinePatch, RuleBook, Session, Tracked};

/// A rule kind the reviewer knows how to check.
pub trait Reviewable: Rule {
    /// What the model returns, before it is stamped with a time.
    type Report: DeserializeOwned + JsonSchema;

    /// Request body field carrying the rules.
    const RULES_FIELD: &'static str;
    const FAILURE_MESSAGE: &'static str;
    const INVALID_DATA_MESSAGE: &'static str;

    fn prompt_line(&self) -> String;
    fn finish(report: Self::Report, analyzed_at: String) -> Self::Outcome;
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GuidelineReport {
    pub violations: Vec<GuidelineViolation>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChecklistReport {
    pub results: Vec<ChecklistResult>,
}

impl Reviewable for Guideline {
    type Report = GuidelineReport;

    const RULES_FIELD: &'static str = "guidelines";
    const FAILURE_MESSAGE: &'static str = "Analysis failed";
    const INVALID_DATA_MESSAGE: &'static str = "Received invalid data from analysis API";

    fn prompt_line(&self) -> String {
        format!("{}. {}: {}", self.id, self.title, self.description)
    }

    fn finish(report: GuidelineReport, analyzed_at: String) -> AnalysisResult {
        AnalysisResult {
            violations: report.violations,
            analyzed_at,
        }
    }
}

impl Reviewable for ChecklistItem {
    type Report = ChecklistReport;

    const RULES_FIELD: &'static str = "checklistItems";
    const FAILURE_MESSAGE: &'static str = "Checklist analysis failed";
    const INVALID_DATA_MESSAGE: &'static str = "Received invalid data from checklist analysis API";

    fn prompt_line(&self) -> String {
        format!("{}. {}", self.id, self.text)
    }

    /// Reasons are only kept for unchecked items.
    fn finish(report: ChecklistReport, analyzed_at: String) -> ChecklistAnalysisResult {
        let results = report
            .results
            .into_iter()
            .map(|r| ChecklistResult {
                reason: if r.checked { None } else { r.reason },
                ..r
            })
            .collect();
        ChecklistAnalysisResult {
            results,
            analyzed_at,
        }
    }
}
