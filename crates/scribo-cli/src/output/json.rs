use anyhow::{Context, Result};

use super::Report;

pub fn format_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::KindReport;
    use scribo_core::{AnalysisResult, GuidelineViolation};
    use serde_json::{json, Value};

    #[test]
    fn json_report_omits_unrequested_kinds() {
        let guidelines = KindReport {
            rules: vec![],
            result: Some(AnalysisResult {
                violations: vec![GuidelineViolation {
                    guideline_id: 1,
                    text_verbatim: Some(vec!["very".into()]),
                    reason: "filler".into(),
                }],
                analyzed_at: "2024-05-01T10:00:00.000Z".into(),
            }),
            error: None,
        };
        let report = Report::new("post.md".into(), "So very good".into(), Some(guidelines), None);

        let value: Value = serde_json::from_str(&format_json_report(&report).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "file": "post.md",
                "guidelines": {
                    "result": {
                        "violations": [{ "guidelineId": 1, "textVerbatim": ["very"], "reason": "filler" }],
                        "analyzedAt": "2024-05-01T10:00:00.000Z"
                    }
                },
                "highlights": [{ "guidelineId": 1, "start": 3, "end": 7 }]
            })
        );
    }
}
