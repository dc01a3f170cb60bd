mod json;
mod text;

use serde::Serialize;

use scribo_core::{locate_highlights, ChecklistItem, Guideline, Highlight, Rule};

pub use json::format_json_report;
pub use text::{format_rule_list, format_text_report, mask_key, Summary};

/// One kind's outcome for the analyzed document.
#[derive(Debug, Serialize)]
pub struct KindReport<R: Rule> {
    #[serde(skip)]
    pub rules: Vec<R>,
    pub result: Option<R::Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidelines: Option<KindReport<Guideline>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist: Option<KindReport<ChecklistItem>>,
    pub highlights: Vec<Highlight>,
    #[serde(skip)]
    pub document: String,
}

impl Report {
    pub fn new(
        file: String,
        document: String,
        guidelines: Option<KindReport<Guideline>>,
        checklist: Option<KindReport<ChecklistItem>>,
    ) -> Self {
        let highlights = guidelines
            .as_ref()
            .and_then(|g| g.result.as_ref())
            .map(|r| locate_highlights(&document, &r.violations))
            .unwrap_or_default();
        Self {
            file,
            guidelines,
            checklist,
            highlights,
            document,
        }
    }
}
