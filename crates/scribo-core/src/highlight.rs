use serde::Serialize;

use crate::GuidelineViolation;

/// A located occurrence of a violation's verbatim text, as a byte range.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub guideline_id: u32,
    pub start: usize,
    pub end: usize,
}

/// Every occurrence of every `text_verbatim` span in `text`, ordered by
/// position. Whole-document violations contribute nothing; spans the
/// analyzer quoted inexactly simply don't match.
pub fn locate_highlights(text: &str, violations: &[GuidelineViolation]) -> Vec<Highlight> {
    let mut found = Vec::new();
    for violation in violations {
        for span in violation.text_verbatim.iter().flatten() {
            if span.is_empty() {
                continue;
            }
            for (start, matched) in text.match_indices(span.as_str()) {
                found.push(Highlight {
                    guideline_id: violation.guideline_id,
                    start,
                    end: start + matched.len(),
                });
            }
        }
    }
    found.sort_by_key(|h| (h.start, h.end, h.guideline_id));
    found.dedup();
    found
}

/// 1-based line number of a byte offset.
pub fn line_of(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())].matches('\n').count() + 1
}
