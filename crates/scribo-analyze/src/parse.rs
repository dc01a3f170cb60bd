use crate::Reviewable;

/// Parse raw model output into the kind's report. `None` when no JSON object
/// of the expected shape can be found.
pub fn parse_report<R: Reviewable>(raw: &str) -> Option<R::Report> {
    let json = extract_json_object(raw)?;
    match serde_json::from_str(json) {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::warn!(kind = %R::KIND, error = %e, "model output does not match report shape");
            None
        }
    }
}

/// Extract the outermost JSON object from raw output, ignoring prose or
/// code fences around it.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribo_core::{ChecklistItem, Guideline};

    #[test]
    fn reads_fenced_output() {
        let raw = "Here you go:\n```json\n{\"violations\":[{\"guidelineId\":2,\"textVerbatim\":[\"very\"],\"reason\":\"filler\"}]}\n```";
        let report = parse_report::<Guideline>(raw).unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].guideline_id, 2);
    }

    #[test]
    fn missing_spans_mean_whole_document() {
        let raw = r#"{"violations":[{"guidelineId":4,"reason":"no call to action"}]}"#;
        let report = parse_report::<Guideline>(raw).unwrap();
        assert!(report.violations[0].text_verbatim.is_none());
    }

    #[test]
    fn wrong_shape_is_rejected() {
        assert!(parse_report::<ChecklistItem>(r#"{"results":[{"id":"one","checked":true}]}"#).is_none());
        assert!(parse_report::<ChecklistItem>(r#"{"violations":[]}"#).is_none());
        assert!(parse_report::<ChecklistItem>("no json here").is_none());
        assert!(parse_report::<ChecklistItem>("} backwards {").is_none());
    }
}
