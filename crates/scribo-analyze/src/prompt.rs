use scribo_core::RuleKind;

use crate::Reviewable;

const GUIDELINES_INSTRUCTIONS: &str = "\
You are a blog post reviewer. Analyze the provided text against the given guidelines and identify violations.\n\n\
For each violation, provide:\n\
- guidelineId: the ID number of the violated guideline\n\
- textVerbatim: an array of exact text snippets from the content that violate the guideline. \
Include ONLY the exact text as it appears. If the violation applies to the entire content \
(not specific text parts), omit this field entirely.\n\
- reason: a brief explanation of why this violates the guideline\n\n\
IMPORTANT:\n\
- Use textVerbatim to highlight specific problematic text parts\n\
- A single guideline violation can reference multiple text parts\n\
- Omit textVerbatim entirely for violations that apply to the whole content \
(e.g., missing elements, overall structure issues)\n\
- If there are no violations, return an empty violations array.";

const CHECKLIST_INSTRUCTIONS: &str = "\
You are a blog post reviewer. Evaluate if the provided text addresses each checklist item.\n\n\
For each checklist item, provide:\n\
- id: the ID number of the checklist item\n\
- checked: true if the text adequately addresses this item, false otherwise\n\
- reason: a brief explanation (only required if checked is false, explaining what's missing or inadequate)\n\n\
IMPORTANT:\n\
- The provided text is in markdown format: consider formatting such as bold, underline, etc.\n\
- Include all checklist items in your response\n\
- Set checked to true only if the text clearly addresses the requirement\n\
- For unchecked items, provide a helpful reason explaining what's missing\n\
- Omit the reason field entirely for checked items";

fn instructions(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::Guidelines => GUIDELINES_INSTRUCTIONS,
        RuleKind::Checklist => CHECKLIST_INSTRUCTIONS,
    }
}

/// Instructions plus the JSON schema the answer has to follow.
pub fn system_prompt<R: Reviewable>() -> String {
    let schema = schemars::SchemaGenerator::default().into_root_schema_for::<R::Report>();
    let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!(
        "{}\n\n\
Return your response as a single JSON object matching this JSON schema:\n{}\n\n\
Output ONLY the JSON object, nothing else.",
        instructions(R::KIND),
        schema
    )
}

fn rules_heading(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::Guidelines => "Guidelines to check against",
        RuleKind::Checklist => "Checklist items to evaluate",
    }
}

pub fn user_message<R: Reviewable>(rules: &[R], text: &str) -> String {
    let listed = rules
        .iter()
        .map(Reviewable::prompt_line)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{}:\n\n{}\n\n---\n\nText to analyze:\n\n{}",
        rules_heading(R::KIND),
        listed,
        text
    )
}
