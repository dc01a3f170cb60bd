use scribo_core::highlight::line_of;
use scribo_core::{ChecklistItem, Guideline, GuidelineViolation, Rule};

use super::{KindReport, Report};

/// One-line description of a rule for listings.
pub trait Summary: Rule {
    fn summary(&self) -> String;
}

impl Summary for Guideline {
    fn summary(&self) -> String {
        format!("{:>3}. {}", self.id, self.title)
    }
}

impl Summary for ChecklistItem {
    fn summary(&self) -> String {
        format!("{:>3}. {}", self.id, self.text)
    }
}

pub fn format_rule_list<R: Summary>(rules: &[R]) -> String {
    if rules.is_empty() {
        return format!("No {} defined.", R::KIND);
    }
    rules.iter().map(Summary::summary).collect::<Vec<_>>().join("\n")
}

/// Keep only the last four characters of a secret.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(8), tail)
}

pub fn format_text_report(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!("Scribo review: {}\n", report.file));

    if let Some(section) = &report.guidelines {
        out.push('\n');
        format_guidelines(&mut out, section, report);
    }
    if let Some(section) = &report.checklist {
        out.push('\n');
        format_checklist(&mut out, section);
    }

    out.trim_end().to_string()
}

fn heading<R: Rule>(out: &mut String, title: &str, section: &KindReport<R>, analyzed_at: Option<&str>) -> bool {
    match analyzed_at {
        Some(at) => out.push_str(&format!("## {title} (analyzed {at})\n")),
        None => out.push_str(&format!("## {title}\n")),
    }
    if let Some(error) = &section.error {
        out.push_str(&format!("  error: {error}\n"));
        return false;
    }
    if section.rules.is_empty() {
        out.push_str(&format!("  No {} defined, skipped.\n", R::KIND));
        return false;
    }
    true
}

fn format_guidelines(out: &mut String, section: &KindReport<Guideline>, report: &Report) {
    let analyzed_at = section.result.as_ref().map(|r| r.analyzed_at.as_str());
    if !heading(out, "Guidelines", section, analyzed_at) {
        return;
    }
    let Some(result) = &section.result else {
        out.push_str("  No result.\n");
        return;
    };
    if result.violations.is_empty() {
        out.push_str("  No violations.\n");
        return;
    }

    for violation in &result.violations {
        let title = section
            .rules
            .iter()
            .find(|g| g.id == violation.guideline_id)
            .map_or("(removed guideline)", |g| g.title.as_str());
        out.push_str(&format!("  [{}] {}\n", violation.guideline_id, title));
        out.push_str(&format!("      {}\n", violation.reason));
        format_locations(out, violation, report);
    }
    out.push_str(&format!("  {} violation(s)\n", result.violations.len()));
}

fn format_locations(out: &mut String, violation: &GuidelineViolation, report: &Report) {
    let Some(spans) = &violation.text_verbatim else {
        out.push_str("      (applies to the whole document)\n");
        return;
    };
    for span in spans {
        let lines: Vec<String> = report
            .highlights
            .iter()
            .filter(|h| h.guideline_id == violation.guideline_id)
            .filter(|h| report.document.get(h.start..h.end) == Some(span.as_str()))
            .map(|h| line_of(&report.document, h.start).to_string())
            .collect();
        if lines.is_empty() {
            out.push_str(&format!("      \"{span}\" (not found in text)\n"));
        } else {
            out.push_str(&format!("      \"{span}\" line {}\n", lines.join(", ")));
        }
    }
}

fn format_checklist(out: &mut String, section: &KindReport<ChecklistItem>) {
    let analyzed_at = section.result.as_ref().map(|r| r.analyzed_at.as_str());
    if !heading(out, "Checklist", section, analyzed_at) {
        return;
    }
    let Some(result) = &section.result else {
        out.push_str("  No result.\n");
        return;
    };

    let mut checked = 0;
    for item in &section.rules {
        let outcome = result.results.iter().find(|r| r.id == item.id);
        let mark = match outcome {
            Some(r) if r.checked => {
                checked += 1;
                "x"
            }
            Some(_) => " ",
            None => "?",
        };
        out.push_str(&format!("  [{mark}] {}. {}\n", item.id, item.text));
        if let Some(reason) = outcome.and_then(|r| r.reason.as_deref()) {
            out.push_str(&format!("      {reason}\n"));
        }
    }
    out.push_str(&format!("  {checked}/{} items addressed\n", section.rules.len()));
}
