use crate::source;
use crate::{ChecklistItem, Guideline};

/// Canonical guideline document the built-in defaults are seeded from.
pub const GUIDELINES_MD: &str = include_str!("../assets/guidelines.md");

/// Canonical checklist document the built-in defaults are seeded from.
pub const CHECKLIST_MD: &str = include_str!("../assets/checklist.md");

pub fn default_guidelines() -> Vec<Guideline> {
    source::parse_guidelines(GUIDELINES_MD)
}

pub fn default_checklist() -> Vec<ChecklistItem> {
    source::parse_checklist(CHECKLIST_MD)
}
