//! One-way parser for the canonical rule documents the built-in defaults are
//! seeded from. Stricter than the editing dialect in [`crate::codec`]: only
//! `1. **Title**: description` lines and unchecked `- [ ] text` boxes count.

use lazy_static::lazy_static;
use regex::Regex;

use crate::schema::Validate;
use crate::{ChecklistItem, Guideline};

lazy_static! {
    static ref GUIDELINE_LINE: Regex = Regex::new(r"^(\d+)\.\s+\*\*([^:*]+)\*\*:\s+(.+)").unwrap();
    static ref UNCHECKED_BOX: Regex = Regex::new(r"^-\s*\[\s*\]\s+(.+)").unwrap();
    static ref LINK: Regex = Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*([^*]+)\*\*").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*([^*]+)\*").unwrap();
}

/// Replace links with their text and drop bold/italic markers.
pub fn strip_inline_markdown(text: &str) -> String {
    let text = LINK.replace_all(text, "$1");
    let text = BOLD.replace_all(&text, "$1");
    ITALIC.replace_all(&text, "$1").into_owned()
}

pub fn parse_guidelines(markdown: &str) -> Vec<Guideline> {
    let mut guidelines = Vec::new();

    for line in markdown.lines() {
        let Some(caps) = GUIDELINE_LINE.captures(line) else {
            continue;
        };
        let Ok(id) = caps[1].parse::<u32>() else {
            tracing::warn!(id = &caps[1], "guideline id out of range, skipping");
            continue;
        };
        let guideline = Guideline {
            id,
            title: caps[2].trim().to_string(),
            description: strip_inline_markdown(caps[3].trim()),
        };

        match guideline.validate() {
            Ok(()) => guidelines.push(guideline),
            Err(e) => tracing::warn!(id, error = %e, "failed to parse guideline"),
        }
    }

    guidelines
}

/// Ids count up from 1 over accepted items only, so they stay dense.
pub fn parse_checklist(markdown: &str) -> Vec<ChecklistItem> {
    let mut items = Vec::new();
    let mut id = 1;

    for line in markdown.lines() {
        let Some(caps) = UNCHECKED_BOX.captures(line) else {
            continue;
        };
        let item = ChecklistItem {
            id,
            text: strip_inline_markdown(caps[1].trim()),
        };

        match item.validate() {
            Ok(()) => {
                items.push(item);
                id += 1;
            }
            Err(e) => tracing::warn!(id, error = %e, "failed to parse checklist item"),
        }
    }

    items
}
