//! Markdown dialect used for editing, importing and exporting rule sets.
//!
//! Guidelines are level-2 headings `## {id}. {title}` followed by the
//! description. Checklist items are `- [ ] {text}` lines. Decoding never
//! fails: anything that does not fit the dialect is skipped.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{next_id, ChecklistItem, Guideline};

lazy_static! {
    static ref HEADING_WITH_ID: Regex = Regex::new(r"^(\d+)\.\s+(.+)$").unwrap();
    static ref CHECKBOX_LINE: Regex = Regex::new(r"^-\s+\[[ xX]\]\s+(.+)$").unwrap();
    static ref BULLET_LINE: Regex = Regex::new(r"^-\s+(.+)$").unwrap();
}

const HEADING_MARKER: &str = "## ";

pub fn encode_guidelines(guidelines: &[Guideline]) -> String {
    guidelines
        .iter()
        .map(|g| format!("## {}. {}\n\n{}\n", g.id, g.title, g.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split on lines starting with `## `. Text before the first heading counts
/// as a section of its own.
fn sections(markdown: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    for line in markdown.split_inclusive('\n') {
        if let Some(rest) = line.strip_prefix(HEADING_MARKER) {
            if !current.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
            current.push_str(rest);
        } else {
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        sections.push(current);
    }
    sections
}

pub fn decode_guidelines(markdown: &str) -> Vec<Guideline> {
    let mut guidelines: Vec<Guideline> = Vec::new();

    for section in sections(markdown) {
        let mut lines = section.trim().lines();
        let title_line = lines.next().unwrap_or_default();
        let description = lines.collect::<Vec<_>>().join("\n").trim().to_string();

        let numbered = HEADING_WITH_ID.captures(title_line).and_then(|caps| {
            let id = caps[1].parse::<u32>().ok()?;
            Some((id, caps[2].trim().to_string()))
        });

        let (id, title) = match numbered {
            Some(found) => found,
            None => match next_id(&guidelines) {
                Some(id) => (id, title_line.trim().to_string()),
                None => {
                    tracing::warn!(title = title_line.trim(), "no id left for unnumbered guideline, skipping");
                    continue;
                }
            },
        };

        if title.is_empty() {
            continue;
        }
        guidelines.push(Guideline {
            id,
            title,
            description,
        });
    }

    guidelines
}

pub fn encode_checklist(items: &[ChecklistItem]) -> String {
    items
        .iter()
        .map(|item| format!("- [ ] {}", item.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ids are assigned from 1 in line order; the markdown carries none.
pub fn decode_checklist(markdown: &str) -> Vec<ChecklistItem> {
    let mut items: Vec<ChecklistItem> = Vec::new();

    for line in markdown.lines() {
        let caps = CHECKBOX_LINE
            .captures(line)
            .or_else(|| BULLET_LINE.captures(line));
        let Some(caps) = caps else { continue };

        let text = caps[1].trim();
        if text.is_empty() {
            continue;
        }
        items.push(ChecklistItem {
            id: items.len() as u32 + 1,
            text: text.to_string(),
        });
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn guideline(id: u32, title: &str, description: &str) -> Guideline {
        Guideline {
            id,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    fn item(id: u32, text: &str) -> ChecklistItem {
        ChecklistItem {
            id,
            text: text.to_string(),
        }
    }

    #[test]
    fn encodes_guidelines_as_headings() {
        let md = encode_guidelines(&[guideline(1, "Be brief", "Short sentences."), guideline(3, "No jargon", "")]);
        assert_eq!(md, "## 1. Be brief\n\nShort sentences.\n\n## 3. No jargon\n\n\n");
    }

    #[test]
    fn guideline_round_trip() {
        let original = vec![
            guideline(2, "Active voice", "Prefer \"we measured\" over \"it was measured\"."),
            guideline(5, "Explain acronyms", "First use spelled out.\n\nEven common ones like API."),
            guideline(9, "Code samples", ""),
        ];
        assert_eq!(decode_guidelines(&encode_guidelines(&original)), original);
    }

    #[test]
    fn auto_assigns_missing_ids() {
        let md = "## 4. Numbered\nfirst\n## Unnumbered\nsecond\n## Another\n";
        let decoded = decode_guidelines(md);
        assert_eq!(
            decoded,
            vec![
                guideline(4, "Numbered", "first"),
                guideline(5, "Unnumbered", "second"),
                guideline(6, "Another", ""),
            ]
        );
    }

    #[test]
    fn first_auto_id_is_one() {
        assert_eq!(decode_guidelines("## Hello\nworld"), vec![guideline(1, "Hello", "world")]);
    }

    #[test]
    fn preamble_becomes_a_section() {
        let decoded = decode_guidelines("My rules\n\n## 2. Title\nbody\n");
        assert_eq!(decoded, vec![guideline(1, "My rules", ""), guideline(2, "Title", "body")]);
    }

    #[test]
    fn unnumbered_section_after_max_id_is_skipped() {
        let decoded = decode_guidelines("## 4294967295. Last

## No number
body
");
        assert_eq!(decoded, vec![guideline(u32::MAX, "Last", "")]);
    }

    #[test]
    fn drops_sections_without_title() {
        assert!(decode_guidelines("## \n\n##    \n").is_empty());
        assert!(decode_guidelines("").is_empty());
    }

    #[test]
    fn heading_marker_needs_line_start() {
        let decoded = decode_guidelines("## 1. Title\nsee the ## section\n");
        assert_eq!(decoded, vec![guideline(1, "Title", "see the ## section")]);
    }

    #[test]
    fn encodes_checklist_lines() {
        assert_eq!(
            encode_checklist(&[item(1, "Intro"), item(7, "Outro")]),
            "- [ ] Intro\n- [ ] Outro"
        );
    }

    #[test]
    fn checklist_round_trip_reassigns_ids() {
        let original = vec![item(10, "Has a title"), item(4, "Has a summary"), item(12, "Links work")];
        let decoded = decode_checklist(&encode_checklist(&original));
        assert_eq!(
            decoded,
            vec![item(1, "Has a title"), item(2, "Has a summary"), item(3, "Links work")]
        );
    }

    #[test]
    fn accepts_checked_and_bare_bullets() {
        let md = "Intro prose\n- [x] Done\n- [X] Also done\n- plain bullet\n* star bullet\n-no space\n- [ ]   \n- [ ]\n";
        let texts: Vec<String> = decode_checklist(md).into_iter().map(|i| i.text).collect();
        assert_eq!(texts, vec!["Done", "Also done", "plain bullet", "[ ]"]);
    }

    #[test]
    fn tolerates_crlf() {
        let decoded = decode_checklist("- [ ] one\r\n- [ ] two\r\n");
        assert_eq!(decoded, vec![item(1, "one"), item(2, "two")]);
    }
}
