//! Pure text rewrites, one per [`FixAction`].
//!
//! Every rewrite is conditioned on the exact shape it repairs and returns
//! `None` when that shape is absent, so re-running a fix is a no-op.

use crate::finding::FixAction;
use crate::frontmatter;
use crate::scan::{self, TagOccurrence};
use crate::types::{ArtifactType, Format};
use std::ops::Range;

/// Result of one applied rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub content: String,
    pub removed: Option<String>,
    pub inserted: Option<String>,
}

pub fn apply(content: &str, format: Format, action: &FixAction) -> Option<Rewrite> {
    match action {
        FixAction::AddTraceabilitySection { primary_id, tags } => {
            add_section(content, format, primary_id, tags)
        }
        FixAction::InsertTag { tag, value } => insert_tag(content, format, tag, value),
        FixAction::RepairFormat {
            tag,
            value,
            replacement,
        } => replace_value(content, tag, value, replacement),
        FixAction::NeutralizeDeprecated { tag, value } => {
            let replacement = format!("null  <!-- Previously: {value} (deprecated) -->");
            replace_value(content, tag, value, &replacement)
        }
        FixAction::RemoveTag { tag, value } => remove_tag(content, format, tag, value),
        FixAction::CommentOutLink { raw } => comment_out_link(content, raw),
    }
}

fn splice(content: &str, range: Range<usize>, with: &str) -> String {
    let mut out = String::with_capacity(content.len() + with.len());
    out.push_str(&content[..range.start]);
    out.push_str(with);
    out.push_str(&content[range.end..]);
    out
}

fn find_tag<'t>(tags: &'t [TagOccurrence], tag: &str, value: &str) -> Option<&'t TagOccurrence> {
    tags.iter().find(|t| t.name == tag && t.value == value)
}

fn comment_prefix(format: Format) -> &'static str {
    match format {
        Format::Markdown => "",
        Format::Yaml => "  # ",
        Format::Gherkin => "# ",
    }
}

// ---------------------------------------------------------------------------
// Category 1: traceability section
// ---------------------------------------------------------------------------

fn scaffold(format: Format, primary_id: &str, tags: &[String]) -> String {
    let mut rows = vec![
        "### Upstream Sources".to_string(),
        "| Artifact | Reference | Description |".to_string(),
        "|----------|-----------|-------------|".to_string(),
    ];
    for tag in tags {
        let label = ArtifactType::from_tag(tag)
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| tag.to_uppercase());
        rows.push(format!("| {label} | @{tag}: null | |"));
    }
    rows.extend([
        String::new(),
        "### Downstream Artifacts".to_string(),
        "| Artifact | Reference | Description |".to_string(),
        "|----------|-----------|-------------|".to_string(),
        String::new(),
        "### Document Anchors".to_string(),
        format!("- Primary ID: {primary_id}"),
    ]);

    let mut out = String::new();
    match format {
        Format::Markdown => {
            out.push_str("## Traceability\n\n");
            for row in rows {
                out.push_str(&row);
                out.push('\n');
            }
        }
        Format::Yaml | Format::Gherkin => {
            let (heading, prefix) = if format == Format::Yaml {
                ("traceability:\n", "  #")
            } else {
                ("# Traceability\n", "#")
            };
            out.push_str(heading);
            for row in rows {
                out.push_str(prefix);
                let row = row.trim_start_matches("### ");
                if !row.is_empty() {
                    out.push(' ');
                    out.push_str(row);
                }
                out.push('\n');
            }
        }
    }
    out
}

/// Offset of a trailing `---` line that closes the body, if any.
fn trailing_rule(content: &str) -> Option<usize> {
    let body_from = frontmatter::split_frontmatter(content)
        .map(|b| b.end)
        .unwrap_or(0);
    let trimmed = content.trim_end();
    let last_line_start = trimmed.rfind('\n').map(|i| i + 1).unwrap_or(0);
    (trimmed[last_line_start..].trim() == "---" && last_line_start >= body_from && last_line_start > 0)
        .then_some(last_line_start)
}

fn add_section(content: &str, format: Format, primary_id: &str, tags: &[String]) -> Option<Rewrite> {
    if scan::has_traceability_section(content, format) {
        return None;
    }
    let block = scaffold(format, primary_id, tags);
    let at = trailing_rule(content).unwrap_or(content.len());

    let before = &content[..at];
    let mut inserted = String::new();
    if !before.is_empty() && !before.ends_with("\n\n") {
        inserted.push_str(if before.ends_with('\n') { "\n" } else { "\n\n" });
    }
    inserted.push_str(&block);
    if at < content.len() {
        inserted.push('\n');
    }
    Some(Rewrite {
        content: splice(content, at..at, &inserted),
        removed: None,
        inserted: Some(block),
    })
}

// ---------------------------------------------------------------------------
// Category 2: tag insertion
// ---------------------------------------------------------------------------

fn insert_tag(content: &str, format: Format, tag: &str, value: &str) -> Option<Rewrite> {
    let tags = scan::scan_tags(content);
    let existing: Vec<&TagOccurrence> = tags.iter().filter(|t| t.name == tag).collect();
    if !existing.is_empty() {
        // A scaffold row seeded with `null` takes the injected value.
        let seeded = existing
            .iter()
            .find(|t| t.value.eq_ignore_ascii_case("null"))
            .filter(|_| !value.eq_ignore_ascii_case("null"))?;
        return Some(Rewrite {
            content: splice(content, seeded.span.clone(), value),
            removed: Some(seeded.value.clone()),
            inserted: Some(value.to_string()),
        });
    }

    let marker = scan::traceability_marker(content, format)?;
    let at = tag_block_end(content, &tags, marker.end);
    let line = format!("{}@{tag}: {value}\n", comment_prefix(format));
    let mut with = line.clone();
    if !content[..at].ends_with('\n') {
        with.insert(0, '\n');
    }
    Some(Rewrite {
        content: splice(content, at..at, &with),
        removed: None,
        inserted: Some(line.trim_end().to_string()),
    })
}

/// End of the run of tag lines directly under the heading, so insertions
/// keep their order. Blank lines before the first tag are skipped.
fn tag_block_end(content: &str, tags: &[TagOccurrence], heading_end: usize) -> usize {
    let mut at = heading_end;
    let mut pos = heading_end;
    for line in content[heading_end..].split_inclusive('\n') {
        let span = pos..pos + line.len();
        if tags.iter().any(|t| t.line_span == span) {
            at = span.end;
        } else if !(line.trim().is_empty() && at == heading_end) {
            break;
        }
        pos = span.end;
    }
    at
}

// ---------------------------------------------------------------------------
// Category 3: in-place value edits
// ---------------------------------------------------------------------------

fn replace_value(content: &str, tag: &str, value: &str, replacement: &str) -> Option<Rewrite> {
    let tags = scan::scan_tags(content);
    let found = find_tag(&tags, tag, value)?;
    Some(Rewrite {
        content: splice(content, found.span.clone(), replacement),
        removed: Some(value.to_string()),
        inserted: Some(replacement.to_string()),
    })
}

// ---------------------------------------------------------------------------
// Category 4: removals
// ---------------------------------------------------------------------------

const REMOVAL_NOTE_MARKER: &str = "Removed @";

fn removal_note(format: Format, tag: &str, value: &str) -> String {
    let text = format!("Removed @{tag} reference: {value} not found (strict hierarchy enforcement)");
    match format {
        Format::Markdown => format!("<!-- {text} -->"),
        Format::Yaml | Format::Gherkin => format!("# {text}"),
    }
}

/// Insertion point for a removal note: after frontmatter and after any
/// notes already placed there.
fn note_anchor(content: &str) -> usize {
    let mut at = frontmatter::split_frontmatter(content)
        .map(|b| b.end)
        .unwrap_or(0);
    for line in content[at..].split_inclusive('\n') {
        let bare = line.trim_start_matches(['<', '!', '-', '#', ' ']);
        if !bare.starts_with(REMOVAL_NOTE_MARKER) {
            break;
        }
        at += line.len();
    }
    at
}

fn remove_tag(content: &str, format: Format, tag: &str, value: &str) -> Option<Rewrite> {
    let tags = scan::scan_tags(content);
    let found = find_tag(&tags, tag, value)?;
    let siblings = tags
        .iter()
        .filter(|t| t.line_span == found.line_span)
        .count();

    let (without, removed) = if siblings == 1 {
        let removed = content[found.line_span.clone()].to_string();
        (splice(content, found.line_span.clone(), ""), removed)
    } else {
        // Other references share the line: drop only this value and its comma.
        let line = &content[found.line_span.clone()];
        let local = found.span.start - found.line_span.start..found.span.end - found.line_span.start;
        let after = &line[local.end..];
        let before = &line[..local.start];
        let range = if let Some(comma) = after.find(',').filter(|i| after[..*i].trim().is_empty()) {
            let mut end = local.end + comma + 1;
            end += line[end..].len() - line[end..].trim_start().len();
            local.start..end
        } else if let Some(comma) = before.rfind(',') {
            comma..local.end
        } else {
            local.clone()
        };
        let abs = found.line_span.start + range.start..found.line_span.start + range.end;
        let removed = content[abs.clone()].to_string();
        (splice(content, abs, ""), removed)
    };

    let note = removal_note(format, tag, value);
    let at = note_anchor(&without);
    let mut with = format!("{note}\n");
    if at > 0 && !without[..at].ends_with('\n') {
        with.insert(0, '\n');
    }
    Some(Rewrite {
        content: splice(&without, at..at, &with),
        removed: Some(removed.trim_end_matches(['\n', '\r']).to_string()),
        inserted: Some(note),
    })
}

fn comment_out_link(content: &str, raw: &str) -> Option<Rewrite> {
    let link = scan::scan_links(content).into_iter().find(|l| l.raw == raw)?;
    let note = format!("<!-- Broken link removed: {raw} -->");
    Some(Rewrite {
        content: splice(content, link.span, &note),
        removed: Some(raw.to_string()),
        inserted: Some(note),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str, format: Format, action: FixAction) -> Option<String> {
        apply(content, format, &action).map(|r| r.content)
    }

    #[test]
    fn scaffold_goes_before_trailing_rule() {
        let doc = "---\ntitle: x\n---\n# PRD-01\n\nBody.\n\n---\n";
        let out = run(
            doc,
            Format::Markdown,
            FixAction::AddTraceabilitySection {
                primary_id: "PRD-01".into(),
                tags: vec!["brd".into()],
            },
        )
        .unwrap();
        assert!(out.starts_with("---\ntitle: x\n---\n# PRD-01\n\nBody.\n\n## Traceability\n"));
        assert!(out.contains("| BRD | @brd: null | |\n"));
        assert!(out.contains("- Primary ID: PRD-01\n"));
        assert!(out.ends_with("\n---\n"));
        assert!(scan::has_traceability_section(&out, Format::Markdown));
    }

    #[test]
    fn scaffold_is_not_added_twice() {
        let action = FixAction::AddTraceabilitySection {
            primary_id: "BRD-01".into(),
            tags: vec![],
        };
        let once = run("# BRD-01\n", Format::Markdown, action.clone()).unwrap();
        assert!(run(&once, Format::Markdown, action).is_none());
    }

    #[test]
    fn yaml_scaffold_stays_parseable() {
        let doc = "title: Spec\nversion: 1\n";
        let out = run(
            doc,
            Format::Yaml,
            FixAction::AddTraceabilitySection {
                primary_id: "SPEC-01".into(),
                tags: vec!["brd".into(), "req".into()],
            },
        )
        .unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(parsed["title"], "Spec");
        assert!(out.contains("  # | REQ | @req: null | |\n"));
        let tags = scan::scan_tags(&out);
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn insert_after_heading() {
        let doc = "# EARS-01\n\n## 7. Traceability\n\nText\n";
        let out = run(
            doc,
            Format::Markdown,
            FixAction::InsertTag {
                tag: "brd".into(),
                value: "BRD-01".into(),
            },
        )
        .unwrap();
        assert_eq!(out, "# EARS-01\n\n## 7. Traceability\n@brd: BRD-01\n\nText\n");
    }

    #[test]
    fn inserts_follow_existing_tags_in_order() {
        let mut doc = "## Traceability\n\n@brd: BRD-01\n\nBody\n".to_string();
        for (tag, value) in [("prd", "PRD-01"), ("ears", "null")] {
            let action = FixAction::InsertTag {
                tag: tag.into(),
                value: value.into(),
            };
            doc = run(&doc, Format::Markdown, action).unwrap();
        }
        assert_eq!(
            doc,
            "## Traceability\n\n@brd: BRD-01\n@prd: PRD-01\n@ears: null\n\nBody\n"
        );
    }

    #[test]
    fn yaml_inserts_keep_chain_order() {
        let mut doc = "title: x\ntraceability:\n".to_string();
        for tag in ["brd", "prd"] {
            let action = FixAction::InsertTag {
                tag: tag.into(),
                value: "null".into(),
            };
            doc = run(&doc, Format::Yaml, action).unwrap();
        }
        assert_eq!(doc, "title: x\ntraceability:\n  # @brd: null\n  # @prd: null\n");
    }

    #[test]
    fn insert_fills_seeded_null_row() {
        let doc = "## Traceability\n| BRD | @brd: null | |\n";
        let action = FixAction::InsertTag {
            tag: "brd".into(),
            value: "BRD-01".into(),
        };
        let out = run(doc, Format::Markdown, action.clone()).unwrap();
        assert_eq!(out, "## Traceability\n| BRD | @brd: BRD-01 | |\n");
        assert!(run(&out, Format::Markdown, action).is_none());
    }

    #[test]
    fn gherkin_insert_is_a_comment() {
        let doc = "# Traceability\nFeature: Checkout\n";
        let out = run(
            doc,
            Format::Gherkin,
            FixAction::InsertTag {
                tag: "prd".into(),
                value: "null".into(),
            },
        )
        .unwrap();
        assert_eq!(out, "# Traceability\n# @prd: null\nFeature: Checkout\n");
    }

    #[test]
    fn neutralize_deprecated_value() {
        let doc = "## Traceability\n@req: REQ-02\n";
        let action = FixAction::NeutralizeDeprecated {
            tag: "req".into(),
            value: "REQ-02".into(),
        };
        let out = run(doc, Format::Markdown, action.clone()).unwrap();
        assert_eq!(
            out,
            "## Traceability\n@req: null  <!-- Previously: REQ-02 (deprecated) -->\n"
        );
        assert!(run(&out, Format::Markdown, action).is_none());
    }

    #[test]
    fn repair_rewrites_only_the_value() {
        let doc = "| BRD | @brd: brd_1 | goals |\n";
        let out = run(
            doc,
            Format::Markdown,
            FixAction::RepairFormat {
                tag: "brd".into(),
                value: "brd_1".into(),
                replacement: "BRD-01".into(),
            },
        )
        .unwrap();
        assert_eq!(out, "| BRD | @brd: BRD-01 | goals |\n");
    }

    #[test]
    fn remove_line_and_note_after_frontmatter() {
        let doc = "---\ntitle: p\n---\n# PRD-01\n## Traceability\n@brd: BRD-99\n";
        let action = FixAction::RemoveTag {
            tag: "brd".into(),
            value: "BRD-99".into(),
        };
        let rw = apply(doc, Format::Markdown, &action).unwrap();
        assert_eq!(
            rw.content,
            "---\ntitle: p\n---\n<!-- Removed @brd reference: BRD-99 not found (strict hierarchy enforcement) -->\n# PRD-01\n## Traceability\n"
        );
        assert_eq!(rw.removed.as_deref(), Some("@brd: BRD-99"));
        assert!(apply(&rw.content, Format::Markdown, &action).is_none());
    }

    #[test]
    fn later_notes_follow_earlier_ones() {
        let doc = "## Traceability\n@brd: BRD-98\n@prd: PRD-99\n";
        let first = run(
            doc,
            Format::Markdown,
            FixAction::RemoveTag {
                tag: "brd".into(),
                value: "BRD-98".into(),
            },
        )
        .unwrap();
        let second = run(
            &first,
            Format::Markdown,
            FixAction::RemoveTag {
                tag: "prd".into(),
                value: "PRD-99".into(),
            },
        )
        .unwrap();
        let lines: Vec<&str> = second.lines().collect();
        assert!(lines[0].contains("@brd reference: BRD-98"));
        assert!(lines[1].contains("@prd reference: PRD-99"));
        assert_eq!(lines[2], "## Traceability");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn remove_keeps_sibling_values() {
        let doc = "## Traceability\n@brd: BRD-01, BRD-99\n";
        let out = run(
            doc,
            Format::Markdown,
            FixAction::RemoveTag {
                tag: "brd".into(),
                value: "BRD-99".into(),
            },
        )
        .unwrap();
        assert!(out.ends_with("## Traceability\n@brd: BRD-01\n"), "{out}");
    }

    #[test]
    fn yaml_removal_note_is_a_comment() {
        let doc = "title: s\ntraceability:\n  # @req: REQ-77\n";
        let out = run(
            doc,
            Format::Yaml,
            FixAction::RemoveTag {
                tag: "req".into(),
                value: "REQ-77".into(),
            },
        )
        .unwrap();
        assert!(out.starts_with("# Removed @req reference: REQ-77"));
        assert!(serde_yaml::from_str::<serde_yaml::Value>(&out).is_ok());
    }

    #[test]
    fn broken_link_is_commented_out() {
        let doc = "see [Rationale](../ADR/ADR-missing.md) here\n";
        let action = FixAction::CommentOutLink {
            raw: "[Rationale](../ADR/ADR-missing.md)".into(),
        };
        let out = run(doc, Format::Markdown, action.clone()).unwrap();
        assert_eq!(
            out,
            "see <!-- Broken link removed: [Rationale](../ADR/ADR-missing.md) --> here\n"
        );
        assert!(run(&out, Format::Markdown, action).is_none());
    }
}
