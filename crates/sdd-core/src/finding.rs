use crate::types::{FindingCode, FixStatus, Severity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// FixAction
// ---------------------------------------------------------------------------

/// Deterministic remedy attached to a fixable finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixAction {
    /// Append the traceability scaffold, seeded with `null` rows for `tags`.
    AddTraceabilitySection { primary_id: String, tags: Vec<String> },
    /// Insert `@tag: value` right after the traceability heading.
    InsertTag { tag: String, value: String },
    /// Rewrite a malformed value in place.
    RepairFormat {
        tag: String,
        value: String,
        replacement: String,
    },
    /// Delete the tag line and leave a removal note after the frontmatter.
    RemoveTag { tag: String, value: String },
    /// Replace the value with `null` plus a note naming the old ID.
    NeutralizeDeprecated { tag: String, value: String },
    /// Replace the link with an HTML comment holding it verbatim.
    CommentOutLink { raw: String },
}

impl FixAction {
    /// Application order within a file: structural, insertions, in-place
    /// edits, destructive removals.
    pub fn category(&self) -> u8 {
        match self {
            FixAction::AddTraceabilitySection { .. } => 1,
            FixAction::InsertTag { .. } => 2,
            FixAction::RepairFormat { .. } | FixAction::NeutralizeDeprecated { .. } => 3,
            FixAction::RemoveTag { .. } | FixAction::CommentOutLink { .. } => 4,
        }
    }

    /// Removals of upstream tags need confirmation unless forced.
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, FixAction::RemoveTag { .. })
    }

    /// Audit journal `action` value.
    pub fn audit_kind(&self) -> &'static str {
        match self {
            FixAction::AddTraceabilitySection { .. } => "added_section",
            FixAction::InsertTag { .. } => "inserted_tag",
            FixAction::RepairFormat { .. } => "repaired_format",
            FixAction::RemoveTag { .. } => "removed_tag",
            FixAction::NeutralizeDeprecated { .. } => "neutralized_deprecated",
            FixAction::CommentOutLink { .. } => "removed_link",
        }
    }
}

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub code: FindingCode,
    pub severity: Severity,
    pub message: String,
    pub file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_action: Option<FixAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FixStatus>,
}

impl Finding {
    pub fn new(
        code: FindingCode,
        severity: Severity,
        file: &Path,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            file: file.to_path_buf(),
            line: None,
            fix_action: None,
            status: None,
        }
    }

    pub fn error(code: FindingCode, file: &Path, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, file, message)
    }

    pub fn warning(code: FindingCode, file: &Path, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, file, message)
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_fix(mut self, fix: FixAction) -> Self {
        self.fix_action = Some(fix);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_fixable(&self) -> bool {
        self.fix_action.is_some()
    }

    /// Identity across runs. Line numbers move when fixes land, so they are
    /// not part of it.
    pub fn same_issue(&self, other: &Finding) -> bool {
        self.code == other.code && self.file == other.file && self.message == other.message
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub fixable: usize,
}

impl Summary {
    pub fn of(findings: &[Finding]) -> Self {
        let mut s = Summary::default();
        for f in findings {
            match f.severity {
                Severity::Error => s.errors += 1,
                Severity::Warning => s.warnings += 1,
                Severity::Info => s.infos += 1,
            }
            if f.is_fixable() {
                s.fixable += 1;
            }
        }
        s
    }
}
