//! Auto-fix engine.
//!
//! One run is a batch: build the index, validate, apply the fixable findings
//! file by file in category order, then validate again to classify each
//! finding as `fixed`, `not-fixed` or `skipped`. The engine is the only
//! writer: each written file gets a `.bak` copy first and one journal entry
//! per applied rewrite. A rewrite that would raise a finding the run did not
//! already report is dropped.

pub mod audit;
pub mod rewrite;

pub use audit::{AuditEntry, AuditJournal};

use crate::artifact::Artifact;
use crate::code::CodeScan;
use crate::config::Config;
use crate::error::{Result, SddError};
use crate::finding::Finding;
use crate::index::{self, ArtifactIndex};
use crate::io;
use crate::layer::LayerTable;
use crate::types::{FindingCode, FixStatus};
use crate::validate::{Scope, ValidationOptions, Validator};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Mode / confirmation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixMode {
    #[default]
    Write,
    /// Compute every rewrite, write nothing.
    DryRun,
}

/// Asked before each destructive rewrite unless the engine is forced.
pub trait Confirm {
    fn confirm(&mut self, finding: &Finding) -> bool;
}

impl<F: FnMut(&Finding) -> bool> Confirm for F {
    fn confirm(&mut self, finding: &Finding) -> bool {
        self(finding)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedFix {
    pub code: FindingCode,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileChange {
    pub file: PathBuf,
    pub fixes: Vec<AppliedFix>,
    /// False in dry-run mode and when the write failed.
    pub written: bool,
    /// Kept only while some finding on the file remains unfixed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
    /// Where a backup left by an earlier run was moved before this write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotated_backup: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixReport {
    pub mode: FixMode,
    /// Findings of the first validation pass, each with its final status.
    pub findings: Vec<Finding>,
    pub changes: Vec<FileChange>,
    /// Findings reported by the re-validation.
    pub remaining: Vec<Finding>,
}

impl FixReport {
    pub fn count(&self, status: FixStatus) -> usize {
        self.findings
            .iter()
            .filter(|f| f.status == Some(status))
            .count()
    }

    pub fn applied(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| c.written)
            .map(|c| c.fixes.len())
            .sum()
    }

    pub fn remaining_errors(&self) -> usize {
        self.remaining.iter().filter(|f| f.is_error()).count()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct FixEngine {
    root: PathBuf,
    layers: LayerTable,
    options: ValidationOptions,
    journal: AuditJournal,
    code: Option<CodeScan>,
    mode: FixMode,
    force: bool,
    writer: io::Writer,
}

impl FixEngine {
    pub fn new(root: &Path, config: &Config) -> Self {
        Self {
            root: root.to_path_buf(),
            layers: LayerTable::standard(),
            options: ValidationOptions::from_config(config),
            journal: AuditJournal::new(config.audit_file(root)),
            code: None,
            mode: FixMode::Write,
            force: false,
            writer: io::atomic_write,
        }
    }

    pub fn mode(mut self, mode: FixMode) -> Self {
        self.mode = mode;
        self
    }

    /// Apply destructive rewrites without asking.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_code(mut self, code: CodeScan) -> Self {
        self.code = Some(code);
        self
    }

    pub fn journal(&self) -> &AuditJournal {
        &self.journal
    }

    fn validator<'a>(&'a self, index: &'a ArtifactIndex) -> Validator<'a> {
        let validator = Validator::new(index, self.options.clone());
        match &self.code {
            Some(code) => validator.with_code(code),
            None => validator,
        }
    }

    pub fn run(&self, scope: &Scope, confirm: &mut dyn Confirm) -> Result<FixReport> {
        let index = ArtifactIndex::build(&self.root, &self.layers)?;
        let validator = self.validator(&index);
        let mut findings = validator.validate(scope)?;
        if self.mode == FixMode::Write {
            // A journal that cannot be read stops the run before any write.
            self.journal.load()?;
        }

        let mut by_file: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
        for (i, f) in findings.iter().enumerate() {
            if f.is_fixable() {
                by_file.entry(f.file.clone()).or_default().push(i);
            }
        }

        let mut attempted = vec![false; findings.len()];
        let mut skipped = vec![false; findings.len()];
        let mut rejected = vec![false; findings.len()];
        let mut failed: HashSet<PathBuf> = HashSet::new();
        let mut changes = Vec::new();

        for (file, mut ids) in by_file {
            let Some(artifact) = index.find_by_path(&file) else {
                continue;
            };
            if !artifact.is_readable() {
                continue;
            }
            ids.sort_by_key(|i| findings[*i].fix_action.as_ref().map(|a| a.category()));

            let mut content = artifact.content.clone();
            let mut applied = Vec::new();
            for i in ids {
                let finding = &findings[i];
                let Some(action) = &finding.fix_action else {
                    continue;
                };
                if self.mode == FixMode::DryRun {
                    skipped[i] = true;
                } else if action.needs_confirmation() && !self.force && !confirm.confirm(finding) {
                    skipped[i] = true;
                    continue;
                } else {
                    attempted[i] = true;
                }
                let Some(rw) = rewrite::apply(&content, artifact.format, action) else {
                    tracing::debug!(file = %file.display(), code = %finding.code, "rewrite not applicable");
                    continue;
                };
                if let Some(introduced) = first_new_finding(&validator, artifact, &rw.content, &findings) {
                    tracing::debug!(
                        file = %file.display(),
                        code = %finding.code,
                        introduced = %introduced.code,
                        "rewrite rejected, it would add a finding"
                    );
                    rejected[i] = true;
                    continue;
                }
                tracing::debug!(file = %file.display(), code = %finding.code, action = action.audit_kind(), "rewrite applied");
                content = rw.content;
                applied.push(AppliedFix {
                    code: finding.code,
                    action: action.audit_kind(),
                    line: finding.line,
                    removed_content: rw.removed,
                    inserted_content: rw.inserted,
                });
            }
            if applied.is_empty() {
                continue;
            }

            let mut change = FileChange {
                file: file.clone(),
                fixes: applied,
                written: false,
                backup: None,
                rotated_backup: None,
            };
            if self.mode == FixMode::Write {
                match self.commit(&file, &content, &change.fixes) {
                    Ok(backup) => {
                        change.written = true;
                        change.backup = Some(backup.path);
                        change.rotated_backup = backup.rotated;
                    }
                    Err(e) => {
                        tracing::warn!(file = %file.display(), error = %e, "fix not committed, original restored");
                        failed.insert(file.clone());
                    }
                }
            }
            changes.push(change);
        }

        let remaining = if changes.iter().any(|c| c.written) {
            let after = ArtifactIndex::build(&self.root, &self.layers)?;
            self.validator(&after).validate(scope)?
        } else {
            findings.clone()
        };

        for (i, f) in findings.iter_mut().enumerate() {
            let status = if f.fix_action.is_none() || rejected[i] {
                FixStatus::NotFixed
            } else if skipped[i] {
                FixStatus::Skipped
            } else if !attempted[i]
                || failed.contains(&f.file)
                || remaining.iter().any(|r| r.same_issue(f))
            {
                FixStatus::NotFixed
            } else {
                FixStatus::Fixed
            };
            f.status = Some(status);
        }

        for change in &mut changes {
            let all_fixed = findings
                .iter()
                .filter(|f| f.file == change.file)
                .all(|f| f.status == Some(FixStatus::Fixed));
            if all_fixed {
                if let Some(path) = change.backup.take() {
                    io::discard_backup(&io::Backup {
                        path,
                        rotated: change.rotated_backup.take(),
                    })?;
                }
            }
        }

        let report = FixReport {
            mode: self.mode,
            findings,
            changes,
            remaining,
        };
        tracing::info!(
            applied = report.applied(),
            fixed = report.count(FixStatus::Fixed),
            skipped = report.count(FixStatus::Skipped),
            remaining = report.remaining.len(),
            "fix run finished"
        );
        Ok(report)
    }

    /// Back up, write and journal one file. Any failure puts the original back.
    fn commit(&self, file: &Path, content: &str, fixes: &[AppliedFix]) -> Result<io::Backup> {
        let backup = write_with_backup(file, content, self.writer)?;
        let now = Utc::now();
        let entries: Vec<AuditEntry> = fixes
            .iter()
            .map(|fix| AuditEntry {
                timestamp: now,
                file: self.relative(file),
                issue_code: fix.code,
                action: fix.action.to_string(),
                removed_content: fix.removed_content.clone(),
                inserted_content: fix.inserted_content.clone(),
                backup_path: self.relative(&backup.path),
            })
            .collect();
        if let Err(e) = self.journal.append_with(&entries, self.writer) {
            roll_back(file, &backup);
            return Err(e);
        }
        Ok(backup)
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// The first finding `content` would raise on `artifact` that the run did
/// not already report.
fn first_new_finding(
    validator: &Validator<'_>,
    artifact: &Artifact,
    content: &str,
    known: &[Finding],
) -> Option<Finding> {
    let candidate = index::parse_artifact(
        &artifact.path,
        artifact.key,
        artifact.id.clone(),
        artifact.layer,
        artifact.format,
        content.to_string(),
    );
    validator
        .check_artifact(&candidate)
        .into_iter()
        .find(|f| !known.iter().any(|k| k.same_issue(f)))
}

/// Back the file up, then replace it through `write`. A failed write puts
/// the original back.
fn write_with_backup(path: &Path, content: &str, write: io::Writer) -> Result<io::Backup> {
    let backup = io::create_backup(path).map_err(|e| fix_write_error(path, e))?;
    if let Err(e) = write(path, content.as_bytes()) {
        roll_back(path, &backup);
        return Err(fix_write_error(path, e));
    }
    Ok(backup)
}

/// Restore `path` from its backup and drop the backup. If the restore fails
/// the backup stays where it is.
fn roll_back(path: &Path, backup: &io::Backup) {
    if let Err(e) = io::restore_backup(path, &backup.path) {
        tracing::warn!(file = %path.display(), backup = %backup.path.display(), error = %e, "restore from backup failed, backup kept");
        return;
    }
    if let Err(e) = io::discard_backup(backup) {
        tracing::warn!(backup = %backup.path.display(), error = %e, "could not remove backup");
    }
}

fn fix_write_error(path: &Path, e: SddError) -> SddError {
    match e {
        SddError::Io(source) => SddError::FixWrite {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    /// One sound artifact of every type in `types`.
    fn upstream(root: &Path, types: &[&str]) {
        for t in types {
            write(root, &format!("{t}/{t}-01_x.md"), &format!("# {t}-01\n\n## Traceability\n"));
        }
    }

    fn engine(root: &Path) -> FixEngine {
        FixEngine::new(root, &Config::default())
    }

    fn yes() -> impl FnMut(&Finding) -> bool {
        |_: &Finding| true
    }

    fn no() -> impl FnMut(&Finding) -> bool {
        |_: &Finding| false
    }

    const SPEC_UPSTREAM: &[&str] = &["BRD", "PRD", "EARS", "BDD", "ADR", "SYS"];
    const SPEC_TAGS: &str =
        "@brd: BRD-01\n@prd: PRD-01\n@ears: EARS-01\n@bdd: BDD-01\n@adr: ADR-01\n@sys: SYS-01\n";

    #[test]
    fn deprecated_reference_is_neutralized() {
        let dir = TempDir::new().unwrap();
        upstream(dir.path(), SPEC_UPSTREAM);
        write(dir.path(), "REQ/REQ-02_old.md", "---\nstatus: deprecated\n---\n# REQ-02\n");
        let spec = dir.path().join("SPEC/SPEC-01_api.md");
        write(
            dir.path(),
            "SPEC/SPEC-01_api.md",
            &format!("# SPEC-01\n\n## Traceability\n{SPEC_TAGS}@req: REQ-02\n"),
        );

        let report = engine(dir.path())
            .run(&Scope::Artifact(spec.clone()), &mut yes())
            .unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].code, FindingCode::DeprecatedReference);
        assert_eq!(report.findings[0].status, Some(FixStatus::Fixed));

        let after = std::fs::read_to_string(&spec).unwrap();
        assert!(after.contains("\n@req: null  <!-- Previously: REQ-02 (deprecated) -->\n"));
        assert!(!spec.with_file_name("SPEC-01_api.md.bak").exists());

        let journal = engine(dir.path()).journal().load().unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].action, "neutralized_deprecated");
    }

    fn missing_upstream_corpus() -> (TempDir, PathBuf, &'static str) {
        let dir = TempDir::new().unwrap();
        upstream(dir.path(), &["BRD"]);
        let doc = "---\ntitle: Checkout\n---\n# PRD-01\n\n## Traceability\n@brd: BRD-01\n@brd: BRD-99\n";
        write(dir.path(), "PRD/PRD-01_checkout.md", doc);
        let path = dir.path().join("PRD/PRD-01_checkout.md");
        (dir, path, doc)
    }

    #[test]
    fn forced_removal_of_missing_upstream() {
        let (dir, prd, _) = missing_upstream_corpus();
        let report = engine(dir.path())
            .force(true)
            .run(&Scope::Artifact(prd.clone()), &mut no())
            .unwrap();
        assert_eq!(report.count(FixStatus::Fixed), 1);

        let after = std::fs::read_to_string(&prd).unwrap();
        assert_eq!(
            after,
            "---\ntitle: Checkout\n---\n<!-- Removed @brd reference: BRD-99 not found (strict hierarchy enforcement) -->\n# PRD-01\n\n## Traceability\n@brd: BRD-01\n"
        );

        let journal = engine(dir.path()).journal().load().unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].issue_code, FindingCode::MissingUpstream);
        assert_eq!(journal[0].action, "removed_tag");
        assert_eq!(journal[0].removed_content.as_deref(), Some("@brd: BRD-99"));
        assert_eq!(journal[0].backup_path, PathBuf::from("PRD/PRD-01_checkout.md.bak"));
    }

    #[test]
    fn declined_prompt_leaves_file_untouched() {
        let (dir, prd, doc) = missing_upstream_corpus();
        let mut asked = 0;
        let mut decline = |_: &Finding| {
            asked += 1;
            false
        };
        let report = engine(dir.path())
            .run(&Scope::Artifact(prd.clone()), &mut decline)
            .unwrap();
        assert_eq!(asked, 1);
        assert_eq!(report.findings[0].status, Some(FixStatus::Skipped));
        assert!(report.changes.is_empty());
        assert_eq!(std::fs::read_to_string(&prd).unwrap(), doc);
        assert!(!dir.path().join("PRD/PRD-01_checkout.md.bak").exists());
        assert!(engine(dir.path()).journal().load().unwrap().is_empty());
    }

    #[test]
    fn broken_link_in_yaml_spec() {
        let dir = TempDir::new().unwrap();
        upstream(dir.path(), &["BRD", "PRD", "EARS", "BDD", "ADR", "SYS", "REQ"]);
        let tags: String = SPEC_TAGS
            .lines()
            .chain(["@req: REQ-01"])
            .map(|l| format!("  # {l}\n"))
            .collect();
        write(
            dir.path(),
            "SPEC/SPEC-01.yaml",
            &format!("title: API\ntraceability:\n{tags}  # Rationale: [Rationale](../ADR/ADR-missing.md)\n"),
        );
        let spec = dir.path().join("SPEC/SPEC-01.yaml");

        let report = engine(dir.path())
            .run(&Scope::Artifact(spec.clone()), &mut yes())
            .unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].code, FindingCode::BrokenLink);
        assert_eq!(report.findings[0].status, Some(FixStatus::Fixed));
        let after = std::fs::read_to_string(&spec).unwrap();
        assert!(after.contains("<!-- Broken link removed: [Rationale](../ADR/ADR-missing.md) -->"));
        assert!(serde_yaml::from_str::<serde_yaml::Value>(&after).is_ok());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (dir, prd, doc) = missing_upstream_corpus();
        let report = engine(dir.path())
            .mode(FixMode::DryRun)
            .run(&Scope::Artifact(prd.clone()), &mut yes())
            .unwrap();
        assert_eq!(report.findings[0].status, Some(FixStatus::Skipped));
        assert_eq!(report.changes.len(), 1);
        assert!(!report.changes[0].written);
        assert_eq!(report.applied(), 0);
        assert_eq!(std::fs::read_to_string(&prd).unwrap(), doc);
        assert!(engine(dir.path()).journal().load().unwrap().is_empty());
    }

    #[test]
    fn section_and_tags_then_idempotent() {
        let dir = TempDir::new().unwrap();
        upstream(dir.path(), &["BRD"]);
        write(dir.path(), "EARS/EARS-01_x.md", "# EARS-01\n\nWhen paid, the system shall ship.\n");
        let ears = dir.path().join("EARS/EARS-01_x.md");
        let scope = Scope::Artifact(ears.clone());

        let first = engine(dir.path()).run(&scope, &mut yes()).unwrap();
        assert_eq!(first.findings.len(), 3);
        assert_eq!(first.count(FixStatus::Fixed), 3);
        assert!(first.remaining.is_empty(), "{:?}", first.remaining);
        let after = std::fs::read_to_string(&ears).unwrap();
        assert!(after.contains("| BRD | @brd: BRD-01 | |"));
        assert!(after.contains("| PRD | @prd: null | |"));

        let second = engine(dir.path()).run(&scope, &mut yes()).unwrap();
        assert!(second.findings.is_empty());
        assert!(second.changes.is_empty());
        assert_eq!(std::fs::read_to_string(&ears).unwrap(), after);
        // The scaffold already seeded `@prd: null`, so only two rewrites landed.
        assert_eq!(engine(dir.path()).journal().load().unwrap().len(), 2);
    }

    #[test]
    fn unfixable_findings_keep_the_backup() {
        let dir = TempDir::new().unwrap();
        upstream(dir.path(), &["PRD"]);
        write(
            dir.path(),
            "EARS/EARS-01_x.md",
            "# EARS-01\n\n## Traceability\n@brd: null\n@prd: PRD-01\nSee [gone](missing.md).\n",
        );
        let ears = dir.path().join("EARS/EARS-01_x.md");
        let report = engine(dir.path())
            .run(&Scope::Artifact(ears.clone()), &mut yes())
            .unwrap();
        let gap = report
            .findings
            .iter()
            .find(|f| f.code == FindingCode::ChainGap)
            .unwrap();
        assert_eq!(gap.status, Some(FixStatus::NotFixed));
        assert!(report.changes[0].backup.is_some());
        assert!(dir.path().join("EARS/EARS-01_x.md.bak").exists());
    }

    fn subset_of(remaining: &[Finding], before: &[Finding]) -> bool {
        remaining.iter().all(|r| before.iter().any(|b| b.same_issue(r)))
    }

    #[test]
    fn neutralizing_below_a_later_tag_adds_no_gap() {
        let dir = TempDir::new().unwrap();
        upstream(dir.path(), &["BRD", "PRD", "EARS", "BDD", "ADR", "SYS", "SPEC"]);
        write(dir.path(), "REQ/REQ-02_old.md", "---\nstatus: deprecated\n---\n# REQ-02\n");
        write(
            dir.path(),
            "TASKS/TASKS-01_x.md",
            &format!("# TASKS-01\n\n## Traceability\n{SPEC_TAGS}@req: REQ-02\n@spec: SPEC-01\n"),
        );
        let tasks = dir.path().join("TASKS/TASKS-01_x.md");

        let report = engine(dir.path())
            .run(&Scope::Artifact(tasks), &mut yes())
            .unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].status, Some(FixStatus::Fixed));
        assert!(report.remaining.is_empty(), "{:?}", report.remaining);
    }

    #[test]
    fn insertion_that_opens_a_gap_is_rejected() {
        let dir = TempDir::new().unwrap();
        upstream(dir.path(), &["BRD", "PRD", "BDD", "ADR"]);
        write(dir.path(), "SYS/SYS-01_x.md", "# SYS-01\n\n## Traceability\n");
        let sys = dir.path().join("SYS/SYS-01_x.md");

        let report = engine(dir.path())
            .run(&Scope::Artifact(sys.clone()), &mut yes())
            .unwrap();
        assert_eq!(report.findings.len(), 5);
        assert!(subset_of(&report.remaining, &report.findings), "{:?}", report.remaining);
        assert!(report.remaining.iter().all(|f| f.code == FindingCode::MissingTag));

        let after = std::fs::read_to_string(&sys).unwrap();
        assert_eq!(
            after,
            "# SYS-01\n\n## Traceability\n@brd: BRD-01\n@prd: PRD-01\n@ears: null\n"
        );
        let status = |tag: &str| {
            report
                .findings
                .iter()
                .find(|f| f.message.contains(&format!("@{tag} ")))
                .and_then(|f| f.status)
        };
        assert_eq!(status("brd"), Some(FixStatus::Fixed));
        assert_eq!(status("bdd"), Some(FixStatus::NotFixed));
        assert_eq!(status("adr"), Some(FixStatus::NotFixed));
    }

    const LINKED_PRD: &str = "# PRD\n\n## Traceability\n@brd: BRD-01\nSee [gone](missing.md).\n";

    fn two_broken_prds() -> TempDir {
        let dir = TempDir::new().unwrap();
        upstream(dir.path(), &["BRD"]);
        write(dir.path(), "PRD/PRD-01_x.md", LINKED_PRD);
        write(dir.path(), "PRD/PRD-02_x.md", LINKED_PRD);
        dir
    }

    fn disk_full() -> SddError {
        std::io::Error::other("disk full").into()
    }

    fn fail_on_prd_01(path: &Path, data: &[u8]) -> Result<()> {
        if path.ends_with("PRD-01_x.md") {
            return Err(disk_full());
        }
        io::atomic_write(path, data)
    }

    fn fail_on_journal(path: &Path, data: &[u8]) -> Result<()> {
        if path.ends_with("validation_audit.json") {
            return Err(disk_full());
        }
        io::atomic_write(path, data)
    }

    fn status_of(report: &FixReport, file: &Path) -> Option<FixStatus> {
        report.findings.iter().find(|f| f.file == file).and_then(|f| f.status)
    }

    #[test]
    fn unreadable_journal_stops_before_any_write() {
        let dir = two_broken_prds();
        write(dir.path(), "tmp/validation_audit.json", "{ not json");

        assert!(engine(dir.path()).run(&Scope::Corpus, &mut yes()).is_err());
        for name in ["PRD-01_x.md", "PRD-02_x.md"] {
            let path = dir.path().join("PRD").join(name);
            assert_eq!(std::fs::read_to_string(&path).unwrap(), LINKED_PRD);
            assert!(!paths::backup_path(&path).exists());
        }
    }

    #[test]
    fn journal_failure_rolls_each_file_back_and_continues() {
        let dir = two_broken_prds();
        let mut fixer = engine(dir.path());
        fixer.writer = fail_on_journal;

        let report = fixer.run(&Scope::Corpus, &mut yes()).unwrap();
        assert_eq!(report.changes.len(), 2);
        for name in ["PRD-01_x.md", "PRD-02_x.md"] {
            let path = dir.path().join("PRD").join(name);
            assert_eq!(std::fs::read_to_string(&path).unwrap(), LINKED_PRD);
            assert!(!paths::backup_path(&path).exists());
            assert_eq!(status_of(&report, &path), Some(FixStatus::NotFixed));
        }
        assert!(report.changes.iter().all(|c| !c.written));
        assert!(!dir.path().join("tmp/validation_audit.json").exists());
    }

    #[test]
    fn failed_write_restores_the_file_and_moves_on() {
        let dir = two_broken_prds();
        let mut fixer = engine(dir.path());
        fixer.writer = fail_on_prd_01;
        let first = dir.path().join("PRD/PRD-01_x.md");
        let second = dir.path().join("PRD/PRD-02_x.md");

        let report = fixer.run(&Scope::Corpus, &mut yes()).unwrap();
        assert_eq!(std::fs::read_to_string(&first).unwrap(), LINKED_PRD);
        assert!(!paths::backup_path(&first).exists());
        assert_eq!(status_of(&report, &first), Some(FixStatus::NotFixed));

        assert!(std::fs::read_to_string(&second).unwrap().contains("<!-- Broken link removed"));
        assert_eq!(status_of(&report, &second), Some(FixStatus::Fixed));

        let journal = engine(dir.path()).journal().load().unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].file, PathBuf::from("PRD/PRD-02_x.md"));
    }

    #[test]
    fn write_failure_is_reported_as_fix_write() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "PRD/PRD-01_x.md", "original\n");
        let path = dir.path().join("PRD/PRD-01_x.md");

        let err = write_with_backup(&path, "changed\n", fail_on_prd_01).unwrap_err();
        assert!(matches!(err, SddError::FixWrite { path: p, .. } if p == path));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original\n");
        assert!(!paths::backup_path(&path).exists());
    }

    #[test]
    fn cosmetic_whitespace_passes_through_unchanged() {
        let dir = TempDir::new().unwrap();
        upstream(dir.path(), &["BRD"]);
        let doc = "# PRD-01   \n\n\n\nIntro.\t \n\n## Traceability\n@brd: BRD-01\n\n\n\n";
        write(dir.path(), "PRD/PRD-01_x.md", doc);
        let prd = dir.path().join("PRD/PRD-01_x.md");

        let report = engine(dir.path()).run(&Scope::Corpus, &mut yes()).unwrap();
        assert!(report.findings.is_empty(), "{:?}", report.findings);
        assert!(report.changes.is_empty());
        assert_eq!(std::fs::read_to_string(&prd).unwrap(), doc);
        assert!(!paths::backup_path(&prd).exists());
        assert!(engine(dir.path()).journal().load().unwrap().is_empty());
    }

    fn backups_of(dir: &Path, name: &str) -> Vec<String> {
        let prefix = format!("{name}.bak");
        let mut found: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.unwrap().file_name().into_string().ok())
            .filter(|n| n.starts_with(&prefix))
            .collect();
        found.sort();
        found
    }

    #[test]
    fn one_backup_per_run_and_earlier_backups_survive() {
        let dir = TempDir::new().unwrap();
        upstream(dir.path(), &["PRD"]);
        let doc = "# EARS-01\n\n## Traceability\n@brd: null\n@prd: PRD-01\nSee [a](a.md) and [b](b.md).\n";
        write(dir.path(), "EARS/EARS-01_x.md", doc);
        let ears = dir.path().join("EARS/EARS-01_x.md");
        let scope = Scope::Artifact(ears.clone());

        let first = engine(dir.path()).run(&scope, &mut yes()).unwrap();
        assert_eq!(first.changes[0].fixes.len(), 2);
        assert_eq!(backups_of(&dir.path().join("EARS"), "EARS-01_x.md"), ["EARS-01_x.md.bak"]);

        let fixed_once = std::fs::read_to_string(&ears).unwrap();
        std::fs::write(&ears, format!("{fixed_once}More in [c](c.md).\n")).unwrap();
        let second = engine(dir.path()).run(&scope, &mut yes()).unwrap();
        let rotated = dir.path().join("EARS/EARS-01_x.md.bak.1");
        assert_eq!(second.changes[0].rotated_backup.as_deref(), Some(rotated.as_path()));
        assert_eq!(
            backups_of(&dir.path().join("EARS"), "EARS-01_x.md"),
            ["EARS-01_x.md.bak", "EARS-01_x.md.bak.1"]
        );
        assert_eq!(std::fs::read_to_string(&rotated).unwrap(), doc);
    }
}
