//! Append-only JSON journal of applied fixes.

use crate::error::Result;
use crate::io::{atomic_write, Writer};
use crate::types::FindingCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub file: PathBuf,
    pub issue_code: FindingCode,
    /// Rewrite kind, e.g. `removed_tag`.
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted_content: Option<String>,
    pub backup_path: PathBuf,
}

/// The journal file is a single JSON array, rewritten atomically on every
/// append so an interrupted run never leaves it half-written.
#[derive(Debug, Clone)]
pub struct AuditJournal {
    path: PathBuf,
}

impl AuditJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, oldest first. A missing or empty file is an empty journal.
    pub fn load(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    pub fn append(&self, entries: &[AuditEntry]) -> Result<()> {
        self.append_with(entries, atomic_write)
    }

    /// Append through `write`, which receives the whole encoded journal.
    pub fn append_with(&self, entries: &[AuditEntry], write: Writer) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut all = self.load()?;
        all.extend_from_slice(entries);
        let data = serde_json::to_vec_pretty(&all)?;
        write(&self.path, &data)?;
        tracing::debug!(journal = %self.path.display(), added = entries.len(), "audit entries appended");
        Ok(())
    }

    /// The last `limit` entries, oldest first.
    pub fn tail(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let mut all = self.load()?;
        let skip = all.len().saturating_sub(limit);
        Ok(all.split_off(skip))
    }
}
