//! Traceability tags embedded in source code.
//!
//! Code sits at layer 13: its tags are resolved like document tags and count
//! as downstream consumers for the orphan sweep of every document layer.

use crate::error::Result;
use crate::scan::{self, TagOccurrence};
use crate::types::ArtifactType;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules", ".venv", "__pycache__"];

#[derive(Debug, Clone)]
pub struct CodeFile {
    pub path: PathBuf,
    pub tags: Vec<TagOccurrence>,
}

#[derive(Debug, Clone, Default)]
pub struct CodeScan {
    pub files: Vec<CodeFile>,
}

impl CodeScan {
    /// Walk `roots` for files with one of `extensions`. Missing roots are
    /// skipped with a warning; only files carrying tags are kept.
    pub fn scan(roots: &[PathBuf], extensions: &[String]) -> Result<Self> {
        let mut files = Vec::new();
        for root in roots {
            if !root.is_dir() {
                tracing::warn!(dir = %root.display(), "code directory missing, skipping");
                continue;
            }
            let walker = WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    !(e.file_type().is_dir()
                        && e.file_name()
                            .to_str()
                            .map(|n| SKIPPED_DIRS.contains(&n))
                            .unwrap_or(false))
                });
            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
                    continue;
                }
                if let Some(file) = scan_file(entry.path()) {
                    files.push(file);
                }
            }
        }
        tracing::debug!(files = files.len(), "code scan finished");
        Ok(Self { files })
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn tag_count(&self) -> usize {
        self.files.iter().map(|f| f.tags.len()).sum()
    }

    /// `(type, number)` of every document any code tag names.
    pub fn referenced_documents(&self) -> impl Iterator<Item = (ArtifactType, u32)> + '_ {
        self.files
            .iter()
            .flat_map(|f| f.tags.iter())
            .filter_map(|t| t.reference().document())
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

fn scan_file(path: &Path) -> Option<CodeFile> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping unreadable source file");
            return None;
        }
    };
    let tags = scan::scan_tags(&content);
    if tags.is_empty() {
        return None;
    }
    Some(CodeFile {
        path: path.to_path_buf(),
        tags,
    })
}
