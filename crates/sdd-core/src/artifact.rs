use crate::frontmatter::Frontmatter;
use crate::scan::TagOccurrence;
use crate::types::{ArtifactType, Format};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// ArtifactKey
// ---------------------------------------------------------------------------

/// Canonical `(type, number[, section])` identity of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub artifact_type: ArtifactType,
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<u32>,
}

impl ArtifactKey {
    pub fn new(artifact_type: ArtifactType, number: u32, section: Option<u32>) -> Self {
        Self {
            artifact_type,
            number,
            section,
        }
    }

    /// The `(type, number)` document this key belongs to.
    pub fn document(&self) -> (ArtifactType, u32) {
        (self.artifact_type, self.number)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.artifact_type, self.number)?;
        if let Some(s) = self.section {
            write!(f, ".{s}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ParseFault
// ---------------------------------------------------------------------------

/// Per-artifact problem found while indexing. Never aborts the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ParseFault {
    /// I/O failure or non-UTF-8 content; the body is unavailable.
    Unreadable(String),
    InvalidFrontmatter(String),
    InvalidYaml(String),
}

impl ParseFault {
    pub fn has_body(&self) -> bool {
        !matches!(self, ParseFault::Unreadable(_))
    }
}

impl fmt::Display for ParseFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFault::Unreadable(e) => write!(f, "unreadable: {e}"),
            ParseFault::InvalidFrontmatter(e) => write!(f, "invalid frontmatter: {e}"),
            ParseFault::InvalidYaml(e) => write!(f, "invalid YAML: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// Snapshot of one artifact file, taken when the index was built.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub key: ArtifactKey,
    /// Identifier as written in the filename, e.g. `REQ-007.2`.
    pub id: String,
    pub layer: u8,
    pub path: PathBuf,
    pub format: Format,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<Frontmatter>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub element_ids: BTreeSet<String>,
    /// Declared references: tag name to values, in document order.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub upstream: BTreeMap<String, Vec<String>>,
    /// Deprecated references replaced by `null`: tag name to previous IDs.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub neutralized: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<ParseFault>,
    #[serde(skip)]
    pub tags: Vec<TagOccurrence>,
    #[serde(skip)]
    pub content: String,
}

impl Artifact {
    pub fn is_readable(&self) -> bool {
        self.fault.as_ref().map(ParseFault::has_body).unwrap_or(true)
    }

    /// Resolvable as a reference target: no parse fault at all.
    pub fn is_sound(&self) -> bool {
        self.fault.is_none()
    }

    pub fn values_of(&self, tag: &str) -> &[String] {
        self.upstream.get(tag).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// True when the tag carries at least one value other than `null`.
    pub fn has_non_null(&self, tag: &str) -> bool {
        self.values_of(tag)
            .iter()
            .any(|v| !v.trim().eq_ignore_ascii_case("null"))
    }

    /// A non-null value, or a deprecated one that was neutralized in place.
    pub fn has_recorded(&self, tag: &str) -> bool {
        self.has_non_null(tag) || self.neutralized.contains_key(tag)
    }
}
