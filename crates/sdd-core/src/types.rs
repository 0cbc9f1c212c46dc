use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ArtifactType
// ---------------------------------------------------------------------------

/// Document types of the planning hierarchy, in layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArtifactType {
    Brd,
    Prd,
    Ears,
    Bdd,
    Adr,
    Sys,
    Req,
    Impl,
    Ctr,
    Spec,
    Tasks,
    Iplan,
}

impl ArtifactType {
    pub fn all() -> &'static [ArtifactType] {
        &[
            ArtifactType::Brd,
            ArtifactType::Prd,
            ArtifactType::Ears,
            ArtifactType::Bdd,
            ArtifactType::Adr,
            ArtifactType::Sys,
            ArtifactType::Req,
            ArtifactType::Impl,
            ArtifactType::Ctr,
            ArtifactType::Spec,
            ArtifactType::Tasks,
            ArtifactType::Iplan,
        ]
    }

    /// Uppercase code used in identifiers and directory names.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactType::Brd => "BRD",
            ArtifactType::Prd => "PRD",
            ArtifactType::Ears => "EARS",
            ArtifactType::Bdd => "BDD",
            ArtifactType::Adr => "ADR",
            ArtifactType::Sys => "SYS",
            ArtifactType::Req => "REQ",
            ArtifactType::Impl => "IMPL",
            ArtifactType::Ctr => "CTR",
            ArtifactType::Spec => "SPEC",
            ArtifactType::Tasks => "TASKS",
            ArtifactType::Iplan => "IPLAN",
        }
    }

    /// Lowercase tag name used in `@tag: value` lines.
    pub fn tag(self) -> &'static str {
        match self {
            ArtifactType::Brd => "brd",
            ArtifactType::Prd => "prd",
            ArtifactType::Ears => "ears",
            ArtifactType::Bdd => "bdd",
            ArtifactType::Adr => "adr",
            ArtifactType::Sys => "sys",
            ArtifactType::Req => "req",
            ArtifactType::Impl => "impl",
            ArtifactType::Ctr => "ctr",
            ArtifactType::Spec => "spec",
            ArtifactType::Tasks => "tasks",
            ArtifactType::Iplan => "iplan",
        }
    }

    pub fn from_tag(tag: &str) -> Option<ArtifactType> {
        ArtifactType::all().iter().copied().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactType {
    type Err = crate::error::SddError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactType::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::error::SddError::UnknownArtifactType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Markdown,
    Yaml,
    Gherkin,
}

impl Format {
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext {
            "md" => Some(Format::Markdown),
            "yaml" | "yml" => Some(Format::Yaml),
            "feature" => Some(Format::Gherkin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Markdown => "markdown",
            Format::Yaml => "yaml",
            Format::Gherkin => "gherkin",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = crate::error::SddError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(crate::error::SddError::UnknownSeverity(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// FindingCode
// ---------------------------------------------------------------------------

/// Stable finding codes. The serialized form is `XDOC-NNN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FindingCode {
    #[serde(rename = "XDOC-001")]
    UnknownElement,
    #[serde(rename = "XDOC-002")]
    MissingTag,
    #[serde(rename = "XDOC-003")]
    MissingUpstream,
    #[serde(rename = "XDOC-004")]
    TagMismatch,
    #[serde(rename = "XDOC-005")]
    DeprecatedReference,
    #[serde(rename = "XDOC-006")]
    InvalidFormat,
    #[serde(rename = "XDOC-007")]
    ChainGap,
    #[serde(rename = "XDOC-008")]
    BrokenLink,
    #[serde(rename = "XDOC-009")]
    MissingTraceability,
    #[serde(rename = "XDOC-010")]
    Orphan,
    #[serde(rename = "XDOC-011")]
    DuplicateArtifact,
}

impl FindingCode {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingCode::UnknownElement => "XDOC-001",
            FindingCode::MissingTag => "XDOC-002",
            FindingCode::MissingUpstream => "XDOC-003",
            FindingCode::TagMismatch => "XDOC-004",
            FindingCode::DeprecatedReference => "XDOC-005",
            FindingCode::InvalidFormat => "XDOC-006",
            FindingCode::ChainGap => "XDOC-007",
            FindingCode::BrokenLink => "XDOC-008",
            FindingCode::MissingTraceability => "XDOC-009",
            FindingCode::Orphan => "XDOC-010",
            FindingCode::DuplicateArtifact => "XDOC-011",
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FixStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixStatus {
    Fixed,
    NotFixed,
    Skipped,
}

impl FixStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FixStatus::Fixed => "fixed",
            FixStatus::NotFixed => "not-fixed",
            FixStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for FixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
