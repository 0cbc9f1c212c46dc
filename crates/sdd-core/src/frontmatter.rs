use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Recognized frontmatter keys. Everything else is kept opaque in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, serde_yaml::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Location of a `---` fenced block at the very top of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontmatterBlock<'a> {
    pub yaml: &'a str,
    /// Byte offset just past the closing fence line.
    pub end: usize,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Find the YAML content between the first pair of `---` delimiters.
pub fn split_frontmatter(content: &str) -> Option<FrontmatterBlock<'_>> {
    let rest = content.strip_prefix("---")?;
    let (rest, open_len) = if let Some(r) = rest.strip_prefix('\n') {
        (r, 4)
    } else if let Some(r) = rest.strip_prefix("\r\n") {
        (r, 5)
    } else {
        return None;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if bare == "---" || bare == "..." {
            return Some(FrontmatterBlock {
                yaml: &rest[..offset],
                end: open_len + offset + line.len(),
            });
        }
        offset += line.len();
    }
    None
}

/// Parse a frontmatter block. An empty block yields the default.
pub fn parse(yaml: &str) -> Result<Frontmatter, serde_yaml::Error> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::default());
    }
    serde_yaml::from_str(yaml)
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

static DEPRECATED_RE: OnceLock<Regex> = OnceLock::new();

fn deprecated_re() -> &'static Regex {
    DEPRECATED_RE.get_or_init(|| {
        Regex::new(r"(?im)^[\s>|*_-]*status[*_]*\s*[:|]\s*[*_]*deprecated\b").unwrap()
    })
}

/// Case-insensitive `status: deprecated` anywhere in the document, including
/// bold document-control rows such as `| **Status** | Deprecated |`.
pub fn mentions_deprecated_status(content: &str) -> bool {
    deprecated_re().is_match(content)
}
