//! Line-level scanners shared by the index builder, the validator and the
//! fix engine.
//!
//! All scanners run over a *masked* copy of the document in which fenced code
//! blocks and HTML comments are blanked out byte-for-byte. Offsets in the
//! masked copy are therefore valid offsets into the original text.

use crate::layer;
use crate::reference::Reference;
use crate::types::Format;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Masking
// ---------------------------------------------------------------------------

fn is_fence(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("```") || t.starts_with("~~~")
}

fn blank(bytes: &mut [u8], range: Range<usize>) {
    for b in &mut bytes[range] {
        if *b != b'\n' && *b != b'\r' {
            *b = b' ';
        }
    }
}

/// Blank fenced code blocks and HTML comments, preserving length and newlines.
pub fn mask_inert(text: &str) -> String {
    let mut bytes = text.as_bytes().to_vec();

    let mut offset = 0;
    let mut in_fence = false;
    for line in text.split_inclusive('\n') {
        let fence = is_fence(line);
        if in_fence || fence {
            blank(&mut bytes, offset..offset + line.len());
        }
        if fence {
            in_fence = !in_fence;
        }
        offset += line.len();
    }

    let mut search = 0;
    while let Some(found) = find_bytes(&bytes, b"<!--", search) {
        let end = find_bytes(&bytes, b"-->", found + 4)
            .map(|e| e + 3)
            .unwrap_or(bytes.len());
        blank(&mut bytes, found..end);
        search = end;
    }

    // Only whole characters were replaced by ASCII spaces.
    String::from_utf8_lossy(&bytes).into_owned()
}

fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Byte offset where each line starts.
pub fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
    starts
}

/// 1-based line number of a byte offset.
pub fn line_of(starts: &[usize], offset: usize) -> usize {
    match starts.binary_search(&offset) {
        Ok(i) => i + 1,
        Err(i) => i,
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// One value of one `@name: value` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOccurrence {
    pub name: String,
    pub value: String,
    /// 1-based line number.
    pub line: usize,
    /// Byte range of `value` in the scanned text.
    pub span: Range<usize>,
    /// Byte range of the whole line, newline included.
    pub line_span: Range<usize>,
}

impl TagOccurrence {
    pub fn reference(&self) -> Reference {
        Reference::parse(&self.value)
    }
}

static TAG_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"(?:^|[^\w@])@([a-z][a-z_]*):").unwrap())
}

const VALUE_STOPS: &[char] = &['|', '"', '\'', '`', ')', ']', '<', '>'];

/// All known tags in `text`, in document order.
pub fn scan_tags(text: &str) -> Vec<TagOccurrence> {
    let masked = mask_inert(text);
    let mut out = Vec::new();
    let mut line_start = 0;

    for (idx, line) in masked.split_inclusive('\n').enumerate() {
        let line_span = line_start..line_start + line.len();
        let bare = line.trim_end_matches(['\n', '\r']);
        for caps in tag_re().captures_iter(bare) {
            let name = &caps[1];
            if !layer::is_known_tag(name) {
                continue;
            }
            let Some(whole) = caps.get(0) else { continue };
            let rest_from = whole.end();
            let rest = &bare[rest_from..];
            let stop = rest.find(VALUE_STOPS).unwrap_or(rest.len());
            let region = &rest[..stop];
            let region_from = line_start + rest_from;

            let only_blank = region.split(',').all(|p| p.trim().is_empty());
            let mut piece_from = 0;
            for piece in region.split(',') {
                let lead = piece.len() - piece.trim_start().len();
                let trimmed = piece.trim();
                if trimmed.is_empty() && !(only_blank && piece_from == 0) {
                    piece_from += piece.len() + 1;
                    continue;
                }
                let value = first_token_if_valid(trimmed);
                let start = region_from + piece_from + lead;
                out.push(TagOccurrence {
                    name: name.to_string(),
                    value: value.to_string(),
                    line: idx + 1,
                    span: start..start + value.len(),
                    line_span: line_span.clone(),
                });
                piece_from += piece.len() + 1;
            }
        }
        line_start += line.len();
    }
    out
}

static NEUTRALIZED_RE: OnceLock<Regex> = OnceLock::new();

fn neutralized_re() -> &'static Regex {
    NEUTRALIZED_RE.get_or_init(|| {
        Regex::new(r"@([a-z][a-z_]*):\s*null\s*<!--\s*Previously:\s*(\S+)\s+\(deprecated\)\s*-->")
            .unwrap()
    })
}

/// `(tag, previous id)` for every `@tag: null  <!-- Previously: X (deprecated) -->`.
pub fn scan_neutralized(text: &str) -> Vec<(String, String)> {
    neutralized_re()
        .captures_iter(text)
        .filter(|caps| layer::is_known_tag(&caps[1]))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// `BRD-01 (goals)` keeps only `BRD-01`; malformed values stay whole.
fn first_token_if_valid(value: &str) -> &str {
    let token = value.split_whitespace().next().unwrap_or("");
    if token.len() < value.len()
        && !matches!(Reference::parse(token), Reference::Invalid(_))
    {
        token
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOccurrence {
    pub text: String,
    pub target: String,
    /// The exact source text of the link, `![..](..)` included.
    pub raw: String,
    pub line: usize,
    pub span: Range<usize>,
}

impl LinkOccurrence {
    /// External, mail and same-document anchors are not checked.
    pub fn is_internal(&self) -> bool {
        !(self.target.starts_with("http://")
            || self.target.starts_with("https://")
            || self.target.starts_with("mailto:")
            || self.target.starts_with('#'))
    }

    /// Target with any `#anchor` removed.
    pub fn path_part(&self) -> &str {
        self.target.split('#').next().unwrap_or("")
    }
}

static LINK_RE: OnceLock<Regex> = OnceLock::new();

fn link_re() -> &'static Regex {
    LINK_RE.get_or_init(|| {
        Regex::new(r#"!?\[([^\]\n]*)\]\(([^)\s]+)(?:\s+"[^"\n]*")?\)"#).unwrap()
    })
}

pub fn scan_links(text: &str) -> Vec<LinkOccurrence> {
    let masked = mask_inert(text);
    let starts = line_starts(text);
    link_re()
        .captures_iter(&masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(LinkOccurrence {
                text: caps[1].to_string(),
                target: caps[2].to_string(),
                raw: text[whole.range()].to_string(),
                line: line_of(&starts, whole.start()),
                span: whole.range(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Traceability section
// ---------------------------------------------------------------------------

static MD_TRACE_RE: OnceLock<Regex> = OnceLock::new();
static YAML_TRACE_RE: OnceLock<Regex> = OnceLock::new();
static GHERKIN_TRACE_RE: OnceLock<Regex> = OnceLock::new();

fn trace_re(format: Format) -> &'static Regex {
    match format {
        Format::Markdown => MD_TRACE_RE.get_or_init(|| {
            Regex::new(r"(?im)^##[ \t]+(?:\d+(?:\.\d+)*\.?[ \t]+)?Traceability\b").unwrap()
        }),
        Format::Yaml => {
            YAML_TRACE_RE.get_or_init(|| Regex::new(r"(?m)^traceability[ \t]*:").unwrap())
        }
        Format::Gherkin => GHERKIN_TRACE_RE
            .get_or_init(|| Regex::new(r"(?im)^[ \t]*#[ \t]*Traceability\b").unwrap()),
    }
}

/// Byte range of the line holding the traceability heading or marker.
pub fn traceability_marker(text: &str, format: Format) -> Option<Range<usize>> {
    // Fences are masked, HTML comments too; the YAML/Gherkin markers live in
    // `#` comments which masking leaves alone.
    let masked = mask_inert(text);
    let m = trace_re(format).find(&masked)?;
    let end = masked[m.start()..]
        .find('\n')
        .map(|i| m.start() + i + 1)
        .unwrap_or(masked.len());
    Some(m.start()..end)
}

pub fn has_traceability_section(text: &str, format: Format) -> bool {
    traceability_marker(text, format).is_some()
}

// ---------------------------------------------------------------------------
// Titles and element IDs
// ---------------------------------------------------------------------------

static H1_RE: OnceLock<Regex> = OnceLock::new();
static FEATURE_RE: OnceLock<Regex> = OnceLock::new();
static NUMBERED_HEADING_RE: OnceLock<Regex> = OnceLock::new();
static ANCHOR_RE: OnceLock<Regex> = OnceLock::new();
static ELEMENT_DEF_RE: OnceLock<Regex> = OnceLock::new();
static DISCIPLINE_RE: OnceLock<Regex> = OnceLock::new();

fn h1_re() -> &'static Regex {
    H1_RE.get_or_init(|| Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*$").unwrap())
}

fn feature_re() -> &'static Regex {
    FEATURE_RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*Feature:[ \t]*(.+?)[ \t]*$").unwrap())
}

fn numbered_heading_re() -> &'static Regex {
    NUMBERED_HEADING_RE
        .get_or_init(|| Regex::new(r"(?m)^#{3,6}[ \t]+(\d+(?:\.\d+)*)\.?[ \t]").unwrap())
}

fn anchor_re() -> &'static Regex {
    ANCHOR_RE.get_or_init(|| Regex::new(r"\{#([A-Za-z0-9_.:\-]+)\}").unwrap())
}

fn element_def_re() -> &'static Regex {
    ELEMENT_DEF_RE.get_or_init(|| {
        Regex::new(
            r"(?m)^(?:#{2,6}[ \t]+|[ \t]*-?[ \t]*id:[ \t]*)([A-Z]{2,5}\.\d{2,9}\.\d{2,9}\.\d{2,9})\b",
        )
        .unwrap()
    })
}

fn discipline_re() -> &'static Regex {
    DISCIPLINE_RE.get_or_init(|| {
        Regex::new(r"\b((?:FR|NFR|QA|AC|BR|UC|SC|TC)-\d{3,})\b").unwrap()
    })
}

/// First H1 (Markdown) or `Feature:` line (Gherkin). YAML titles come from
/// the parsed document instead.
pub fn extract_title(body: &str, format: Format) -> Option<String> {
    let masked = mask_inert(body);
    let re = match format {
        Format::Markdown => h1_re(),
        Format::Gherkin => feature_re(),
        Format::Yaml => return None,
    };
    re.captures(&masked).map(|c| c[1].to_string())
}

/// Sub-requirement identifiers defined by a document body.
pub fn extract_element_ids(body: &str) -> BTreeSet<String> {
    let masked = mask_inert(body);
    let mut ids = BTreeSet::new();
    for caps in numbered_heading_re().captures_iter(&masked) {
        ids.insert(caps[1].to_string());
    }
    for caps in anchor_re().captures_iter(&masked) {
        ids.insert(caps[1].to_string());
    }
    for caps in element_def_re().captures_iter(&masked) {
        ids.insert(caps[1].to_string());
    }
    for caps in discipline_re().captures_iter(&masked) {
        ids.insert(caps[1].to_string());
    }
    ids
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
