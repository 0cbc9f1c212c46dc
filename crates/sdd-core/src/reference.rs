//! Tag values and the two identifier grammars.
//!
//! Document-level: `TYPE-NN[.S]`. Element-level: `TYPE.NN.TT.SS`.
//! Every tag value classifies into exactly one [`Reference`] variant.

use crate::types::ArtifactType;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static DOC_RE: OnceLock<Regex> = OnceLock::new();
static ELEM_RE: OnceLock<Regex> = OnceLock::new();
static REPAIR_RE: OnceLock<Regex> = OnceLock::new();

fn doc_re() -> &'static Regex {
    DOC_RE.get_or_init(|| Regex::new(r"^([A-Z]{2,5})-(\d{2,})(?:\.(\d+))?$").unwrap())
}

fn elem_re() -> &'static Regex {
    ELEM_RE.get_or_init(|| {
        Regex::new(r"^([A-Z]{2,5})\.(\d{2,9})\.(\d{2,9})\.(\d{2,9})$").unwrap()
    })
}

fn repair_re() -> &'static Regex {
    REPAIR_RE.get_or_init(|| Regex::new(r"(?i)([a-z]{2,5})[\s_\-.:#/]*(\d+)").unwrap())
}

// ---------------------------------------------------------------------------
// Reference
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Document {
        type_code: String,
        number: u32,
        section: Option<u32>,
    },
    Element {
        type_code: String,
        number: u32,
        element_class: u32,
        sequence: u32,
    },
    /// Explicitly no upstream.
    Null,
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Document,
    Element,
    Null,
    Invalid,
}

impl Reference {
    pub fn parse(value: &str) -> Reference {
        let value = value.trim();
        if value.eq_ignore_ascii_case("null") {
            return Reference::Null;
        }
        if let Some(caps) = doc_re().captures(value) {
            let number = caps[2].parse::<u32>();
            let section = caps.get(3).map(|m| m.as_str().parse::<u32>()).transpose();
            if let (Ok(number), Ok(section)) = (number, section) {
                return Reference::Document {
                    type_code: caps[1].to_string(),
                    number,
                    section,
                };
            }
        }
        if let Some(caps) = elem_re().captures(value) {
            if let (Ok(number), Ok(element_class), Ok(sequence)) = (
                caps[2].parse::<u32>(),
                caps[3].parse::<u32>(),
                caps[4].parse::<u32>(),
            )
            {
                return Reference::Element {
                    type_code: caps[1].to_string(),
                    number,
                    element_class,
                    sequence,
                };
            }
        }
        Reference::Invalid(value.to_string())
    }

    pub fn kind(&self) -> ReferenceKind {
        match self {
            Reference::Document { .. } => ReferenceKind::Document,
            Reference::Element { .. } => ReferenceKind::Element,
            Reference::Null => ReferenceKind::Null,
            Reference::Invalid(_) => ReferenceKind::Invalid,
        }
    }

    pub fn type_code(&self) -> Option<&str> {
        match self {
            Reference::Document { type_code, .. } | Reference::Element { type_code, .. } => {
                Some(type_code)
            }
            Reference::Null | Reference::Invalid(_) => None,
        }
    }

    /// The referenced type, when it is part of the hierarchy.
    pub fn artifact_type(&self) -> Option<ArtifactType> {
        self.type_code().and_then(|c| ArtifactType::from_str(c).ok())
    }

    /// `(type, number)` of the document this reference lands in.
    pub fn document(&self) -> Option<(ArtifactType, u32)> {
        let t = self.artifact_type()?;
        match self {
            Reference::Document { number, .. } | Reference::Element { number, .. } => {
                Some((t, *number))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Document {
                type_code,
                number,
                section: Some(s),
            } => write!(f, "{type_code}-{number:02}.{s}"),
            Reference::Document {
                type_code,
                number,
                section: None,
            } => write!(f, "{type_code}-{number:02}"),
            Reference::Element {
                type_code,
                number,
                element_class,
                sequence,
            } => write!(f, "{type_code}.{number:02}.{element_class:02}.{sequence:02}"),
            Reference::Null => f.write_str("null"),
            Reference::Invalid(raw) => f.write_str(raw),
        }
    }
}

/// Heuristic repair of a malformed value: the first plausible type/number
/// pair rewritten as `TYPE-NN`. Only hierarchy types are accepted.
pub fn repair_value(value: &str) -> Option<String> {
    repair_re().captures_iter(value).find_map(|caps| {
        let code = caps[1].to_ascii_uppercase();
        ArtifactType::from_str(&code).ok()?;
        let digits = &caps[2];
        Some(if digits.len() < 2 {
            format!("{code}-0{digits}")
        } else {
            format!("{code}-{digits}")
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_document_references() {
        assert_eq!(
            Reference::parse("BRD-01"),
            Reference::Document {
                type_code: "BRD".into(),
                number: 1,
                section: None
            }
        );
        assert_eq!(
            Reference::parse("REQ-003.2"),
            Reference::Document {
                type_code: "REQ".into(),
                number: 3,
                section: Some(2)
            }
        );
    }

    #[test]
    fn classifies_element_references() {
        assert_eq!(
            Reference::parse("PRD.01.07.03"),
            Reference::Element {
                type_code: "PRD".into(),
                number: 1,
                element_class: 7,
                sequence: 3
            }
        );
    }

    #[test]
    fn null_is_case_insensitive() {
        assert_eq!(Reference::parse("NULL"), Reference::Null);
        assert_eq!(Reference::parse(" null "), Reference::Null);
    }

    #[test]
    fn classes_are_disjoint() {
        for (value, kind) in [
            ("BRD-01", ReferenceKind::Document),
            ("BRD.01.02.03", ReferenceKind::Element),
            ("null", ReferenceKind::Null),
            ("BRD-1", ReferenceKind::Invalid),
            ("brd-01", ReferenceKind::Invalid),
            ("BRD.01.02", ReferenceKind::Invalid),
            ("BRD-01.x", ReferenceKind::Invalid),
            ("TOOLONG-01", ReferenceKind::Invalid),
        ] {
            assert_eq!(Reference::parse(value).kind(), kind, "{value}");
        }
    }

    #[test]
    fn unknown_type_parses_but_has_no_artifact_type() {
        let r = Reference::parse("XYZ-01");
        assert_eq!(r.kind(), ReferenceKind::Document);
        assert_eq!(r.artifact_type(), None);
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(Reference::parse("BRD-01.0").to_string(), "BRD-01.0");
        assert_eq!(Reference::parse("PRD.01.07.03").to_string(), "PRD.01.07.03");
    }

    #[test]
    fn repair_extracts_first_pair() {
        assert_eq!(repair_value("brd_1").as_deref(), Some("BRD-01"));
        assert_eq!(repair_value("PRD 007").as_deref(), Some("PRD-007"));
        assert_eq!(repair_value("see REQ#12 for details").as_deref(), Some("REQ-12"));
        assert_eq!(repair_value("nothing here"), None);
        assert_eq!(repair_value("XYZ-01"), None);
    }
}
