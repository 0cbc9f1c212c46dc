use crate::artifact::{Artifact, ArtifactKey};
use crate::index::ArtifactIndex;
use crate::reference::Reference;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    /// `null`: explicitly no upstream.
    NoUpstream,
    /// Fails both identifier grammars.
    Invalid,
    Missing,
    /// Present on disk but carrying a parse fault.
    Faulted(&'a Artifact),
    Found(&'a Artifact),
}

impl<'a> Resolution<'a> {
    pub fn artifact(&self) -> Option<&'a Artifact> {
        match self {
            Resolution::Found(a) => Some(a),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Answers existence queries against a built index.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    index: &'a ArtifactIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a ArtifactIndex) -> Self {
        Self { index }
    }

    /// Exact key first; a sectionless key then falls back to the `.0` index
    /// file and finally to any section of the same document.
    pub fn resolve(&self, reference: &Reference) -> Resolution<'a> {
        let (artifact_type, number, section) = match reference {
            Reference::Null => return Resolution::NoUpstream,
            Reference::Invalid(_) => return Resolution::Invalid,
            Reference::Document { section, .. } => match reference.document() {
                Some((t, n)) => (t, n, *section),
                None => return Resolution::Missing,
            },
            // Element references resolve at parent-document granularity.
            Reference::Element { .. } => match reference.document() {
                Some((t, n)) => (t, n, None),
                None => return Resolution::Missing,
            },
        };

        let mut candidates: Vec<usize> = self
            .index
            .lookup(&ArtifactKey::new(artifact_type, number, section))
            .to_vec();
        if section.is_none() {
            candidates.extend(
                self.index
                    .lookup(&ArtifactKey::new(artifact_type, number, Some(0))),
            );
            candidates.extend(self.index.document(artifact_type, number));
        }

        let mut faulted = None;
        for idx in candidates {
            let Some(artifact) = self.index.get(idx) else {
                continue;
            };
            if artifact.is_sound() {
                return Resolution::Found(artifact);
            }
            faulted.get_or_insert(artifact);
        }
        match faulted {
            Some(a) => Resolution::Faulted(a),
            None => Resolution::Missing,
        }
    }

    pub fn exists(&self, value: &str) -> bool {
        matches!(self.resolve(&Reference::parse(value)), Resolution::Found(_))
    }

    pub fn is_deprecated(&self, value: &str) -> bool {
        self.resolve(&Reference::parse(value))
            .artifact()
            .map(|a| a.deprecated)
            .unwrap_or(false)
    }

    /// True iff `element_id` is defined by the referenced document, or by any
    /// of its section pieces when the reference names no section.
    pub fn element_exists(&self, reference: &Reference, element_id: &str) -> bool {
        let Some((artifact_type, number)) = reference.document() else {
            return false;
        };
        let pieces: Vec<usize> = match reference {
            Reference::Document {
                section: Some(s), ..
            } => self
                .index
                .lookup(&ArtifactKey::new(artifact_type, number, Some(*s)))
                .to_vec(),
            _ => self.index.document(artifact_type, number).to_vec(),
        };
        pieces
            .into_iter()
            .filter_map(|i| self.index.get(i))
            .any(|a| a.element_ids.contains(element_id))
    }

    /// Strict check for element-level references: the full element ID must
    /// be defined somewhere in the parent document.
    pub fn element_defined(&self, reference: &Reference) -> bool {
        match reference {
            Reference::Element { .. } => self.element_exists(reference, &reference.to_string()),
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerTable;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn corpus() -> (TempDir, ArtifactIndex) {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "BRD/BRD-01/BRD-01.0_index.md", "# Index\n");
        write(
            dir.path(),
            "BRD/BRD-01/BRD-01.1_goals.md",
            "# Goals\n#### BRD.01.01.05: Revenue\n",
        );
        write(dir.path(), "BRD/BRD-07/BRD-07.2_only.md", "# Only section two\n");
        write(dir.path(), "PRD/PRD-01_x.md", "# X\n");
        write(
            dir.path(),
            "REQ/REQ-02_old.md",
            "---\nstatus: deprecated\n---\n# Old\n",
        );
        write(dir.path(), "ADR/ADR-03_broken.md", "---\nstatus: [\n---\n");
        let index = ArtifactIndex::build(dir.path(), &LayerTable::standard()).unwrap();
        (dir, index)
    }

    #[test]
    fn parent_of_sections_rule() {
        let (_dir, index) = corpus();
        let r = Resolver::new(&index);
        assert!(r.exists("BRD-01"));
        assert!(r.exists("BRD-01.1"));
        assert!(r.exists("BRD-07"));
        assert!(!r.exists("BRD-07.1"));
        assert!(!r.exists("BRD-99"));
    }

    #[test]
    fn sectionless_reference_prefers_index_file() {
        let (_dir, index) = corpus();
        let r = Resolver::new(&index);
        let found = r.resolve(&Reference::parse("BRD-01")).artifact().unwrap();
        assert_eq!(found.id, "BRD-01.0");
    }

    #[test]
    fn null_and_invalid_are_not_lookups() {
        let (_dir, index) = corpus();
        let r = Resolver::new(&index);
        assert!(matches!(r.resolve(&Reference::parse("null")), Resolution::NoUpstream));
        assert!(matches!(r.resolve(&Reference::parse("brd 1")), Resolution::Invalid));
        assert!(!r.is_deprecated("null"));
    }

    #[test]
    fn deprecation_and_faults() {
        let (_dir, index) = corpus();
        let r = Resolver::new(&index);
        assert!(r.is_deprecated("REQ-02"));
        assert!(!r.is_deprecated("PRD-01"));
        assert!(matches!(
            r.resolve(&Reference::parse("ADR-03")),
            Resolution::Faulted(_)
        ));
        assert!(!r.exists("ADR-03"));
    }

    #[test]
    fn element_references_resolve_at_parent_level() {
        let (_dir, index) = corpus();
        let r = Resolver::new(&index);
        assert!(r.exists("BRD.01.01.05"));
        assert!(r.exists("BRD.01.09.09"));
        assert!(!r.exists("BRD.02.01.01"));
        assert!(r.element_defined(&Reference::parse("BRD.01.01.05")));
        assert!(!r.element_defined(&Reference::parse("BRD.01.09.09")));
    }

    #[test]
    fn element_exists_spans_section_pieces() {
        let (_dir, index) = corpus();
        let r = Resolver::new(&index);
        assert!(r.element_exists(&Reference::parse("BRD-01"), "BRD.01.01.05"));
        assert!(r.element_exists(&Reference::parse("BRD-01.1"), "BRD.01.01.05"));
        assert!(!r.element_exists(&Reference::parse("BRD-01.0"), "BRD.01.01.05"));
    }

    #[test]
    fn unknown_types_are_missing() {
        let (_dir, index) = corpus();
        let r = Resolver::new(&index);
        assert!(matches!(r.resolve(&Reference::parse("XYZ-01")), Resolution::Missing));
    }
}
