//! The 16-layer dependency hierarchy.
//!
//! Layers 1–12 are document layers with a directory per type. Layer 0
//! (strategy) has no tagged documents; layers 13–15 (code, tests,
//! validation) are reached through the code scan.

use crate::types::ArtifactType;

/// Tag names forming the cumulative chain, in hierarchy order.
pub const CHAIN_TAGS: [&str; 11] = [
    "brd", "prd", "ears", "bdd", "adr", "sys", "req", "impl", "ctr", "spec", "tasks",
];

/// Tags recognized in the tag grammar that do not take part in the chain.
pub const EXTRA_TAGS: [&str; 3] = ["iplan", "threshold", "entity"];

/// Layer assigned to source code carrying traceability tags.
pub const CODE_LAYER: u8 = 13;

/// Types whose absence never constitutes a chain gap.
pub const OPTIONAL_TYPES: [ArtifactType; 2] = [ArtifactType::Impl, ArtifactType::Ctr];

pub fn is_known_tag(name: &str) -> bool {
    CHAIN_TAGS.contains(&name) || EXTRA_TAGS.contains(&name)
}

pub fn is_optional_tag(name: &str) -> bool {
    OPTIONAL_TYPES.iter().any(|t| t.tag() == name)
}

// ---------------------------------------------------------------------------
// LayerSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub artifact_type: ArtifactType,
    pub layer: u8,
    /// Upstream tags every artifact of this type must carry.
    pub required: Vec<ArtifactType>,
    /// Upstream tags that may be carried but are never demanded.
    pub optional: Vec<ArtifactType>,
    pub extensions: &'static [&'static str],
}

impl LayerSpec {
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.extensions.contains(&ext)
    }
}

// ---------------------------------------------------------------------------
// LayerTable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LayerTable {
    specs: Vec<LayerSpec>,
}

impl Default for LayerTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl LayerTable {
    /// The standard hierarchy: each document layer requires every
    /// non-optional layer above it, and may carry the optional ones.
    pub fn standard() -> Self {
        let mut specs = Vec::new();
        for (i, t) in ArtifactType::all().iter().copied().enumerate() {
            let upstream = &ArtifactType::all()[..i];
            let required = upstream
                .iter()
                .copied()
                .filter(|u| !OPTIONAL_TYPES.contains(u))
                .collect();
            let optional = upstream
                .iter()
                .copied()
                .filter(|u| OPTIONAL_TYPES.contains(u))
                .collect();
            specs.push(LayerSpec {
                artifact_type: t,
                layer: i as u8 + 1,
                required,
                optional,
                extensions: default_extensions(t),
            });
        }
        Self { specs }
    }

    pub fn specs(&self) -> &[LayerSpec] {
        &self.specs
    }

    pub fn get(&self, artifact_type: ArtifactType) -> &LayerSpec {
        // `standard()` builds one spec per variant in declaration order.
        &self.specs[artifact_type as usize]
    }

    pub fn layer(&self, artifact_type: ArtifactType) -> u8 {
        self.get(artifact_type).layer
    }

    pub fn required_upstream(&self, artifact_type: ArtifactType) -> &[ArtifactType] {
        &self.get(artifact_type).required
    }

    /// Highest document layer; its artifacts are never orphans.
    pub fn terminal_layer(&self) -> u8 {
        self.specs.iter().map(|s| s.layer).max().unwrap_or(0)
    }
}

fn default_extensions(t: ArtifactType) -> &'static [&'static str] {
    match t {
        ArtifactType::Bdd => &["feature", "md"],
        ArtifactType::Ctr => &["md", "yaml", "yml"],
        ArtifactType::Spec => &["yaml", "yml", "md"],
        _ => &["md"],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_follow_type_order() {
        let table = LayerTable::standard();
        assert_eq!(table.layer(ArtifactType::Brd), 1);
        assert_eq!(table.layer(ArtifactType::Req), 7);
        assert_eq!(table.layer(ArtifactType::Spec), 10);
        assert_eq!(table.layer(ArtifactType::Iplan), 12);
        assert_eq!(table.terminal_layer(), 12);
    }

    #[test]
    fn spec_requires_everything_but_optional_layers() {
        let table = LayerTable::standard();
        let required: Vec<&str> = table
            .required_upstream(ArtifactType::Spec)
            .iter()
            .map(|t| t.tag())
            .collect();
        assert_eq!(required, ["brd", "prd", "ears", "bdd", "adr", "sys", "req"]);
        let optional = &table.get(ArtifactType::Spec).optional;
        assert_eq!(optional, &vec![ArtifactType::Impl, ArtifactType::Ctr]);
    }

    #[test]
    fn brd_has_no_upstream() {
        let table = LayerTable::standard();
        assert!(table.required_upstream(ArtifactType::Brd).is_empty());
    }

    #[test]
    fn known_tags() {
        assert!(is_known_tag("tasks"));
        assert!(is_known_tag("threshold"));
        assert!(!is_known_tag("param"));
        assert!(is_optional_tag("ctr"));
        assert!(!is_optional_tag("req"));
    }

    #[test]
    fn extensions_per_type() {
        let table = LayerTable::standard();
        assert!(table.get(ArtifactType::Bdd).allows_extension("feature"));
        assert!(table.get(ArtifactType::Spec).allows_extension("yaml"));
        assert!(!table.get(ArtifactType::Prd).allows_extension("yaml"));
    }
}
