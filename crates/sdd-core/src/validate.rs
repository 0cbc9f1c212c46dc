//! Cross-document validator.
//!
//! Each check is a plain function `(validator, artifact) -> findings`; the
//! per-artifact pipeline is their concatenation in [`ARTIFACT_CHECKS`] order.
//! Orphan detection is a separate whole-layer sweep.

use crate::artifact::{Artifact, ParseFault};
use crate::code::CodeScan;
use crate::config::Config;
use crate::error::{Result, SddError};
use crate::finding::{Finding, FixAction};
use crate::index::ArtifactIndex;
use crate::layer::{self, CHAIN_TAGS};
use crate::reference::{self, Reference};
use crate::resolver::{Resolution, Resolver};
use crate::scan;
use crate::types::{ArtifactType, FindingCode, Severity};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Scope / options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Artifact(PathBuf),
    Layer(ArtifactType),
    Corpus,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Artifact(p) => write!(f, "artifact {}", p.display()),
            Scope::Layer(t) => write!(f, "layer {t}"),
            Scope::Corpus => f.write_str("corpus"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    pub strict_elements: bool,
    pub element_severity: Severity,
    pub duplicate_severity: Severity,
    /// Sweep every layer for orphans when the scope is the whole corpus.
    pub corpus_orphans: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ValidationOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            strict_elements: config.strict_elements,
            element_severity: config.element_severity,
            duplicate_severity: config.duplicate_severity,
            corpus_orphans: config.orphans_in_corpus_scope,
        }
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

pub type Check = fn(&Validator<'_>, &Artifact) -> Vec<Finding>;

/// Per-artifact checks in execution order.
pub const ARTIFACT_CHECKS: [(&str, Check); 6] = [
    ("traceability_section", check_traceability_section),
    ("cumulative_tags", check_cumulative_tags),
    ("chain_gaps", check_chain_gaps),
    ("tag_references", check_tag_references),
    ("internal_links", check_internal_links),
    ("duplicate_keys", check_duplicate_keys),
];

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

pub struct Validator<'a> {
    index: &'a ArtifactIndex,
    resolver: Resolver<'a>,
    options: ValidationOptions,
    code: Option<&'a CodeScan>,
}

impl<'a> Validator<'a> {
    pub fn new(index: &'a ArtifactIndex, options: ValidationOptions) -> Self {
        Self {
            index,
            resolver: Resolver::new(index),
            options,
            code: None,
        }
    }

    /// Include tags found in source code: checked in corpus scope and
    /// counted as downstream consumers by the orphan sweep.
    pub fn with_code(mut self, code: &'a CodeScan) -> Self {
        self.code = Some(code);
        self
    }

    pub fn index(&self) -> &'a ArtifactIndex {
        self.index
    }

    pub fn resolver(&self) -> &Resolver<'a> {
        &self.resolver
    }

    pub fn validate(&self, scope: &Scope) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        match scope {
            Scope::Artifact(path) => {
                let artifact = self
                    .index
                    .find_by_path(path)
                    .ok_or_else(|| SddError::ArtifactNotInCorpus(path.clone()))?;
                findings.extend(self.check_artifact(artifact));
            }
            Scope::Layer(t) => {
                for artifact in self.index.of_type(*t) {
                    findings.extend(self.check_artifact(artifact));
                }
                findings.extend(self.sweep_orphans(*t));
            }
            Scope::Corpus => {
                for artifact in self.index.artifacts() {
                    findings.extend(self.check_artifact(artifact));
                }
                findings.extend(self.check_code());
                if self.options.corpus_orphans {
                    for t in ArtifactType::all() {
                        findings.extend(self.sweep_orphans(*t));
                    }
                }
            }
        }
        tracing::info!(scope = %scope, findings = findings.len(), "validation finished");
        Ok(findings)
    }

    /// Run every per-artifact check. Unreadable artifacts stop after the
    /// fault is reported.
    pub fn check_artifact(&self, artifact: &Artifact) -> Vec<Finding> {
        let mut findings = Vec::new();
        if let Some(fault) = &artifact.fault {
            findings.push(Finding::error(
                FindingCode::MissingUpstream,
                &artifact.path,
                format!("{} could not be parsed: {fault}", artifact.id),
            ));
            if let ParseFault::Unreadable(_) = fault {
                return findings;
            }
        }
        for (name, check) in ARTIFACT_CHECKS {
            let found = check(self, artifact);
            if !found.is_empty() {
                tracing::debug!(check = name, artifact = %artifact.key, count = found.len(), "check reported");
            }
            findings.extend(found);
        }
        findings
    }

    // -----------------------------------------------------------------------
    // Orphans
    // -----------------------------------------------------------------------

    /// Artifacts of `artifact_type` that no later layer references. The
    /// terminal layer never has orphans.
    pub fn sweep_orphans(&self, artifact_type: ArtifactType) -> Vec<Finding> {
        let layers = self.index.layers();
        let layer = layers.layer(artifact_type);
        if layer >= layers.terminal_layer() {
            return Vec::new();
        }

        let mut consumed: HashSet<(ArtifactType, u32)> = HashSet::new();
        for a in self.index.artifacts().iter().filter(|a| a.layer > layer) {
            consumed.extend(a.tags.iter().filter_map(|t| t.reference().document()));
            consumed.extend(
                a.neutralized
                    .values()
                    .flatten()
                    .filter_map(|id| Reference::parse(id).document()),
            );
        }
        if let Some(code) = self.code {
            consumed.extend(code.referenced_documents());
        }

        self.index
            .of_type(artifact_type)
            .filter(|a| !consumed.contains(&a.key.document()))
            .map(|a| {
                Finding::warning(
                    FindingCode::Orphan,
                    &a.path,
                    format!(
                        "{} is not referenced by any artifact above layer {layer}",
                        a.id
                    ),
                )
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Code tags
    // -----------------------------------------------------------------------

    /// Resolve tags embedded in source code. Reported without fix actions.
    pub fn check_code(&self) -> Vec<Finding> {
        let Some(code) = self.code else {
            return Vec::new();
        };
        let mut findings = Vec::new();
        for file in &code.files {
            for tag in &file.tags {
                let subject = format!("@{}: {}", tag.name, tag.value);
                let finding = match self.resolver.resolve(&tag.reference()) {
                    Resolution::NoUpstream => None,
                    Resolution::Invalid => Some(Finding::error(
                        FindingCode::InvalidFormat,
                        &file.path,
                        format!("{subject} is not a valid document or element ID"),
                    )),
                    Resolution::Missing | Resolution::Faulted(_) => Some(Finding::error(
                        FindingCode::MissingUpstream,
                        &file.path,
                        format!("{subject} does not resolve to any artifact"),
                    )),
                    Resolution::Found(a) if a.deprecated => Some(Finding::warning(
                        FindingCode::DeprecatedReference,
                        &file.path,
                        format!("{subject} references deprecated {}", a.id),
                    )),
                    Resolution::Found(_) => None,
                };
                findings.extend(finding.map(|f| f.at_line(tag.line)));
            }
        }
        findings
    }

    fn resolve_link(&self, source: &Path, target: &str) -> PathBuf {
        let target = target.replace("%20", " ");
        match target.strip_prefix('/') {
            Some(abs) => self.index.root().join(abs),
            None => source
                .parent()
                .map(|p| p.join(&target))
                .unwrap_or_else(|| PathBuf::from(&target)),
        }
    }
}

// ---------------------------------------------------------------------------
// Check functions
// ---------------------------------------------------------------------------

/// Document-level ID used when injecting a reference to `artifact`.
fn document_id(artifact: &Artifact) -> String {
    match artifact.key.section {
        Some(_) => artifact
            .id
            .rsplit_once('.')
            .map(|(doc, _)| doc.to_string())
            .unwrap_or_else(|| artifact.id.clone()),
        None => artifact.id.clone(),
    }
}

fn check_traceability_section(v: &Validator<'_>, a: &Artifact) -> Vec<Finding> {
    if scan::has_traceability_section(&a.content, a.format) {
        return Vec::new();
    }
    let tags = v
        .index
        .layers()
        .required_upstream(a.key.artifact_type)
        .iter()
        .filter(|t| a.values_of(t.tag()).is_empty())
        .map(|t| t.tag().to_string())
        .collect();
    vec![Finding::error(
        FindingCode::MissingTraceability,
        &a.path,
        format!("{} has no traceability section", a.id),
    )
    .with_fix(FixAction::AddTraceabilitySection {
        primary_id: a.id.clone(),
        tags,
    })]
}

fn check_cumulative_tags(v: &Validator<'_>, a: &Artifact) -> Vec<Finding> {
    let layers = v.index.layers();
    let line = scan::traceability_marker(&a.content, a.format)
        .map(|span| scan::line_of(&scan::line_starts(&a.content), span.start));
    layers
        .required_upstream(a.key.artifact_type)
        .iter()
        .filter(|t| a.values_of(t.tag()).is_empty())
        .map(|t| {
            let value = v
                .index
                .first_active_of_type(*t)
                .map(document_id)
                .unwrap_or_else(|| "null".to_string());
            let mut f = Finding::error(
                FindingCode::MissingTag,
                &a.path,
                format!(
                    "missing cumulative tag @{} (required at layer {})",
                    t.tag(),
                    a.layer
                ),
            )
            .with_fix(FixAction::InsertTag {
                tag: t.tag().to_string(),
                value,
            });
            f.line = line;
            f
        })
        .collect()
}

/// Only chain positions strictly above the artifact's own layer take part.
/// A neutralized deprecated reference still records its position.
fn check_chain_gaps(v: &Validator<'_>, a: &Artifact) -> Vec<Finding> {
    let layers = v.index.layers();
    let chain: Vec<&str> = CHAIN_TAGS
        .iter()
        .copied()
        .filter(|tag| {
            ArtifactType::from_tag(tag)
                .map(|t| layers.layer(t) < a.layer)
                .unwrap_or(false)
        })
        .collect();
    let Some(latest) = chain.iter().rposition(|tag| a.has_recorded(tag)) else {
        return Vec::new();
    };
    chain[..latest]
        .iter()
        .filter(|tag| !layer::is_optional_tag(tag) && !a.has_recorded(tag))
        .map(|tag| {
            Finding::error(
                FindingCode::ChainGap,
                &a.path,
                format!(
                    "chain gap: @{tag} has no value although @{} is present",
                    chain[latest]
                ),
            )
        })
        .collect()
}

fn check_tag_references(v: &Validator<'_>, a: &Artifact) -> Vec<Finding> {
    let mut findings = Vec::new();
    for tag in &a.tags {
        let subject = format!("@{}: {}", tag.name, tag.value);
        let reference = tag.reference();
        match v.resolver.resolve(&reference) {
            Resolution::NoUpstream => {}
            Resolution::Invalid => {
                let mut f = Finding::error(
                    FindingCode::InvalidFormat,
                    &a.path,
                    format!("{subject} is not a valid document or element ID"),
                )
                .at_line(tag.line);
                if let Some(replacement) = reference::repair_value(&tag.value) {
                    let repaired = v.resolver.resolve(&Reference::parse(&replacement));
                    if matches!(repaired, Resolution::Found(t) if !t.deprecated) {
                        f = f.with_fix(FixAction::RepairFormat {
                            tag: tag.name.clone(),
                            value: tag.value.clone(),
                            replacement,
                        });
                    }
                }
                findings.push(f);
            }
            Resolution::Missing => findings.push(
                Finding::error(
                    FindingCode::MissingUpstream,
                    &a.path,
                    format!("{subject} does not resolve to any artifact"),
                )
                .at_line(tag.line)
                .with_fix(FixAction::RemoveTag {
                    tag: tag.name.clone(),
                    value: tag.value.clone(),
                }),
            ),
            Resolution::Faulted(target) => findings.push(
                Finding::error(
                    FindingCode::MissingUpstream,
                    &a.path,
                    format!(
                        "{subject} points to {} which could not be parsed",
                        target.id
                    ),
                )
                .at_line(tag.line),
            ),
            Resolution::Found(target) => {
                if target.deprecated {
                    findings.push(
                        Finding::warning(
                            FindingCode::DeprecatedReference,
                            &a.path,
                            format!("{subject} references deprecated {}", target.id),
                        )
                        .at_line(tag.line)
                        .with_fix(FixAction::NeutralizeDeprecated {
                            tag: tag.name.clone(),
                            value: tag.value.clone(),
                        }),
                    );
                }
                if let Some(f) = ordering_finding(a, &tag.name, &subject, target) {
                    findings.push(f.at_line(tag.line));
                }
                if v.options.strict_elements && !v.resolver.element_defined(&reference) {
                    findings.push(
                        Finding::new(
                            FindingCode::UnknownElement,
                            v.options.element_severity,
                            &a.path,
                            format!("{subject}: {} defines no such element", target.id),
                        )
                        .at_line(tag.line),
                    );
                }
            }
        }
    }
    findings
}

/// A chain tag must name its own type, and upstream must mean upstream.
fn ordering_finding(a: &Artifact, tag: &str, subject: &str, target: &Artifact) -> Option<Finding> {
    let tag_type = ArtifactType::from_tag(tag)?;
    let message = if tag_type != target.key.artifact_type {
        format!(
            "{subject} names a {} artifact under a {} tag",
            target.key.artifact_type, tag_type
        )
    } else if target.layer >= a.layer {
        format!(
            "{subject} points to layer {} which is not upstream of layer {}",
            target.layer, a.layer
        )
    } else {
        return None;
    };
    Some(Finding::warning(FindingCode::TagMismatch, &a.path, message))
}

fn check_internal_links(v: &Validator<'_>, a: &Artifact) -> Vec<Finding> {
    scan::scan_links(&a.content)
        .into_iter()
        .filter(|link| link.is_internal() && !link.path_part().is_empty())
        .filter(|link| !v.resolve_link(&a.path, link.path_part()).exists())
        .map(|link| {
            Finding::error(
                FindingCode::BrokenLink,
                &a.path,
                format!("broken link {}", link.raw),
            )
            .at_line(link.line)
            .with_fix(FixAction::CommentOutLink { raw: link.raw })
        })
        .collect()
}

fn check_duplicate_keys(v: &Validator<'_>, a: &Artifact) -> Vec<Finding> {
    let holders = v.index.lookup(&a.key);
    if holders.len() < 2 {
        return Vec::new();
    }
    let others: Vec<String> = holders
        .iter()
        .filter_map(|i| v.index.get(*i))
        .filter(|o| o.path != a.path)
        .map(|o| o.path.display().to_string())
        .collect();
    vec![Finding::new(
        FindingCode::DuplicateArtifact,
        v.options.duplicate_severity,
        &a.path,
        format!("duplicate artifact {}: also defined in {}", a.key, others.join(", ")),
    )]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
