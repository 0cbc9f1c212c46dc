//! Artifact index: an arena of [`Artifact`] snapshots plus keyed lookups.
//!
//! Built once per run by walking `<root>/<TYPE>/` for every type in the
//! layer table. Per-file problems become [`ParseFault`]s on the entry; only
//! a missing or unreadable root fails the build.

use crate::artifact::{Artifact, ArtifactKey, ParseFault};
use crate::error::{Result, SddError};
use crate::frontmatter::{self, Frontmatter};
use crate::layer::{LayerSpec, LayerTable};
use crate::paths;
use crate::scan;
use crate::types::{ArtifactType, Format};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ArtifactIndex {
    root: PathBuf,
    layers: LayerTable,
    artifacts: Vec<Artifact>,
    by_key: HashMap<ArtifactKey, Vec<usize>>,
    /// `(type, number)` to every piece of that document, sorted by key.
    by_document: HashMap<(ArtifactType, u32), Vec<usize>>,
    /// File path, as walked and canonicalized, to arena index.
    by_path: HashMap<PathBuf, usize>,
}

impl ArtifactIndex {
    pub fn build(root: &Path, layers: &LayerTable) -> Result<Self> {
        if !root.exists() {
            return Err(SddError::CorpusRootNotFound(root.to_path_buf()));
        }
        std::fs::read_dir(root).map_err(|source| SddError::CorpusRootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        let mut artifacts = Vec::new();
        for spec in layers.specs() {
            let dir = paths::type_dir(root, spec.artifact_type);
            if !dir.is_dir() {
                continue;
            }
            collect_type(&dir, spec, &mut artifacts);
        }
        artifacts.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.path.cmp(&b.path)));

        let index = Self::from_artifacts(root.to_path_buf(), layers.clone(), artifacts);
        tracing::info!(
            root = %root.display(),
            artifacts = index.len(),
            "artifact index built"
        );
        Ok(index)
    }

    fn from_artifacts(root: PathBuf, layers: LayerTable, artifacts: Vec<Artifact>) -> Self {
        let mut by_key: HashMap<ArtifactKey, Vec<usize>> = HashMap::new();
        let mut by_document: HashMap<(ArtifactType, u32), Vec<usize>> = HashMap::new();
        let mut by_path: HashMap<PathBuf, usize> = HashMap::new();
        for (i, a) in artifacts.iter().enumerate() {
            by_key.entry(a.key).or_default().push(i);
            by_document.entry(a.key.document()).or_default().push(i);
            by_path.entry(a.path.clone()).or_insert(i);
            by_path.entry(normalize(&a.path)).or_insert(i);
        }
        Self {
            root,
            layers,
            artifacts,
            by_key,
            by_document,
            by_path,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layers(&self) -> &LayerTable {
        &self.layers
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn get(&self, idx: usize) -> Option<&Artifact> {
        self.artifacts.get(idx)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Arena indices holding `key`. More than one entry is a collision.
    pub fn lookup(&self, key: &ArtifactKey) -> &[usize] {
        self.by_key.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Every piece of document `(type, number)`, monolithic or sectioned.
    pub fn document(&self, artifact_type: ArtifactType, number: u32) -> &[usize] {
        self.by_document
            .get(&(artifact_type, number))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn of_type(&self, artifact_type: ArtifactType) -> impl Iterator<Item = &Artifact> {
        self.artifacts
            .iter()
            .filter(move |a| a.key.artifact_type == artifact_type)
    }

    /// Keys claimed by more than one file.
    pub fn duplicates(&self) -> impl Iterator<Item = (&ArtifactKey, &[usize])> {
        self.by_key
            .iter()
            .filter(|(_, v)| v.len() > 1)
            .map(|(k, v)| (k, v.as_slice()))
    }

    /// First sound, non-deprecated artifact of a type in key order.
    pub fn first_active_of_type(&self, artifact_type: ArtifactType) -> Option<&Artifact> {
        self.of_type(artifact_type)
            .find(|a| a.is_sound() && !a.deprecated)
    }

    pub fn position_of_path(&self, path: &Path) -> Option<usize> {
        self.by_path
            .get(path)
            .or_else(|| self.by_path.get(&normalize(path)))
            .copied()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&Artifact> {
        self.position_of_path(path).and_then(|i| self.artifacts.get(i))
    }
}

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Walking and loading
// ---------------------------------------------------------------------------

fn collect_type(dir: &Path, spec: &LayerSpec, out: &mut Vec<Artifact>) {
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(id) = paths::parse_artifact_filename(name) else {
            continue;
        };
        if id.type_code != spec.artifact_type.as_str() || !spec.allows_extension(&id.extension)
        {
            continue;
        }
        let Some(format) = Format::from_extension(&id.extension) else {
            continue;
        };
        let key = ArtifactKey::new(spec.artifact_type, id.number, id.section);
        let display_id = match id.section {
            Some(s) => format!("{}-{}.{s}", id.type_code, id.number_text),
            None => format!("{}-{}", id.type_code, id.number_text),
        };
        out.push(load_artifact(entry.path(), key, display_id, spec.layer, format));
    }
}

/// Read and parse one artifact file. Failures are recorded, never returned.
pub fn load_artifact(path: &Path, key: ArtifactKey, id: String, layer: u8, format: Format) -> Artifact {
    let read = std::fs::read(path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| String::from_utf8(bytes).map_err(|_| "not valid UTF-8".to_string()));
    match read {
        Ok(content) => parse_artifact(path, key, id, layer, format, content),
        Err(detail) => {
            tracing::warn!(path = %path.display(), error = %detail, "artifact unreadable");
            let mut artifact = empty_artifact(path, key, id, layer, format);
            artifact.fault = Some(ParseFault::Unreadable(detail));
            artifact
        }
    }
}

fn empty_artifact(path: &Path, key: ArtifactKey, id: String, layer: u8, format: Format) -> Artifact {
    Artifact {
        key,
        id,
        layer,
        path: path.to_path_buf(),
        format,
        title: None,
        status: None,
        deprecated: false,
        frontmatter: None,
        element_ids: Default::default(),
        upstream: BTreeMap::new(),
        neutralized: BTreeMap::new(),
        fault: None,
        tags: Vec::new(),
        content: String::new(),
    }
}

/// Parse artifact text that is already in memory, as if read from `path`.
pub fn parse_artifact(
    path: &Path,
    key: ArtifactKey,
    id: String,
    layer: u8,
    format: Format,
    content: String,
) -> Artifact {
    let mut artifact = empty_artifact(path, key, id, layer, format);

    let body_start = match format {
        Format::Markdown => parse_markdown_meta(&content, &mut artifact),
        Format::Yaml => {
            parse_yaml_meta(&content, &mut artifact);
            0
        }
        Format::Gherkin => 0,
    };
    let body = &content[body_start..];

    if artifact.title.is_none() {
        artifact.title = scan::extract_title(body, format);
    }
    let declared_deprecated = artifact
        .status
        .as_deref()
        .map(|s| s.trim().eq_ignore_ascii_case("deprecated"))
        .unwrap_or(false);
    artifact.deprecated = declared_deprecated || frontmatter::mentions_deprecated_status(&content);
    artifact.element_ids = scan::extract_element_ids(body);
    artifact.tags = scan::scan_tags(&content);
    for tag in &artifact.tags {
        artifact
            .upstream
            .entry(tag.name.clone())
            .or_default()
            .push(tag.value.clone());
    }
    for (tag, previous) in scan::scan_neutralized(&content) {
        artifact.neutralized.entry(tag).or_default().push(previous);
    }
    artifact.content = content;

    tracing::debug!(
        key = %artifact.key,
        path = %path.display(),
        tags = artifact.tags.len(),
        elements = artifact.element_ids.len(),
        "indexed artifact"
    );
    artifact
}

/// Fill title/status from frontmatter. Returns the byte offset of the body.
fn parse_markdown_meta(content: &str, artifact: &mut Artifact) -> usize {
    let Some(block) = frontmatter::split_frontmatter(content) else {
        return 0;
    };
    match frontmatter::parse(block.yaml) {
        Ok(fm) => {
            artifact.title = fm.title.clone();
            artifact.status = fm.status.clone();
            artifact.frontmatter = Some(fm);
        }
        Err(e) => {
            tracing::warn!(path = %artifact.path.display(), error = %e, "invalid frontmatter");
            artifact.fault = Some(ParseFault::InvalidFrontmatter(e.to_string()));
        }
    }
    block.end
}

fn parse_yaml_meta(content: &str, artifact: &mut Artifact) {
    let value: serde_yaml::Value = match serde_yaml::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %artifact.path.display(), error = %e, "invalid YAML artifact");
            artifact.fault = Some(ParseFault::InvalidYaml(e.to_string()));
            return;
        }
    };
    let lookup = |key: &str| -> Option<String> {
        let direct = value.get(key).and_then(|v| v.as_str());
        let nested = value
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str());
        direct.or(nested).map(str::to_string)
    };
    artifact.title = lookup("title");
    artifact.status = lookup("status");
    artifact.frontmatter = Some(Frontmatter {
        title: artifact.title.clone(),
        status: artifact.status.clone(),
        ..Frontmatter::default()
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
