use crate::types::ArtifactType;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = ".sdd/config.yaml";
pub const AUDIT_FILE: &str = "tmp/validation_audit.json";
pub const BACKUP_SUFFIX: &str = "bak";

/// Environment variable overriding corpus-root autodetection.
pub const ROOT_ENV: &str = "AI_DEV_FLOW_ROOT";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn type_dir(root: &Path, artifact_type: ArtifactType) -> PathBuf {
    root.join(artifact_type.as_str())
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn default_audit_path(root: &Path) -> PathBuf {
    root.join(AUDIT_FILE)
}

/// `<path>.bak` next to the original file.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// True when `dir` holds at least one artifact type directory.
pub fn has_type_dirs(dir: &Path) -> bool {
    ArtifactType::all()
        .iter()
        .any(|t| type_dir(dir, *t).is_dir())
}

// ---------------------------------------------------------------------------
// Artifact filename grammar
// ---------------------------------------------------------------------------

/// Identifier carried by an artifact filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileId {
    pub type_code: String,
    pub number: u32,
    pub number_text: String,
    pub section: Option<u32>,
    pub extension: String,
}

static FILENAME_RE: OnceLock<Regex> = OnceLock::new();

fn filename_re() -> &'static Regex {
    FILENAME_RE.get_or_init(|| {
        Regex::new(r"^([A-Z]{2,5})-(\d{2,})(?:\.(\d+))?(?:[_-].*)?\.([A-Za-z]+)$").unwrap()
    })
}

/// Parse `TYPE-NN[.S][_slug].ext`. Returns `None` for anything else.
pub fn parse_artifact_filename(name: &str) -> Option<FileId> {
    let caps = filename_re().captures(name)?;
    let number_text = caps[2].to_string();
    let number = number_text.parse().ok()?;
    let section = match caps.get(3) {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    Some(FileId {
        type_code: caps[1].to_string(),
        number,
        number_text,
        section,
        extension: caps[4].to_ascii_lowercase(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
