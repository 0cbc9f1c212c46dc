use crate::error::Result;
use crate::paths;
use crate::types::{ArtifactType, Severity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Optional `.sdd/config.yaml` at the corpus root. Every key has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Check that element-level references name an element the parent
    /// document actually defines.
    #[serde(default)]
    pub strict_elements: bool,
    #[serde(default = "default_warning")]
    pub element_severity: Severity,
    #[serde(default = "default_warning")]
    pub duplicate_severity: Severity,
    /// Run orphan sweeps for every layer when the scope is the whole corpus.
    #[serde(default)]
    pub orphans_in_corpus_scope: bool,
    /// Audit journal location, relative to the corpus root.
    #[serde(default = "default_audit_path")]
    pub audit_path: PathBuf,
    /// Source directories scanned for traceability tags, relative to the
    /// corpus root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_dirs: Vec<PathBuf>,
    #[serde(default = "default_code_extensions")]
    pub code_extensions: Vec<String>,
}

fn default_warning() -> Severity {
    Severity::Warning
}

fn default_audit_path() -> PathBuf {
    PathBuf::from(paths::AUDIT_FILE)
}

fn default_code_extensions() -> Vec<String> {
    ["rs", "py", "ts", "js", "go", "java", "kt", "sh"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_elements: false,
            element_severity: default_warning(),
            duplicate_severity: default_warning(),
            orphans_in_corpus_scope: false,
            audit_path: default_audit_path(),
            code_dirs: Vec::new(),
            code_extensions: default_code_extensions(),
        }
    }
}

impl Config {
    /// Load the config file; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn audit_file(&self, root: &Path) -> PathBuf {
        root.join(&self.audit_path)
    }

    pub fn code_roots(&self, root: &Path) -> Vec<PathBuf> {
        self.code_dirs.iter().map(|d| root.join(d)).collect()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Code directories must exist
        for dir in &self.code_dirs {
            if !root.join(dir).is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("code_dirs entry '{}' is not a directory", dir.display()),
                });
            }
        }

        // 2. Extensions are bare, e.g. `rs` not `.rs`
        for ext in &self.code_extensions {
            if ext.starts_with('.') || ext.contains('/') || ext.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("code_extensions entry '{ext}' should be a bare extension"),
                });
            }
        }

        // 3. element_severity only matters with strict_elements
        if !self.strict_elements && self.element_severity != Severity::Warning {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "element_severity has no effect while strict_elements is false"
                    .to_string(),
            });
        }

        // 4. The journal must not land inside a type directory
        if let Some(first) = self.audit_path.components().next() {
            let first = first.as_os_str().to_string_lossy();
            if ArtifactType::all().iter().any(|t| t.as_str() == first) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "audit_path '{}' is inside an artifact directory",
                        self.audit_path.display()
                    ),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(
            cfg.audit_file(dir.path()),
            dir.path().join("tmp/validation_audit.json")
        );
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".sdd")).unwrap();
        std::fs::write(
            dir.path().join(".sdd/config.yaml"),
            "strict_elements: true\nelement_severity: error\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert!(cfg.strict_elements);
        assert_eq!(cfg.element_severity, Severity::Error);
        assert_eq!(cfg.duplicate_severity, Severity::Warning);
        assert!(cfg.code_extensions.contains(&"rs".to_string()));
    }

    #[test]
    fn shown_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let cfg = Config {
            code_dirs: vec![PathBuf::from("../src")],
            ..Config::default()
        };
        std::fs::create_dir_all(dir.path().join(".sdd")).unwrap();
        std::fs::write(
            paths::config_path(dir.path()),
            serde_yaml::to_string(&cfg).unwrap(),
        )
        .unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), cfg);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".sdd")).unwrap();
        std::fs::write(dir.path().join(".sdd/config.yaml"), "strict_elements: [\n").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn validate_flags_common_mistakes() {
        let dir = TempDir::new().unwrap();
        let cfg = Config {
            code_dirs: vec![PathBuf::from("missing")],
            code_extensions: vec![".rs".into()],
            element_severity: Severity::Error,
            audit_path: PathBuf::from("REQ/audit.json"),
            ..Config::default()
        };
        let warnings = cfg.validate(dir.path());
        assert_eq!(warnings.len(), 4);
        assert_eq!(warnings[0].level, WarnLevel::Error);
    }

    #[test]
    fn default_config_is_clean() {
        let dir = TempDir::new().unwrap();
        assert!(Config::default().validate(dir.path()).is_empty());
    }
}
