pub mod audit;
pub mod config;
pub mod fix;
pub mod index;
pub mod resolve;
pub mod validate;

use anyhow::Context;
use clap::Args;
use sdd_core::code::CodeScan;
use sdd_core::config::Config;
use sdd_core::types::ArtifactType;
use sdd_core::validate::Scope;
use std::path::{Path, PathBuf};

/// Error findings remain after validation or fixing. Exit code 1.
#[derive(Debug, thiserror::Error)]
#[error("{errors} error finding(s) remain")]
pub struct ValidationFailed {
    pub errors: usize,
}

// ---------------------------------------------------------------------------
// Scope selection
// ---------------------------------------------------------------------------

#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// A single artifact file
    #[arg(long, value_name = "PATH", conflicts_with = "layer")]
    pub artifact: Option<PathBuf>,

    /// One layer, by type code (e.g. REQ)
    #[arg(long, value_name = "TYPE")]
    pub layer: Option<String>,
}

impl ScopeArgs {
    pub fn scope(&self, root: &Path) -> anyhow::Result<Scope> {
        if let Some(path) = &self.artifact {
            // Relative paths are tried against the working directory first.
            let path = if path.exists() || path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            };
            return Ok(Scope::Artifact(path));
        }
        if let Some(layer) = &self.layer {
            let t: ArtifactType = layer
                .parse()
                .with_context(|| format!("invalid --layer '{layer}'"))?;
            return Ok(Scope::Layer(t));
        }
        Ok(Scope::Corpus)
    }

    /// The same selection as command-line flags, for follow-up hints.
    pub fn as_flags(&self) -> String {
        match (&self.artifact, &self.layer) {
            (Some(p), _) => format!(" --artifact {}", p.display()),
            (None, Some(l)) => format!(" --layer {l}"),
            (None, None) => String::new(),
        }
    }
}

/// Tags in configured source directories, if any are configured.
pub fn load_code(root: &Path, config: &Config) -> anyhow::Result<Option<CodeScan>> {
    if config.code_dirs.is_empty() {
        return Ok(None);
    }
    let scan = CodeScan::scan(&config.code_roots(root), &config.code_extensions)
        .context("failed to scan code directories")?;
    Ok(Some(scan))
}
