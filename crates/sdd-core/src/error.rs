use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SddError {
    #[error("corpus root not found: {0}")]
    CorpusRootNotFound(PathBuf),

    #[error("corpus root unreadable: {path}: {source}")]
    CorpusRootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown artifact type: {0}")]
    UnknownArtifactType(String),

    #[error("unknown severity '{0}': must be error, warning, or info")]
    UnknownSeverity(String),

    #[error("not an artifact of this corpus: {0}")]
    ArtifactNotInCorpus(PathBuf),

    #[error("failed to write fixes to {path}: {source}")]
    FixWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SddError>;
