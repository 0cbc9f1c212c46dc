use sdd_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the corpus root directory.
///
/// Priority:
/// 1. `--root` flag / `AI_DEV_FLOW_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for a directory holding artifact type
///    directories, directly or under `docs/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    detect_from(&cwd).unwrap_or(cwd)
}

fn detect_from(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if paths::has_type_dirs(&dir) {
            return Some(dir);
        }
        let docs = dir.join("docs");
        if paths::has_type_dirs(&docs) {
            return Some(docs);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_type_dirs_upward() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("REQ")).unwrap();
        let subdir = dir.path().join("REQ/deep/er");
        std::fs::create_dir_all(&subdir).unwrap();
        assert_eq!(detect_from(&subdir), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn finds_docs_subdirectory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/BRD")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        assert_eq!(
            detect_from(&dir.path().join("src")),
            Some(dir.path().join("docs"))
        );
    }
}
