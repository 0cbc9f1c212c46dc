use crate::error::Result;
use crate::paths;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting corpus files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Signature of [`atomic_write`], so callers can hold the writer as a value.
pub type Writer = fn(&Path, &[u8]) -> Result<()>;

/// A fresh `<path>.bak`, plus where an older backup was moved to make room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    pub rotated: Option<PathBuf>,
}

/// Copy `path` to `<path>.bak`. A backup left by an earlier run is never
/// overwritten: it moves to `<path>.bak.N`, the first free `N` from 1.
pub fn create_backup(path: &Path) -> Result<Backup> {
    let backup = paths::backup_path(path);
    let rotated = if backup.exists() {
        let older = free_rotation(&backup);
        std::fs::rename(&backup, &older)?;
        tracing::warn!(backup = %backup.display(), moved_to = %older.display(), "kept backup from an earlier run");
        Some(older)
    } else {
        None
    };
    if let Err(e) = std::fs::copy(path, &backup) {
        if let Some(older) = &rotated {
            if let Err(undo) = std::fs::rename(older, &backup) {
                tracing::warn!(backup = %older.display(), error = %undo, "could not move backup back");
            }
        }
        return Err(e.into());
    }
    Ok(Backup {
        path: backup,
        rotated,
    })
}

fn free_rotation(backup: &Path) -> PathBuf {
    let mut n = 1u32;
    loop {
        let mut name = backup.as_os_str().to_owned();
        name.push(format!(".{n}"));
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Put the backup contents back in place of `path`.
pub fn restore_backup(path: &Path, backup: &Path) -> Result<()> {
    let data = std::fs::read(backup)?;
    atomic_write(path, &data)
}

/// Undo [`create_backup`]: drop the fresh backup and move a rotated one back.
pub fn discard_backup(backup: &Backup) -> Result<()> {
    remove_backup(&backup.path)?;
    if let Some(older) = &backup.rotated {
        std::fs::rename(older, &backup.path)?;
    }
    Ok(())
}

/// Delete a backup if it exists. Returns true if a file was removed.
pub fn remove_backup(backup: &Path) -> Result<bool> {
    if !backup.exists() {
        return Ok(false);
    }
    std::fs::remove_file(backup)?;
    Ok(true)
}
