use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const DEFAULT_EXTENSION: &str = "jpg";
const MAX_EXTENSION_LEN: usize = 5;
const FILE_PREFIX: &str = "cat_";
/// Orphans this close to the newest kept image are left for a later prune.
const IN_FLIGHT_GRACE_MS: i64 = 60_000;

pub trait FileStore: Send + Sync {
    /// Writes `bytes` to a file that did not exist before the call.
    fn write_new(&self, stem: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf>;
    fn remove(&self, path: &Path) -> Result<()>;
    /// Deletes downloaded images not listed in `keep` that are older than
    /// every image in `keep` and than the newest one less a grace period.
    /// Newer files may belong to another process's refresh that has not
    /// committed yet. Returns how many went.
    fn prune_except(&self, keep: &HashSet<PathBuf>) -> Result<usize>;
}

pub struct DiskFileStore {
    dir: PathBuf,
}

impl DiskFileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl FileStore for DiskFileStore {
    fn write_new(&self, stem: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create image directory: {}", self.dir.display()))?;

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}.{}", stem, extension)
            } else {
                format!("{}_{}.{}", stem, attempt, extension)
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let written = file.write_all(bytes).and_then(|_| file.sync_all());
                    if let Err(e) = written {
                        let _ = std::fs::remove_file(&path);
                        return Err(e)
                            .with_context(|| format!("Failed to write image: {}", path.display()));
                    }
                    tracing::debug!(?path, bytes = bytes.len(), "Wrote image");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to create image: {}", path.display()))
                }
            }
        }
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(?path, "Deleted image");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    fn prune_except(&self, keep: &HashSet<PathBuf>) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let stamps: Vec<i64> = keep.iter().filter_map(|p| stamp_of(p)).collect();
        let cutoff = match (stamps.iter().min(), stamps.iter().max()) {
            (Some(&oldest), Some(&newest)) => Some(oldest.min(newest - IN_FLIGHT_GRACE_MS)),
            _ => None,
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_image = path.is_file()
                && path
                    .file_name()
                    .map(|n| n.to_string_lossy().starts_with(FILE_PREFIX))
                    .unwrap_or(false);
            if !is_image || keep.contains(&path) {
                continue;
            }

            let older = match (stamp_of(&path), cutoff) {
                (Some(stamp), Some(cutoff)) => stamp < cutoff,
                _ => true,
            };
            if older {
                self.remove(&path)?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

pub fn file_stem(millis: i64) -> String {
    format!("{}{}", FILE_PREFIX, millis)
}

/// The millisecond stamp in `cat_<millis>[_n].<ext>`.
fn stamp_of(path: &Path) -> Option<i64> {
    let stem = path.file_stem()?.to_str()?.strip_prefix(FILE_PREFIX)?;
    stem.split('_').next()?.parse().ok()
}

/// Extension of the last URL path segment, or `jpg` when there is none or it
/// looks wrong.
pub fn extension_for(url_path: &str) -> String {
    let segment = url_path.rsplit('/').next().unwrap_or_default();
    if segment.trim().is_empty() {
        return DEFAULT_EXTENSION.to_string();
    }

    let mut parts = segment.rsplit('.');
    let ext = parts.next().unwrap_or_default();
    if parts.next().is_none() {
        return DEFAULT_EXTENSION.to_string();
    }

    let ext = ext.to_lowercase();
    if (1..=MAX_EXTENSION_LEN).contains(&ext.chars().count()) {
        ext
    } else {
        DEFAULT_EXTENSION.to_string()
    }
}
