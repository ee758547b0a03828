use crate::core::models::CatPayload;
use std::collections::HashSet;
use std::path::PathBuf;

pub const MAX_HISTORY: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryUpdate {
    /// Most recent first, unique by `cached_path`, at most `cap` entries.
    pub entries: Vec<CatPayload>,
    /// Paths that were referenced before and no longer are.
    pub released: Vec<PathBuf>,
}

impl HistoryUpdate {
    pub fn retained_paths(&self) -> HashSet<PathBuf> {
        self.entries
            .iter()
            .map(|entry| PathBuf::from(&entry.cached_path))
            .collect()
    }
}

/// Puts `latest` at the front of `previous`. Older entries sharing a path
/// with a newer one are dropped, as are entries without a path and anything
/// beyond `cap`.
pub fn prepend(previous: Vec<CatPayload>, latest: CatPayload, cap: usize) -> HistoryUpdate {
    let cap = cap.max(1);
    let mut seen: HashSet<String> = HashSet::new();
    if !latest.cached_path.is_empty() {
        seen.insert(latest.cached_path.clone());
    }

    let mut entries = Vec::with_capacity(cap);
    entries.push(latest);

    for entry in &previous {
        if entries.len() >= cap {
            break;
        }
        if entry.cached_path.is_empty() || !seen.insert(entry.cached_path.clone()) {
            continue;
        }
        entries.push(entry.clone());
    }

    let mut released = Vec::new();
    let mut released_seen = HashSet::new();
    for entry in previous {
        if entry.cached_path.is_empty() || seen.contains(&entry.cached_path) {
            continue;
        }
        if released_seen.insert(entry.cached_path.clone()) {
            released.push(PathBuf::from(entry.cached_path));
        }
    }

    HistoryUpdate { entries, released }
}
