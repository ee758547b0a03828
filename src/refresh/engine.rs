use crate::core::clock::Clock;
use crate::core::error::RefreshError;
use crate::core::models::{CatPayload, Outcome, RefreshInterval, RefreshNotice};
use crate::core::settings::SourceSettings;
use crate::core::store::{self, KeyValueStore, CACHE_KEY, HISTORY_KEY};
use crate::refresh::fetcher::HttpFetcher;
use crate::refresh::files::{self, FileStore};
use crate::refresh::history::{self, MAX_HISTORY};
use chrono::{DateTime, FixedOffset};
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub origin: String,
    pub metadata_url: String,
    pub max_history: usize,
}

impl EngineConfig {
    pub fn from_source(source: &SourceSettings) -> Self {
        Self {
            origin: source.origin.trim_end_matches('/').to_string(),
            metadata_url: source.metadata_url(),
            max_history: MAX_HISTORY,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatMetadata {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    legacy_id: Option<String>,
}

impl CatMetadata {
    fn identifier(&self) -> String {
        self.id
            .clone()
            .or_else(|| self.legacy_id.clone())
            .unwrap_or_default()
    }
}

struct Download {
    id: String,
    url: Url,
    bytes: Vec<u8>,
}

pub struct RefreshEngine {
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyValueStore>,
    http: Arc<dyn HttpFetcher>,
    files: Arc<dyn FileStore>,
    config: EngineConfig,
}

impl RefreshEngine {
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn KeyValueStore>,
        http: Arc<dyn HttpFetcher>,
        files: Arc<dyn FileStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            clock,
            store,
            http,
            files,
            config,
        }
    }

    pub async fn perform(&self, interval: RefreshInterval) -> Outcome {
        let now = self.clock.now();
        match self.is_due(now, interval) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(%interval, "Cached cat is fresh, skipping refresh");
                return Outcome::Skipped;
            }
            Err(e) => return Self::failed(e),
        }

        let download = match self.fetch().await {
            Ok(download) => download,
            Err(e) => return Self::failed(e),
        };

        match self.commit(download) {
            Ok(payload) => {
                tracing::info!(id = %payload.id, path = %payload.cached_path, "Refreshed cat");
                Outcome::Refreshed {
                    payload,
                    notice: RefreshNotice::default(),
                }
            }
            Err(e) => Self::failed(e),
        }
    }

    /// Like `perform`, but gives up when the network phase outlives
    /// `deadline`. The commit has no await points, so a timeout never
    /// interrupts it halfway.
    pub async fn perform_within(&self, interval: RefreshInterval, deadline: Duration) -> Outcome {
        match tokio::time::timeout(deadline, self.perform(interval)).await {
            Ok(outcome) => outcome,
            Err(_) => Self::failed(RefreshError::DeadlineExceeded(deadline)),
        }
    }

    fn failed(error: RefreshError) -> Outcome {
        tracing::warn!(error = %error, "Cat refresh failed");
        Outcome::Failed(error)
    }

    /// A missing or unreadable `createdAt` counts as stale. A state file that
    /// cannot be read at all is a storage failure.
    pub fn is_due(
        &self,
        now: DateTime<FixedOffset>,
        interval: RefreshInterval,
    ) -> Result<bool, RefreshError> {
        let cached = store::read_current(self.store.as_ref()).map_err(RefreshError::storage)?;

        Ok(match cached.and_then(|c| c.created_at_instant()) {
            Some(created_at) => is_due_since(created_at, now, interval),
            None => true,
        })
    }

    async fn fetch(&self) -> Result<Download, RefreshError> {
        let response = self
            .http
            .get(&self.config.metadata_url, Some("application/json"))
            .await
            .map_err(|e| RefreshError::InvalidResponse(format!("{:#}", e)))?;

        if !response.is_ok() {
            return Err(RefreshError::InvalidResponse(format!(
                "metadata endpoint returned status {}",
                response.status
            )));
        }

        let metadata: CatMetadata = serde_json::from_slice(&response.body)
            .map_err(|e| RefreshError::InvalidResponse(format!("malformed metadata: {}", e)))?;

        let url = resolve_url(&self.config.origin, metadata.url.as_deref())?;
        tracing::debug!(%url, "Resolved cat image URL");

        let image = self
            .http
            .get(url.as_str(), None)
            .await
            .map_err(|e| RefreshError::DownloadFailed(format!("{:#}", e)))?;

        if !image.is_ok() {
            return Err(RefreshError::DownloadFailed(format!(
                "image endpoint returned status {}",
                image.status
            )));
        }

        Ok(Download {
            id: metadata.identifier(),
            url,
            bytes: image.body,
        })
    }

    /// Writes the image, then swaps both keys in one store write. Files of
    /// entries that fell out of history are deleted only after that write.
    fn commit(&self, download: Download) -> Result<CatPayload, RefreshError> {
        let previous = store::read_history(self.store.as_ref()).map_err(RefreshError::storage)?;

        let created_at = self.clock.now();
        let extension = files::extension_for(download.url.path());
        let path = self
            .files
            .write_new(
                &files::file_stem(created_at.timestamp_millis()),
                &extension,
                &download.bytes,
            )
            .map_err(RefreshError::storage)?;

        let payload = CatPayload::new(download.id, download.url.to_string(), created_at, &path);
        let update = history::prepend(previous, payload.clone(), self.config.max_history);

        if let Err(e) = self.persist(&payload, &update.entries) {
            if let Err(cleanup) = self.files.remove(&path) {
                tracing::warn!(error = %cleanup, ?path, "Failed to remove uncommitted image");
            }
            return Err(RefreshError::storage(e));
        }

        for released in &update.released {
            if let Err(e) = self.files.remove(released) {
                tracing::warn!(error = %e, path = ?released, "Failed to delete evicted image");
            }
        }

        match self.files.prune_except(&update.retained_paths()) {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "Deleted orphaned images"),
            Err(e) => tracing::warn!(error = %e, "Failed to prune orphaned images"),
        }

        tracing::debug!(
            history = update.entries.len(),
            evicted = update.released.len(),
            "Updated cat history"
        );

        Ok(payload)
    }

    fn persist(&self, payload: &CatPayload, history: &[CatPayload]) -> anyhow::Result<()> {
        let cache = serde_json::to_value(payload)?;
        let history = serde_json::to_value(history)?;
        self.store
            .set_many(vec![(CACHE_KEY, cache), (HISTORY_KEY, history)])
    }
}

pub fn is_due_since(
    created_at: DateTime<FixedOffset>,
    now: DateTime<FixedOffset>,
    interval: RefreshInterval,
) -> bool {
    now.signed_duration_since(created_at) >= interval.as_chrono()
}

pub fn resolve_url(origin: &str, raw: Option<&str>) -> Result<Url, RefreshError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RefreshError::InvalidResponse("metadata has no url".to_string()))?;

    let absolute = if raw.starts_with("http") {
        raw.to_string()
    } else if raw.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), raw)
    } else {
        format!("{}/{}", origin.trim_end_matches('/'), raw)
    };

    Url::parse(&absolute)
        .map_err(|e| RefreshError::InvalidResponse(format!("unusable url {:?}: {}", absolute, e)))
}
