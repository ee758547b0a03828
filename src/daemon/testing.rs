use crate::core::clock::ManualClock;
use crate::core::logging::LogControl;
use crate::core::models::RefreshNotice;
use crate::core::notifications::NotificationPresenter;
use crate::core::settings::{Settings, SourceSettings};
use crate::core::store::JsonFileStore;
use crate::daemon::bridge::Bridge;
use crate::daemon::scheduler::TimerScheduler;
use crate::refresh::{DiskFileStore, EngineConfig, RefreshEngine, ReqwestFetcher};
use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct SilentNotifier;

impl NotificationPresenter for SilentNotifier {
    fn ensure_channel(&self) -> Result<()> {
        Ok(())
    }

    fn present(&self, _notice: &RefreshNotice) -> Result<()> {
        Ok(())
    }
}

/// A bridge wired to a real timer scheduler, as the daemon builds it.
pub struct LiveBridge {
    pub _dir: TempDir,
    pub store: Arc<JsonFileStore>,
    pub bridge: Arc<Bridge>,
    pub alarms: mpsc::UnboundedReceiver<()>,
}

pub fn live_bridge(origin: &str) -> LiveBridge {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
    let clock = Arc::new(ManualClock::at("2026-10-16T09:00:00.000+00:00"));
    let source = SourceSettings {
        origin: origin.to_string(),
        ..SourceSettings::default()
    };
    let engine = RefreshEngine::new(
        clock.clone(),
        store.clone(),
        Arc::new(ReqwestFetcher::new(Duration::from_secs(5)).unwrap()),
        Arc::new(DiskFileStore::new(dir.path().join("cats"))),
        EngineConfig::from_source(&source),
    );

    let (tx, alarms) = mpsc::unbounded_channel();
    let bridge = Bridge::new(
        engine,
        store.clone(),
        Arc::new(TimerScheduler::new(clock, true, tx)),
        Arc::new(SilentNotifier),
        LogControl::detached(),
        &Settings::default(),
    );

    LiveBridge {
        _dir: dir,
        store,
        bridge: Arc::new(bridge),
        alarms,
    }
}

/// Serves `/cat` metadata pointing at `/cat/7.jpg`, and that image.
pub async fn cat_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"url": "/cat/7.jpg", "id": "7"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cat/7.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .mount(&server)
        .await;
    server
}
