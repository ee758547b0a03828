use crate::core::logging::LogControl;
use crate::core::models::{Outcome, RefreshInterval};
use crate::core::notifications::NotificationPresenter;
use crate::core::settings::Settings;
use crate::core::store::{self, KeyValueStore};
use crate::daemon::scheduler::Scheduler;
use crate::refresh::RefreshEngine;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Alarm,
    Manual,
}

/// The method surface the UI layer talks to, independent of transport.
pub struct Bridge {
    engine: RefreshEngine,
    store: Arc<dyn KeyValueStore>,
    scheduler: Arc<dyn Scheduler>,
    notifier: Arc<dyn NotificationPresenter>,
    logs: LogControl,
    notifications_enabled: AtomicBool,
    default_interval: RefreshInterval,
    deadline: Duration,
    run_lock: Mutex<()>,
}

impl Bridge {
    pub fn new(
        engine: RefreshEngine,
        store: Arc<dyn KeyValueStore>,
        scheduler: Arc<dyn Scheduler>,
        notifier: Arc<dyn NotificationPresenter>,
        logs: LogControl,
        settings: &Settings,
    ) -> Self {
        Self {
            engine,
            store,
            scheduler,
            notifier,
            logs,
            notifications_enabled: AtomicBool::new(settings.notifications.enabled),
            default_interval: settings.default_interval(),
            deadline: settings.deadline(),
            run_lock: Mutex::new(()),
        }
    }

    pub fn interval(&self) -> RefreshInterval {
        store::read_interval(self.store.as_ref(), self.default_interval)
    }

    pub fn debug_logging(&self) -> bool {
        self.logs.is_debug()
    }

    /// Startup counts as a boot event: arrange the next run, don't refresh.
    pub fn boot(&self) {
        self.scheduler.schedule_next(self.interval());
    }

    pub fn initialize(&self, interval_minutes: i64, enable_notifications: bool) -> Result<()> {
        tracing::debug!(interval_minutes, enable_notifications, "initialize");

        let interval = store::save_interval(self.store.as_ref(), interval_minutes)?;
        self.scheduler.schedule_next(interval);

        self.notifications_enabled
            .store(enable_notifications, Ordering::SeqCst);
        if enable_notifications {
            // Refreshes keep running; only the notifications are switched off.
            if let Err(e) = self.notifier.ensure_channel() {
                self.notifications_enabled.store(false, Ordering::SeqCst);
                return Err(e.context("Notifications unavailable"));
            }
        }
        Ok(())
    }

    pub fn schedule(&self, interval_minutes: i64) -> Result<()> {
        tracing::debug!(interval_minutes, "schedule");

        let interval = store::save_interval(self.store.as_ref(), interval_minutes)?;
        self.scheduler.schedule_next(interval);
        Ok(())
    }

    pub fn schedule_with_delay(&self, delay_minutes: i64) {
        let delay = RefreshInterval::from_minutes(delay_minutes);
        tracing::debug!(%delay, "scheduleWithDelay");
        self.scheduler.schedule_next(delay);
    }

    pub fn cancel(&self) {
        tracing::debug!("cancel");
        self.scheduler.cancel();
    }

    pub fn set_debug_logging(&self, enabled: bool) -> Result<()> {
        self.logs.set_debug(enabled)
    }

    /// Runs a refresh for the caller and reports whether a new cat arrived.
    pub async fn trigger_now(&self) -> bool {
        self.run(TriggerSource::Manual).await
    }

    pub async fn handle_alarm(&self) -> bool {
        self.run(TriggerSource::Alarm).await
    }

    async fn run(&self, source: TriggerSource) -> bool {
        let _guard = self.run_lock.lock().await;
        let interval = self.interval();
        tracing::debug!(?source, %interval, "Refresh triggered");

        let outcome = match source {
            TriggerSource::Manual => self.engine.perform(interval).await,
            TriggerSource::Alarm => self.engine.perform_within(interval, self.deadline).await,
        };

        let refreshed = outcome.is_refreshed();
        if let Outcome::Refreshed { notice, .. } = &outcome {
            if self.notifications_enabled.load(Ordering::SeqCst) {
                if let Err(e) = self.notifier.present(notice) {
                    tracing::warn!(error = %e, "Failed to show notification");
                }
            }
        }

        // Failures never stop future attempts.
        self.scheduler.schedule_next(interval);

        tracing::info!(?source, outcome = outcome.label(), "Refresh finished");
        refreshed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::models::RefreshNotice;
    use crate::core::settings::SourceSettings;
    use crate::core::store::JsonFileStore;
    use crate::daemon::testing::cat_server;
    use crate::refresh::{DiskFileStore, EngineConfig, ReqwestFetcher};
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingScheduler {
        scheduled: StdMutex<Vec<u32>>,
        cancels: StdMutex<usize>,
    }

    impl RecordingScheduler {
        fn scheduled(&self) -> Vec<u32> {
            self.scheduled.lock().unwrap().clone()
        }
    }

    impl Scheduler for RecordingScheduler {
        fn schedule_next(&self, interval: RefreshInterval) {
            self.scheduled.lock().unwrap().push(interval.minutes());
        }

        fn cancel(&self) {
            *self.cancels.lock().unwrap() += 1;
        }

        fn can_schedule_exact(&self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        channels: StdMutex<usize>,
        shown: StdMutex<Vec<RefreshNotice>>,
    }

    impl NotificationPresenter for RecordingNotifier {
        fn ensure_channel(&self) -> Result<()> {
            *self.channels.lock().unwrap() += 1;
            Ok(())
        }

        fn present(&self, notice: &RefreshNotice) -> Result<()> {
            self.shown.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    struct NoServerNotifier;

    impl NotificationPresenter for NoServerNotifier {
        fn ensure_channel(&self) -> Result<()> {
            anyhow::bail!("no notification server")
        }

        fn present(&self, _notice: &RefreshNotice) -> Result<()> {
            panic!("present called without a channel")
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<JsonFileStore>,
        scheduler: Arc<RecordingScheduler>,
        notifier: Arc<RecordingNotifier>,
        bridge: Bridge,
    }

    fn fixture(origin: &str, settings: Settings) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
        let scheduler = Arc::new(RecordingScheduler::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let source = SourceSettings {
            origin: origin.to_string(),
            ..SourceSettings::default()
        };
        let engine = RefreshEngine::new(
            Arc::new(ManualClock::at("2026-10-16T09:00:00.000+00:00")),
            store.clone(),
            Arc::new(ReqwestFetcher::new(Duration::from_secs(5)).unwrap()),
            Arc::new(DiskFileStore::new(dir.path().join("cats"))),
            EngineConfig::from_source(&source),
        );
        let bridge = Bridge::new(
            engine,
            store.clone(),
            scheduler.clone(),
            notifier.clone(),
            LogControl::detached(),
            &settings,
        );

        Fixture {
            _dir: dir,
            store,
            scheduler,
            notifier,
            bridge,
        }
    }

    #[test]
    fn test_initialize_persists_and_schedules() {
        let f = fixture("http://127.0.0.1:1", Settings::default());

        f.bridge.initialize(15, true).unwrap();

        assert_eq!(f.bridge.interval().minutes(), 15);
        assert_eq!(*f.notifier.channels.lock().unwrap(), 1);
        assert_eq!(f.scheduler.scheduled(), vec![15]);
    }

    #[test]
    fn test_initialize_without_notifications_skips_channel() {
        let f = fixture("http://127.0.0.1:1", Settings::default());
        f.bridge.initialize(5, false).unwrap();
        assert_eq!(*f.notifier.channels.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_initialize_without_notification_server() {
        let server = cat_server().await;
        let f = fixture(&server.uri(), Settings::default());
        let bridge = Bridge::new(
            f.bridge.engine,
            f.store.clone(),
            f.scheduler.clone(),
            Arc::new(NoServerNotifier),
            LogControl::detached(),
            &Settings::default(),
        );

        let err = bridge.initialize(10, true).unwrap_err();

        assert!(format!("{:#}", err).contains("no notification server"));
        assert_eq!(bridge.interval().minutes(), 10);
        assert_eq!(f.scheduler.scheduled(), vec![10]);
        assert!(bridge.trigger_now().await);
    }

    #[test]
    fn test_schedule_persists_clamped_interval() {
        let f = fixture("http://127.0.0.1:1", Settings::default());

        f.bridge.schedule(0).unwrap();

        assert_eq!(f.bridge.interval().minutes(), 1);
        assert_eq!(f.scheduler.scheduled(), vec![1]);
    }

    #[test]
    fn test_schedule_with_delay_does_not_persist() {
        let f = fixture("http://127.0.0.1:1", Settings::default());
        f.bridge.schedule(10).unwrap();

        f.bridge.schedule_with_delay(-3);
        f.bridge.schedule_with_delay(42);

        assert_eq!(f.bridge.interval().minutes(), 10);
        assert_eq!(f.scheduler.scheduled(), vec![10, 1, 42]);
    }

    #[test]
    fn test_boot_and_cancel() {
        let f = fixture("http://127.0.0.1:1", Settings::default());

        f.bridge.boot();
        f.bridge.cancel();

        assert_eq!(f.scheduler.scheduled(), vec![5]);
        assert_eq!(*f.scheduler.cancels.lock().unwrap(), 1);
    }

    #[test]
    fn test_set_debug_logging() {
        let f = fixture("http://127.0.0.1:1", Settings::default());
        assert!(!f.bridge.debug_logging());
        f.bridge.set_debug_logging(true).unwrap();
        assert!(f.bridge.debug_logging());
    }

    #[tokio::test]
    async fn test_trigger_now_refreshes_notifies_and_reschedules() {
        let server = cat_server().await;
        let f = fixture(&server.uri(), Settings::default());

        assert!(f.bridge.trigger_now().await);

        let shown = f.notifier.shown.lock().unwrap().clone();
        assert_eq!(shown, vec![RefreshNotice::default()]);
        assert_eq!(f.scheduler.scheduled(), vec![5]);
        assert!(store::read_current(f.store.as_ref()).unwrap().is_some());

        // Same instant, so the second trigger finds a fresh cache.
        assert!(!f.bridge.trigger_now().await);
        assert_eq!(f.notifier.shown.lock().unwrap().len(), 1);
        assert_eq!(f.scheduler.scheduled(), vec![5, 5]);
    }

    #[tokio::test]
    async fn test_failure_is_silent_but_reschedules() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let f = fixture(&server.uri(), Settings::default());
        f.bridge.schedule(3).unwrap();

        assert!(!f.bridge.handle_alarm().await);

        assert!(f.notifier.shown.lock().unwrap().is_empty());
        assert_eq!(f.scheduler.scheduled(), vec![3, 3]);
    }

    #[tokio::test]
    async fn test_disabled_notifications_still_refresh() {
        let server = cat_server().await;
        let mut settings = Settings::default();
        settings.notifications.enabled = false;
        let f = fixture(&server.uri(), settings);

        assert!(f.bridge.handle_alarm().await);
        assert!(f.notifier.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_triggers_refresh_once() {
        let server = cat_server().await;
        let f = fixture(&server.uri(), Settings::default());

        let (a, b) = tokio::join!(f.bridge.trigger_now(), f.bridge.trigger_now());

        assert!(a ^ b);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
