use crate::core::clock::{Clock, SystemClock};
use crate::core::logging::LogControl;
use crate::core::notifications::DesktopNotifier;
use crate::core::settings::Settings;
use crate::core::store::{JsonFileStore, KeyValueStore};
use crate::daemon::bridge::Bridge;
use crate::daemon::dbus::start_dbus_server;
use crate::daemon::scheduler::TimerScheduler;
use crate::refresh::{DiskFileStore, EngineConfig, RefreshEngine, ReqwestFetcher};
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

pub fn build_engine(
    settings: &Settings,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyValueStore>,
) -> Result<RefreshEngine> {
    Ok(RefreshEngine::new(
        clock,
        store,
        Arc::new(ReqwestFetcher::new(settings.request_timeout())?),
        Arc::new(DiskFileStore::new(settings.images_dir()?)),
        EngineConfig::from_source(&settings.source),
    ))
}

pub async fn run(settings: Settings, logs: LogControl) -> Result<()> {
    let state_path = settings.state_path()?;
    tracing::info!(state = ?state_path, images = ?settings.images_dir()?, "Opening cat storage");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(state_path));
    let engine = build_engine(&settings, Arc::clone(&clock), Arc::clone(&store))?;

    let (alarm_tx, mut alarm_rx) = mpsc::unbounded_channel::<()>();
    let scheduler = Arc::new(TimerScheduler::new(
        Arc::clone(&clock),
        settings.scheduler.exact,
        alarm_tx,
    ));
    let notifier = Arc::new(DesktopNotifier::new());

    let bridge = Arc::new(Bridge::new(
        engine,
        Arc::clone(&store),
        scheduler,
        notifier,
        logs,
        &settings,
    ));

    bridge.boot();

    let _dbus_connection = start_dbus_server(Arc::clone(&bridge)).await?;

    drive_alarms(bridge, alarm_rx, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    Ok(())
}

/// Runs a refresh for every due alarm until `shutdown` resolves.
async fn drive_alarms<F>(bridge: Arc<Bridge>, mut alarms: mpsc::UnboundedReceiver<()>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(()) = alarms.recv() => {
                let bridge = Arc::clone(&bridge);
                tokio::spawn(async move {
                    bridge.handle_alarm().await;
                });
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                bridge.cancel();
                break;
            }
        }
    }
}
