use crate::cli::call_daemon;
use crate::core::clock::SystemClock;
use crate::core::models::Outcome;
use crate::core::notifications::{DesktopNotifier, NotificationPresenter};
use crate::core::settings::Settings;
use crate::core::store::{self, JsonFileStore};
use crate::daemon::build_engine;
use anyhow::{Context, Result};
use std::sync::Arc;

pub async fn run(local: bool) -> Result<()> {
    let refreshed = if local {
        run_local().await?
    } else {
        call_daemon("TriggerNow", &())
            .await?
            .body()
            .deserialize::<bool>()
            .context("Failed to deserialize response")?
    };

    if refreshed {
        println!("New cat fetched");
    } else {
        println!("No new cat (not due yet or refresh failed)");
    }
    Ok(())
}

/// Runs one refresh in this process; no daemon and no rescheduling.
async fn run_local() -> Result<bool> {
    let settings = Settings::load()?;
    let store = Arc::new(JsonFileStore::new(settings.state_path()?));
    let engine = build_engine(&settings, Arc::new(SystemClock), store.clone())?;

    let interval = store::read_interval(store.as_ref(), settings.default_interval());
    let outcome = engine.perform(interval).await;

    match &outcome {
        Outcome::Refreshed { payload, notice } => {
            println!("Saved {}", payload.cached_path);
            if settings.notifications.enabled {
                if let Err(e) = DesktopNotifier::new().present(notice) {
                    tracing::warn!(error = %e, "Failed to show notification");
                }
            }
        }
        Outcome::Failed(e) => eprintln!("Refresh failed: {}", e),
        Outcome::Skipped => {}
    }

    Ok(outcome.is_refreshed())
}
