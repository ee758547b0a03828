use crate::cli::call_daemon;
use crate::core::settings::Settings;
use crate::core::store::{self, JsonFileStore};
use anyhow::{Context, Result};

fn to_minutes(value: i64) -> Result<i32> {
    i32::try_from(value).context("Minutes value is out of range")
}

pub async fn initialize(interval: Option<i64>, notifications: bool) -> Result<()> {
    let minutes = match interval {
        Some(minutes) => minutes,
        None => Settings::load()?.refresh.interval_minutes,
    };

    call_daemon("Initialize", &(to_minutes(minutes)?, notifications)).await?;

    println!(
        "Initialized: every {} minute(s), notifications {}",
        minutes.max(1),
        if notifications { "on" } else { "off" }
    );
    Ok(())
}

pub async fn schedule(interval: Option<i64>) -> Result<()> {
    let minutes = match interval {
        Some(minutes) => minutes,
        None => {
            let settings = Settings::load()?;
            let store = JsonFileStore::new(settings.state_path()?);
            i64::from(store::read_interval(&store, settings.default_interval()).minutes())
        }
    };

    call_daemon("Schedule", &(to_minutes(minutes)?,)).await?;

    println!("Next refresh in {} minute(s)", minutes.max(1));
    Ok(())
}

pub async fn schedule_with_delay(delay: i64) -> Result<()> {
    call_daemon("ScheduleWithDelay", &(to_minutes(delay)?,)).await?;

    println!("Next refresh in {} minute(s)", delay.max(1));
    Ok(())
}

pub async fn cancel() -> Result<()> {
    call_daemon("Cancel", &()).await?;

    println!("Scheduled refresh cancelled");
    Ok(())
}

pub async fn set_debug(enabled: bool) -> Result<()> {
    call_daemon("SetDebugLogging", &(enabled,)).await?;

    println!("Debug logging {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}
