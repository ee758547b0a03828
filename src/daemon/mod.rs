mod app;
mod bridge;
mod dbus;
mod scheduler;
#[cfg(test)]
mod testing;

use crate::core::logging::LogControl;
use crate::core::settings::Settings;
use anyhow::Result;

pub use app::build_engine;

pub const DBUS_NAME: &str = "com.github.meow.Refresh";
pub const DBUS_PATH: &str = "/com/github/meow/Refresh";

pub async fn run(settings: Settings, logs: LogControl) -> Result<()> {
    tracing::info!("Starting meow-refresh daemon");

    app::run(settings, logs).await
}
