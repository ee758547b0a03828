use crate::daemon::bridge::Bridge;
use crate::daemon::{DBUS_NAME, DBUS_PATH};
use anyhow::{Context, Result};
use std::sync::Arc;
use zbus::interface;

pub struct RefreshService {
    bridge: Arc<Bridge>,
}

impl RefreshService {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }
}

fn failed(e: anyhow::Error) -> zbus::fdo::Error {
    zbus::fdo::Error::Failed(format!("{:#}", e))
}

#[interface(name = "com.github.meow.Refresh")]
impl RefreshService {
    async fn initialize(
        &self,
        refresh_interval_minutes: i32,
        enable_notifications: bool,
    ) -> zbus::fdo::Result<()> {
        tracing::info!(refresh_interval_minutes, enable_notifications, "D-Bus Initialize called");
        self.bridge
            .initialize(i64::from(refresh_interval_minutes), enable_notifications)
            .map_err(failed)
    }

    async fn schedule(&self, refresh_interval_minutes: i32) -> zbus::fdo::Result<()> {
        tracing::info!(refresh_interval_minutes, "D-Bus Schedule called");
        self.bridge
            .schedule(i64::from(refresh_interval_minutes))
            .map_err(failed)
    }

    async fn schedule_with_delay(&self, delay_minutes: i32) -> zbus::fdo::Result<()> {
        tracing::info!(delay_minutes, "D-Bus ScheduleWithDelay called");
        self.bridge.schedule_with_delay(i64::from(delay_minutes));
        Ok(())
    }

    async fn cancel(&self) -> zbus::fdo::Result<()> {
        tracing::info!("D-Bus Cancel called");
        self.bridge.cancel();
        Ok(())
    }

    async fn trigger_now(&self) -> bool {
        tracing::info!("D-Bus TriggerNow called");
        self.bridge.trigger_now().await
    }

    async fn set_debug_logging(&self, enabled: bool) -> zbus::fdo::Result<()> {
        self.bridge.set_debug_logging(enabled).map_err(failed)
    }

    #[zbus(property)]
    async fn refresh_interval_minutes(&self) -> u32 {
        self.bridge.interval().minutes()
    }

    #[zbus(property)]
    async fn debug_logging_enabled(&self) -> bool {
        self.bridge.debug_logging()
    }
}

pub async fn start_dbus_server(bridge: Arc<Bridge>) -> Result<zbus::Connection> {
    let connection = zbus::connection::Builder::session()
        .context("Failed to connect to session D-Bus")?
        .name(DBUS_NAME)?
        .serve_at(DBUS_PATH, RefreshService::new(bridge))?
        .build()
        .await
        .context("Failed to register D-Bus service")?;

    tracing::info!(name = DBUS_NAME, path = DBUS_PATH, "D-Bus service registered");
    Ok(connection)
}
