pub mod control;
pub mod status;
pub mod trigger;

use crate::daemon::{DBUS_NAME, DBUS_PATH};
use anyhow::{Context, Result};
use serde::Serialize;
use zbus::zvariant::DynamicType;

async fn call_daemon<B>(method: &str, body: &B) -> Result<zbus::Message>
where
    B: Serialize + DynamicType,
{
    let connection = zbus::Connection::session()
        .await
        .context("Failed to connect to session D-Bus")?;

    connection
        .call_method(Some(DBUS_NAME), DBUS_PATH, Some(DBUS_NAME), method, body)
        .await
        .with_context(|| format!("Failed to call {} - is the daemon running?", method))
}
