use crate::core::models::RefreshNotice;
use anyhow::{anyhow, Context, Result};
use notify_rust::Notification;
use std::sync::atomic::{AtomicBool, Ordering};

const APP_NAME: &str = "meow-refresh";

pub trait NotificationPresenter: Send + Sync {
    fn ensure_channel(&self) -> Result<()>;
    fn present(&self, notice: &RefreshNotice) -> Result<()>;
}

/// Reports the running notification server, or why there is none.
type ServerCheck = fn() -> Result<String>;

pub struct DesktopNotifier {
    check_server: ServerCheck,
    channel_ready: AtomicBool,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::with_server_check(notification_server)
    }

    fn with_server_check(check_server: ServerCheck) -> Self {
        Self {
            check_server,
            channel_ready: AtomicBool::new(false),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationPresenter for DesktopNotifier {
    /// Fails when no notification server is listening. A failed check is
    /// retried on the next call.
    fn ensure_channel(&self) -> Result<()> {
        if self.channel_ready.load(Ordering::SeqCst) {
            return Ok(());
        }

        let server = (self.check_server)()?;
        self.channel_ready.store(true, Ordering::SeqCst);
        tracing::info!(app = APP_NAME, %server, "Notification channel ready");
        Ok(())
    }

    fn present(&self, notice: &RefreshNotice) -> Result<()> {
        self.ensure_channel()?;

        let mut notification = Notification::new();
        notification
            .summary(&notice.title)
            .body(&notice.body)
            .appname(APP_NAME)
            .timeout(notify_rust::Timeout::Milliseconds(5000));
        off_runtime(move || notification.show().map(|_| ()))?;

        tracing::info!(title = %notice.title, "Sent new cat notification");

        Ok(())
    }
}

/// notify-rust drives its own blocking D-Bus connection, which must not run
/// on a tokio worker.
fn off_runtime<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T, notify_rust::error::Error> + Send + 'static,
    T: Send + 'static,
{
    std::thread::spawn(call)
        .join()
        .map_err(|_| anyhow!("Notification thread panicked"))?
        .map_err(Into::into)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn notification_server() -> Result<String> {
    let info = off_runtime(notify_rust::get_server_information)
        .context("No desktop notification server on the session bus")?;
    Ok(format!("{} {}", info.name, info.version))
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn notification_server() -> Result<String> {
    Ok("system".to_string())
}
