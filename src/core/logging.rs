use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn level_for(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

pub fn init_logging(debug: bool) -> LogControl {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(debug)));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    LogControl::new(Some(handle), debug)
}

/// Runtime switch between `info` and `debug` output.
pub struct LogControl {
    handle: Option<FilterHandle>,
    debug: AtomicBool,
}

impl LogControl {
    pub fn new(handle: Option<FilterHandle>, debug: bool) -> Self {
        Self {
            handle,
            debug: AtomicBool::new(debug),
        }
    }

    #[cfg(test)]
    pub fn detached() -> Self {
        Self::new(None, false)
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::SeqCst)
    }

    pub fn set_debug(&self, enabled: bool) -> Result<()> {
        if let Some(handle) = &self.handle {
            handle.modify(|filter| *filter = EnvFilter::new(level_for(enabled)))?;
        }
        self.debug.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled, "Debug logging toggled");
        Ok(())
    }
}
