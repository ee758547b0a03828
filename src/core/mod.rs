pub mod clock;
pub mod error;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod settings;
pub mod store;
