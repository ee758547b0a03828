mod engine;
mod fetcher;
mod files;
mod history;

pub use engine::{EngineConfig, RefreshEngine};
#[allow(unused_imports)]
pub use fetcher::{HttpFetcher, HttpResponse, ReqwestFetcher};
#[allow(unused_imports)]
pub use files::{DiskFileStore, FileStore};
