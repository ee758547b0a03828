#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("invalid metadata response: {0}")]
    InvalidResponse(String),

    #[error("image download failed: {0}")]
    DownloadFailed(String),

    #[error("storage failure: {0:#}")]
    StorageFailure(anyhow::Error),

    #[error("refresh did not finish within {0:?}")]
    DeadlineExceeded(std::time::Duration),
}

impl RefreshError {
    pub fn storage(error: impl Into<anyhow::Error>) -> Self {
        RefreshError::StorageFailure(error.into())
    }
}
