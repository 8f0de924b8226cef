use thiserror::Error;

#[derive(Debug, Error)]
pub enum RotationError {
    #[error("widget store read failed: {0:#}")]
    Store(#[source] anyhow::Error),
    #[error("refresh scheduler already started")]
    AlreadyStarted,
    #[error("refresh scheduler is no longer running")]
    Stopped,
}
