use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    StoreFailure,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Consistency violations detected in a persisted widget definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidState {
    #[error("widget {widget_id} has current index {index} below -1")]
    NegativeIndex { widget_id: String, index: i64 },
    #[error("widget {widget_id} keeps its active path {path} in the history stack")]
    ActivePathInStack { widget_id: String, path: String },
    #[error("widget {widget_id} carries a label with an empty history stack")]
    LabelWithoutHistory { widget_id: String },
    #[error("widget {widget_id} has negative refresh timestamp {updated}")]
    NegativeTimestamp { widget_id: String, updated: i64 },
    #[error("widget {widget_id} has unusable refresh interval {hours}")]
    RefreshInterval { widget_id: String, hours: f64 },
}
