use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::WidgetId;

/// Result of a single widget operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Unchanged,
    UnknownWidget,
}

/// Why a scheduling pass ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    Completed,
    Disabled,
    PlaybackActive,
    NoWidgets,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub status: PassStatus,
    pub rotated: Vec<WidgetId>,
    pub notified: bool,
}

impl PassReport {
    pub fn skipped(status: PassStatus) -> Self {
        Self {
            status,
            rotated: Vec::new(),
            notified: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeResponse {
    pub widget_id: WidgetId,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlaybackUpdate {
    pub playing_video: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub title: String,
    pub message: String,
    pub sound: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notification: Option<NotificationRecord>,
    pub container_refreshes: u64,
}
