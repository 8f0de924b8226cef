use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvalidState;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().simple().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(WidgetId);
id_newtype!(GroupId);

/// Selection policy applied when a widget rotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetAction {
    #[serde(alias = "next")]
    Sequential,
    Random,
    Static,
    Merged,
}

impl WidgetAction {
    /// `static` and `merged` widgets are never advanced by the scheduler.
    pub fn rotates(self) -> bool {
        matches!(self, Self::Sequential | Self::Random)
    }
}

impl fmt::Display for WidgetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sequential => "sequential",
            Self::Random => "random",
            Self::Static => "static",
            Self::Merged => "merged",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    pub file: String,
}

/// Selectable content. Either an opaque token or a labelled listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathDescriptor {
    Simple(String),
    Composite { label: String, file: FileRef },
}

impl PathDescriptor {
    pub fn simple(token: impl Into<String>) -> Self {
        Self::Simple(token.into())
    }

    pub fn composite(label: impl Into<String>, file: impl Into<String>) -> Self {
        Self::Composite {
            label: label.into(),
            file: FileRef { file: file.into() },
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Simple(_) => None,
            Self::Composite { label, .. } => Some(label),
        }
    }

    /// The reference a front end actually opens.
    pub fn target(&self) -> &str {
        match self {
            Self::Simple(token) => token,
            Self::Composite { file, .. } => &file.file,
        }
    }
}

impl fmt::Display for PathDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub id: GroupId,
    pub label: String,
}

fn unset_index() -> i64 {
    -1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDefinition {
    pub id: WidgetId,
    #[serde(rename = "group")]
    pub group_id: GroupId,
    pub action: WidgetAction,
    #[serde(rename = "current", default = "unset_index")]
    pub current_index: i64,
    #[serde(default)]
    pub path: Option<PathDescriptor>,
    #[serde(default)]
    pub stack: Vec<PathDescriptor>,
    #[serde(default)]
    pub label: String,
    /// Epoch seconds of the last timed rotation. Zero forces the next check.
    #[serde(default)]
    pub updated: i64,
    #[serde(rename = "refresh", default, skip_serializing_if = "Option::is_none")]
    pub refresh_hours: Option<f64>,
}

impl WidgetDefinition {
    pub fn new(id: WidgetId, group_id: GroupId, action: WidgetAction) -> Self {
        Self {
            id,
            group_id,
            action,
            current_index: -1,
            path: None,
            stack: Vec::new(),
            label: String::new(),
            updated: 0,
            refresh_hours: None,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidState> {
        if self.current_index < -1 {
            return Err(InvalidState::NegativeIndex {
                widget_id: self.id.0.clone(),
                index: self.current_index,
            });
        }

        if self.updated < 0 {
            return Err(InvalidState::NegativeTimestamp {
                widget_id: self.id.0.clone(),
                updated: self.updated,
            });
        }

        if let Some(path) = &self.path {
            if self.stack.contains(path) {
                return Err(InvalidState::ActivePathInStack {
                    widget_id: self.id.0.clone(),
                    path: path.to_string(),
                });
            }
        }

        if !self.label.is_empty() && self.stack.is_empty() {
            return Err(InvalidState::LabelWithoutHistory {
                widget_id: self.id.0.clone(),
            });
        }

        if let Some(hours) = self.refresh_hours {
            if !hours.is_finite() || hours <= 0.0 {
                return Err(InvalidState::RefreshInterval {
                    widget_id: self.id.0.clone(),
                    hours,
                });
            }
        }

        Ok(())
    }
}
