//! Host-side implementations of the rotation collaborators: a TOML settings
//! file, an in-memory display property board and a playback flag.

use std::{
    collections::BTreeMap,
    fs, io,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex, PoisonError, RwLock,
    },
    time::Duration,
};

use anyhow::Context;
use rotation::{PlaybackObserver, SettingsSource, UiCommand, UiSignals};
use shared::protocol::{NotificationRecord, PropertySnapshot};
use toml::{Table, Value};
use tracing::{debug, info};

/// Settings read from a TOML file. Keys may be written flat
/// (`"service.refresh_enabled" = 0`) or as tables (`[service]`).
pub struct FileSettings {
    path: PathBuf,
    values: RwLock<Table>,
}

impl FileSettings {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let settings = Self {
            path: path.into(),
            values: RwLock::new(Table::new()),
        };
        settings.reload()?;
        Ok(settings)
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = values.get(key) {
            return Some(value.clone());
        }

        let mut segments = key.split('.');
        let mut current = values.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current.clone())
    }
}

impl SettingsSource for FileSettings {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.lookup(key)?.as_bool()
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.lookup(key)?.as_integer()
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        match self.lookup(key)? {
            Value::Float(value) => Some(value),
            Value::Integer(value) => Some(value as f64),
            _ => None,
        }
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.lookup(key)? {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    fn reload(&self) -> anyhow::Result<()> {
        let table = match fs::read_to_string(&self.path) {
            Ok(raw) => raw
                .parse::<Table>()
                .with_context(|| format!("invalid settings file '{}'", self.path.display()))?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "settings file missing, using defaults");
                Table::new()
            }
            Err(error) => {
                return Err(error).with_context(|| {
                    format!("failed to read settings file '{}'", self.path.display())
                })
            }
        };

        *self.values.write().unwrap_or_else(PoisonError::into_inner) = table;
        Ok(())
    }
}

/// Display properties, notifications and container refreshes, kept in
/// memory for the HTTP front end to read back.
#[derive(Default)]
pub struct PropertyBoard {
    properties: Mutex<BTreeMap<String, String>>,
    last_notification: Mutex<Option<NotificationRecord>>,
    container_refreshes: AtomicU64,
}

impl PropertyBoard {
    pub fn snapshot(&self) -> PropertySnapshot {
        PropertySnapshot {
            properties: self
                .properties
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            last_notification: self
                .last_notification
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            container_refreshes: self.container_refreshes.load(Ordering::Relaxed),
        }
    }
}

impl UiSignals for PropertyBoard {
    fn set_display_property(&self, key: &str, value: &str) {
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn clear_display_property(&self, key: &str) {
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn refresh_container(&self) {
        self.container_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    fn show_notification(&self, title: &str, message: &str, sound: bool) {
        info!(title, message, sound, "notification");
        *self
            .last_notification
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(NotificationRecord {
            title: title.to_string(),
            message: message.to_string(),
            sound,
        });
    }

    fn dispatch_ui_command(&self, command: UiCommand, settle: Duration) {
        debug!(command = command.as_str(), ?settle, "ui command");
    }
}

#[derive(Default)]
pub struct PlaybackFlag {
    playing_video: AtomicBool,
}

impl PlaybackFlag {
    pub fn set(&self, playing_video: bool) {
        self.playing_video.store(playing_video, Ordering::Relaxed);
    }
}

impl PlaybackObserver for PlaybackFlag {
    fn is_playing_video(&self) -> bool {
        self.playing_video.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod tests;
