use tracing::warn;

pub const REFRESH_ENABLED_KEY: &str = "service.refresh_enabled";
pub const REFRESH_DURATION_KEY: &str = "service.refresh_duration";
pub const REFRESH_NOTIFICATION_KEY: &str = "service.refresh_notification";
pub const REFRESH_SOUND_KEY: &str = "service.refresh_sound";

/// Settings copied verbatim into display properties of the same name.
pub const MIRRORED_PROPERTIES: &[&str] = &["context.widgets"];

const DEFAULT_REFRESH_HOURS: f64 = 1.0;

/// Typed access to user settings by key.
pub trait SettingsSource: Send + Sync {
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_int(&self, key: &str) -> Option<i64>;
    fn get_float(&self, key: &str) -> Option<f64>;
    fn get_string(&self, key: &str) -> Option<String>;

    /// Re-read the backing source. Called on every settings change.
    fn reload(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    On,
    SkipDuringPlayback,
    Off,
}

impl RefreshMode {
    fn from_setting(value: i64) -> Self {
        match value {
            0 => Self::On,
            1 => Self::SkipDuringPlayback,
            2 => Self::Off,
            other => {
                warn!(value = other, "unrecognised refresh mode; treating as off");
                Self::Off
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMode {
    Always,
    WhenIdle,
    Never,
}

impl NotificationMode {
    fn from_setting(value: i64) -> Self {
        match value {
            0 => Self::Always,
            1 => Self::WhenIdle,
            2 => Self::Never,
            other => {
                warn!(value = other, "unrecognised notification mode; treating as never");
                Self::Never
            }
        }
    }

    pub fn allows(self, playing_video: bool) -> bool {
        match self {
            Self::Always => true,
            Self::WhenIdle => !playing_video,
            Self::Never => false,
        }
    }
}

/// Snapshot of the gating and timing settings, taken once per settings
/// change and read once at the start of each pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshSettings {
    pub refresh_mode: RefreshMode,
    pub default_refresh_hours: f64,
    pub notification_mode: NotificationMode,
    pub notification_sound: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            refresh_mode: RefreshMode::On,
            default_refresh_hours: DEFAULT_REFRESH_HOURS,
            notification_mode: NotificationMode::Never,
            notification_sound: false,
        }
    }
}

impl RefreshSettings {
    pub fn load(source: &dyn SettingsSource) -> Self {
        let defaults = Self::default();

        let refresh_mode = source
            .get_int(REFRESH_ENABLED_KEY)
            .map(RefreshMode::from_setting)
            .unwrap_or(defaults.refresh_mode);

        let default_refresh_hours = match source.get_float(REFRESH_DURATION_KEY) {
            Some(hours) if hours.is_finite() && hours > 0.0 => hours,
            Some(hours) => {
                warn!(hours, "ignoring unusable refresh duration");
                defaults.default_refresh_hours
            }
            None => defaults.default_refresh_hours,
        };

        let notification_mode = source
            .get_int(REFRESH_NOTIFICATION_KEY)
            .map(NotificationMode::from_setting)
            .unwrap_or(defaults.notification_mode);

        let notification_sound = source
            .get_bool(REFRESH_SOUND_KEY)
            .unwrap_or(defaults.notification_sound);

        Self {
            refresh_mode,
            default_refresh_hours,
            notification_mode,
            notification_sound,
        }
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
