use super::*;
use crate::test_support::{SettingValue, StaticSettings};

#[test]
fn missing_settings_fall_back_to_defaults() {
    let source = StaticSettings::default();
    assert_eq!(RefreshSettings::load(&source), RefreshSettings::default());
}

#[test]
fn integer_modes_map_to_gating_and_notification_policies() {
    let source = StaticSettings::default();
    source.set(REFRESH_ENABLED_KEY, SettingValue::Int(1));
    source.set(REFRESH_NOTIFICATION_KEY, SettingValue::Int(1));
    source.set(REFRESH_SOUND_KEY, SettingValue::Bool(true));
    source.set(REFRESH_DURATION_KEY, SettingValue::Int(3));

    let settings = RefreshSettings::load(&source);

    assert_eq!(settings.refresh_mode, RefreshMode::SkipDuringPlayback);
    assert_eq!(settings.notification_mode, NotificationMode::WhenIdle);
    assert!(settings.notification_sound);
    assert_eq!(settings.default_refresh_hours, 3.0);
}

#[test]
fn unusable_values_degrade_to_safe_choices() {
    let source = StaticSettings::default();
    source.set(REFRESH_ENABLED_KEY, SettingValue::Int(9));
    source.set(REFRESH_NOTIFICATION_KEY, SettingValue::Int(-1));
    source.set(REFRESH_DURATION_KEY, SettingValue::Float(0.0));

    let settings = RefreshSettings::load(&source);

    assert_eq!(settings.refresh_mode, RefreshMode::Off);
    assert_eq!(settings.notification_mode, NotificationMode::Never);
    assert_eq!(settings.default_refresh_hours, 1.0);
}

#[test]
fn when_idle_notifications_respect_playback() {
    assert!(NotificationMode::WhenIdle.allows(false));
    assert!(!NotificationMode::WhenIdle.allows(true));
    assert!(NotificationMode::Always.allows(true));
    assert!(!NotificationMode::Never.allows(false));
}
