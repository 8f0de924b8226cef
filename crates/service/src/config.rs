use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

const CONFIG_FILE: &str = "service.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub settings_path: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8480".into(),
            database_url: "sqlite://./data/widgets.db".into(),
            settings_path: PathBuf::from("settings.toml"),
        }
    }
}

pub fn load_config() -> ServiceConfig {
    let file = fs::read_to_string(CONFIG_FILE).ok();
    resolve_config(file.as_deref(), |key| std::env::var(key).ok())
}

/// Layers `service.toml` over the defaults, then the environment over both.
fn resolve_config(file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> ServiceConfig {
    let mut config = ServiceConfig::default();

    if let Some(raw) = file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
            if let Some(v) = file_cfg.get("bind_addr") {
                config.bind_addr = v.clone();
            }
            if let Some(v) = file_cfg.get("database_url") {
                config.database_url = v.clone();
            }
            if let Some(v) = file_cfg.get("settings_path") {
                config.settings_path = PathBuf::from(v);
            }
        }
    }

    if let Some(v) = env("APP__BIND_ADDR") {
        config.bind_addr = v;
    }

    if let Some(v) = env("DATABASE_URL") {
        config.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        config.database_url = v;
    }

    if let Some(v) = env("APP__SETTINGS_PATH") {
        config.settings_path = PathBuf::from(v);
    }

    config
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return ServiceConfig::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(parent) = sqlite_path(database_url)
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
    else {
        return Ok(());
    };

    fs::create_dir_all(&parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    let path = database_url
        .strip_prefix("sqlite://")?
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(PathBuf::from(path))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
