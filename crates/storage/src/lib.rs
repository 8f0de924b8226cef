use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rotation::WidgetStore;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::warn;

use shared::domain::{GroupDefinition, GroupId, PathDescriptor, WidgetDefinition, WidgetId};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every in-memory connection is its own database.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_group(&self, label: &str) -> Result<GroupId> {
        let group_id = GroupId::generate();
        sqlx::query(
            "INSERT INTO widget_groups (id, label, position)
             VALUES (?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM widget_groups))",
        )
        .bind(group_id.as_str())
        .bind(label)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to create group '{label}'"))?;
        Ok(group_id)
    }

    pub async fn add_path(&self, group_id: &GroupId, path: &PathDescriptor) -> Result<i64> {
        let descriptor = serde_json::to_string(path)?;
        let rec = sqlx::query(
            "INSERT INTO group_paths (group_id, position, descriptor)
             VALUES (?, (SELECT COALESCE(MAX(position), -1) + 1 FROM group_paths WHERE group_id = ?), ?)
             RETURNING id",
        )
        .bind(group_id.as_str())
        .bind(group_id.as_str())
        .bind(descriptor)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to add path to group {group_id}"))?;
        Ok(rec.get::<i64, _>(0))
    }

    pub async fn create_widget(&self, widget: &WidgetDefinition) -> Result<()> {
        let definition = serde_json::to_string(widget)?;
        sqlx::query(
            "INSERT INTO widgets (id, group_id, position, definition)
             VALUES (?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM widgets), ?)",
        )
        .bind(widget.id.as_str())
        .bind(widget.group_id.as_str())
        .bind(definition)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to create widget {}", widget.id))?;
        Ok(())
    }

    async fn load_definition(&self, widget_id: &WidgetId) -> Result<Option<String>> {
        let row = sqlx::query("SELECT definition FROM widgets WHERE id = ?")
            .bind(widget_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }
}

fn decode_widget(row: &SqliteRow) -> Option<WidgetDefinition> {
    let widget_id: String = row.get("id");
    let definition: String = row.get("definition");
    match serde_json::from_str(&definition) {
        Ok(widget) => Some(widget),
        Err(error) => {
            warn!(%widget_id, %error, "skipping undecodable widget definition");
            None
        }
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl WidgetStore for Storage {
    async fn find_defined_widgets(
        &self,
        group_id: Option<&GroupId>,
    ) -> Result<Vec<WidgetDefinition>> {
        let rows = match group_id {
            Some(group_id) => {
                sqlx::query(
                    "SELECT id, definition FROM widgets WHERE group_id = ? ORDER BY position, rowid",
                )
                .bind(group_id.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT id, definition FROM widgets ORDER BY position, rowid")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.iter().filter_map(decode_widget).collect())
    }

    async fn find_defined_groups(&self) -> Result<Vec<GroupDefinition>> {
        let rows = sqlx::query("SELECT id, label FROM widget_groups ORDER BY position, rowid")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| GroupDefinition {
                id: GroupId(r.get::<String, _>(0)),
                label: r.get::<String, _>(1),
            })
            .collect())
    }

    async fn find_defined_paths(&self, group_id: &GroupId) -> Result<Vec<PathDescriptor>> {
        let rows = sqlx::query(
            "SELECT descriptor FROM group_paths WHERE group_id = ? ORDER BY position, id",
        )
        .bind(group_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let raw = r.get::<String, _>(0);
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid path descriptor in group {group_id}: {raw}"))
            })
            .collect()
    }

    async fn get_widget_by_id(&self, widget_id: &WidgetId) -> Result<Option<WidgetDefinition>> {
        let Some(definition) = self.load_definition(widget_id).await? else {
            return Ok(None);
        };
        let widget = serde_json::from_str(&definition)
            .with_context(|| format!("invalid definition for widget {widget_id}"))?;
        Ok(Some(widget))
    }

    async fn save_path_details(&self, widget: &WidgetDefinition) -> Result<()> {
        let definition = serde_json::to_string(widget)?;
        let result = sqlx::query(
            "UPDATE widgets SET group_id = ?, definition = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(widget.group_id.as_str())
        .bind(definition)
        .bind(widget.id.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save widget {}", widget.id))?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("widget {} is not defined", widget.id));
        }
        Ok(())
    }

    async fn clean(&self, widget_id: &WidgetId) -> Result<bool> {
        let Some(definition) = self.load_definition(widget_id).await? else {
            return Ok(true);
        };
        let Ok(widget) = serde_json::from_str::<WidgetDefinition>(&definition) else {
            return Ok(false);
        };
        Ok(widget.validate().is_ok())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
