use anyhow::Result;
use async_trait::async_trait;
use shared::domain::{GroupDefinition, GroupId, PathDescriptor, WidgetDefinition, WidgetId};

/// Persistence for widget, group and path definitions.
///
/// Listings come back in definition order.
#[async_trait]
pub trait WidgetStore: Send + Sync {
    async fn find_defined_widgets(&self, group_id: Option<&GroupId>)
        -> Result<Vec<WidgetDefinition>>;
    async fn find_defined_groups(&self) -> Result<Vec<GroupDefinition>>;
    async fn find_defined_paths(&self, group_id: &GroupId) -> Result<Vec<PathDescriptor>>;
    async fn get_widget_by_id(&self, widget_id: &WidgetId) -> Result<Option<WidgetDefinition>>;
    async fn save_path_details(&self, widget: &WidgetDefinition) -> Result<()>;
    /// Returns `false` when the stored widget is malformed and must be reset.
    async fn clean(&self, widget_id: &WidgetId) -> Result<bool>;
}
