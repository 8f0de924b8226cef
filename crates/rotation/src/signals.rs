use std::time::Duration;

use shared::domain::{WidgetDefinition, WidgetId};
use tracing::{debug, warn};

use crate::RotationContext;

pub const NOTIFICATION_TITLE: &str = "Widgets";
pub const NOTIFICATION_MESSAGE: &str = "Refreshing widgets";

/// Delay the front end should leave between navigation-reset commands.
pub const UI_COMMAND_SETTLE: Duration = Duration::from_millis(100);

/// Skin-facing side effects. Implementations must not block.
pub trait UiSignals: Send + Sync {
    fn set_display_property(&self, key: &str, value: &str);
    fn clear_display_property(&self, key: &str);
    fn refresh_container(&self);
    fn show_notification(&self, title: &str, message: &str, sound: bool);
    fn dispatch_ui_command(&self, command: UiCommand, settle: Duration);
}

pub trait PlaybackObserver: Send + Sync {
    fn is_playing_video(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    Back,
    FirstPage,
    Right,
}

impl UiCommand {
    /// Returns a paged listing to its first page.
    pub const BACK_TO_TOP: [Self; 3] = [Self::Back, Self::FirstPage, Self::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Back => "back",
            Self::FirstPage => "firstpage",
            Self::Right => "right",
        }
    }
}

pub fn refresh_property(widget_id: &WidgetId) -> String {
    format!("widget-{widget_id}-refresh")
}

pub fn label_property(widget_id: &WidgetId) -> String {
    format!("widget-{widget_id}-label")
}

/// Persist a mutated widget and refresh its display properties.
///
/// A failed write is logged and otherwise ignored: the in-memory state stays
/// ahead of the store until the next successful save.
pub(crate) async fn publish(ctx: &RotationContext, widget: &WidgetDefinition) {
    if let Err(error) = ctx.store.save_path_details(widget).await {
        warn!(widget_id = %widget.id, error = %format!("{error:#}"), "failed to persist widget");
    }

    ctx.ui
        .set_display_property(&refresh_property(&widget.id), &ctx.clock.now().to_string());

    let label_key = label_property(&widget.id);
    if widget.label.is_empty() {
        ctx.ui.clear_display_property(&label_key);
    } else {
        ctx.ui.set_display_property(&label_key, &widget.label);
    }

    debug!(
        widget_id = %widget.id,
        path = ?widget.path.as_ref().map(|path| path.target()),
        "refreshing widget display"
    );
}
