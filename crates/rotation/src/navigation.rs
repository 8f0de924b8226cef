use shared::{
    domain::{PathDescriptor, WidgetDefinition, WidgetId},
    protocol::Outcome,
};
use tracing::{debug, info};

use crate::{
    error::RotationError,
    signals::{publish, UiCommand, UI_COMMAND_SETTLE},
    RotationContext,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Direction {
    /// Page into `candidate`, typically the next entry of a listing.
    Forward(PathDescriptor),
    Backward,
    Reset,
}

/// Apply one navigation step to `widget`. Returns `false` when the step
/// leaves the widget untouched.
pub fn apply(widget: &mut WidgetDefinition, direction: Direction) -> bool {
    match direction {
        Direction::Forward(candidate) => {
            if widget.path.as_ref() == Some(&candidate) {
                return false;
            }

            if let Some(position) = widget.stack.iter().position(|entry| *entry == candidate) {
                // Paging into a page already in history unwinds to it.
                widget.stack.truncate(position);
            } else if let Some(current) = widget.path.take() {
                widget.stack.push(current);
            }
            widget.path = Some(candidate);
        }
        Direction::Backward => {
            let Some(previous) = widget.stack.pop() else {
                return false;
            };
            widget.path = Some(previous);
        }
        Direction::Reset => {
            if widget.stack.is_empty() {
                return false;
            }
            let root = widget.stack.swap_remove(0);
            widget.stack.clear();
            widget.path = Some(root);
        }
    }

    relabel(widget);
    true
}

/// The label names the nearest labelled page we navigated away from.
fn relabel(widget: &mut WidgetDefinition) {
    widget.label = widget
        .stack
        .iter()
        .rev()
        .find_map(PathDescriptor::label)
        .unwrap_or_default()
        .to_owned();
}

#[derive(Clone)]
pub struct Navigator {
    ctx: RotationContext,
}

impl Navigator {
    pub fn new(ctx: RotationContext) -> Self {
        Self { ctx }
    }

    pub async fn navigate(
        &self,
        widget_id: &WidgetId,
        direction: Direction,
    ) -> Result<Outcome, RotationError> {
        let _guard = self.ctx.locks.acquire(widget_id).await;

        let Some(mut widget) = self.load(widget_id).await? else {
            debug!(%widget_id, "navigation requested for unknown widget");
            return Ok(Outcome::UnknownWidget);
        };

        let forward = matches!(direction, Direction::Forward(_));
        debug!(%widget_id, ?direction, depth = widget.stack.len(), "navigating widget");

        if !apply(&mut widget, direction) {
            return Ok(Outcome::Unchanged);
        }

        publish(&self.ctx, &widget).await;
        self.ctx.ui.refresh_container();

        if forward {
            for command in UiCommand::BACK_TO_TOP {
                self.ctx.ui.dispatch_ui_command(command, UI_COMMAND_SETTLE);
            }
        }

        Ok(Outcome::Applied)
    }

    /// Force a malformed widget back to its root page and clear its timing
    /// so the next pass rotates it.
    pub async fn recover(&self, widget_id: &WidgetId) -> Result<Outcome, RotationError> {
        let _guard = self.ctx.locks.acquire(widget_id).await;

        let Some(mut widget) = self.load(widget_id).await? else {
            debug!(%widget_id, "recovery requested for unknown widget");
            return Ok(Outcome::UnknownWidget);
        };

        info!(%widget_id, "resetting malformed widget");

        if !widget.stack.is_empty() {
            widget.path = Some(widget.stack.swap_remove(0));
            widget.stack.clear();
        }
        widget.label.clear();
        widget.updated = 0;
        if widget.current_index < -1 {
            widget.current_index = -1;
        }
        if widget
            .refresh_hours
            .is_some_and(|hours| !hours.is_finite() || hours <= 0.0)
        {
            widget.refresh_hours = None;
        }

        publish(&self.ctx, &widget).await;
        Ok(Outcome::Applied)
    }

    async fn load(&self, widget_id: &WidgetId) -> Result<Option<WidgetDefinition>, RotationError> {
        self.ctx
            .store
            .get_widget_by_id(widget_id)
            .await
            .map_err(RotationError::Store)
    }
}

#[cfg(test)]
#[path = "tests/navigation_tests.rs"]
mod tests;
