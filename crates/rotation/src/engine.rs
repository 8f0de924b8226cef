use rand::{seq::SliceRandom, Rng};
use shared::{
    domain::{GroupId, PathDescriptor, WidgetAction, WidgetDefinition, WidgetId},
    protocol::Outcome,
};
use tracing::{debug, error};

use crate::{settings::RefreshSettings, signals::publish, RotationContext};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Paths still available to the widgets of one group during one pass.
///
/// Owned by the pass and handed from widget to widget; a selected path is
/// removed so later widgets in the same pass cannot pick it again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    paths: Vec<PathDescriptor>,
}

impl CandidatePool {
    pub fn new(paths: Vec<PathDescriptor>) -> Self {
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathDescriptor] {
        &self.paths
    }

    fn take(&mut self, index: usize) -> PathDescriptor {
        self.paths.remove(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub pool: CandidatePool,
    pub outcome: Outcome,
}

impl Evaluation {
    fn unchanged(pool: CandidatePool, outcome: Outcome) -> Self {
        Self { pool, outcome }
    }
}

/// `true` once `refresh_hours` have elapsed since `updated`, boundary included.
pub fn is_due(updated: i64, now: i64, refresh_hours: f64) -> bool {
    now.saturating_sub(updated) as f64 >= refresh_hours * SECONDS_PER_HOUR
}

/// Picks the next index for `action`, or `None` when nothing can be chosen.
pub fn select_index(
    action: WidgetAction,
    current_index: i64,
    paths: &mut [PathDescriptor],
) -> Option<usize> {
    if paths.is_empty() {
        return None;
    }
    let len = paths.len();

    match action {
        WidgetAction::Sequential => {
            let next = current_index.saturating_add(1).rem_euclid(len as i64);
            usize::try_from(next).ok()
        }
        WidgetAction::Random => {
            let mut rng = rand::rng();
            paths.shuffle(&mut rng);
            Some(rng.random_range(0..len))
        }
        WidgetAction::Static | WidgetAction::Merged => None,
    }
}

#[derive(Clone)]
pub struct RotationEngine {
    ctx: RotationContext,
}

impl RotationEngine {
    pub fn new(ctx: RotationContext) -> Self {
        Self { ctx }
    }

    /// Advance one widget if it is due (or `force` is set).
    ///
    /// `preloaded` skips the store read when the caller already holds the
    /// definition. An empty `pool` is refilled from the widget's group. The
    /// remaining pool is always handed back, untouched when nothing rotated.
    pub async fn evaluate(
        &self,
        widget_id: &WidgetId,
        preloaded: Option<WidgetDefinition>,
        pool: CandidatePool,
        force: bool,
        settings: &RefreshSettings,
    ) -> Evaluation {
        let _guard = self.ctx.locks.acquire(widget_id).await;

        let mut widget = match preloaded {
            Some(widget) => widget,
            None => match self.ctx.store.get_widget_by_id(widget_id).await {
                Ok(Some(widget)) => widget,
                Ok(None) => {
                    debug!(%widget_id, "rotation requested for unknown widget");
                    return Evaluation::unchanged(pool, Outcome::UnknownWidget);
                }
                Err(error) => {
                    error!(%widget_id, error = %format!("{error:#}"), "failed to load widget for rotation");
                    return Evaluation::unchanged(pool, Outcome::Unchanged);
                }
            },
        };

        if !widget.action.rotates() {
            return Evaluation::unchanged(pool, Outcome::Unchanged);
        }

        let now = self.ctx.clock.now();
        let refresh_hours = widget
            .refresh_hours
            .unwrap_or(settings.default_refresh_hours);
        if !force && !is_due(widget.updated, now, refresh_hours) {
            return Evaluation::unchanged(pool, Outcome::Unchanged);
        }

        widget.stack.clear();
        widget.label.clear();

        let mut pool = pool;
        if pool.is_empty() {
            pool = self.load_pool(&widget.group_id).await;
        }

        let Some(index) = select_index(widget.action, widget.current_index, &mut pool.paths) else {
            debug!(%widget_id, group_id = %widget.group_id, "no candidate paths to rotate to");
            return Evaluation::unchanged(pool, Outcome::Unchanged);
        };

        let path = pool.take(index);
        debug!(
            %widget_id,
            action = %widget.action,
            index,
            path = path.target(),
            force,
            "rotating widget"
        );

        widget.current_index = index as i64;
        widget.path = Some(path);
        widget.updated = if force { 0 } else { now };

        publish(&self.ctx, &widget).await;

        Evaluation {
            pool,
            outcome: Outcome::Applied,
        }
    }

    async fn load_pool(&self, group_id: &GroupId) -> CandidatePool {
        match self.ctx.store.find_defined_paths(group_id).await {
            Ok(paths) => CandidatePool::new(paths),
            Err(error) => {
                error!(%group_id, error = %format!("{error:#}"), "failed to load group paths");
                CandidatePool::default()
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
