//! Rotation and refresh scheduling for widget slots.
//!
//! The scheduler wakes on a fixed interval, asks the [`RotationEngine`] to
//! advance every eligible widget of every group, and threads one shrinking
//! candidate pool through each group so widgets of the same group never
//! receive the same path in one pass. Manual paging goes through the
//! [`Navigator`]. Both serialize on a per-widget lock.

use std::sync::Arc;

pub mod engine;
pub mod error;
pub mod locks;
pub mod navigation;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod signals;
pub mod store;

pub use engine::{CandidatePool, Evaluation, RotationEngine};
pub use error::RotationError;
pub use locks::WidgetLocks;
pub use navigation::{Direction, Navigator};
pub use scheduler::{PassKind, Scheduler, SchedulerCommand, WAKE_INTERVAL};
pub use service::RotationService;
pub use settings::{NotificationMode, RefreshMode, RefreshSettings, SettingsSource};
pub use signals::{PlaybackObserver, UiCommand, UiSignals};
pub use store::WidgetStore;

/// Source of epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Collaborators shared by every component of the core.
#[derive(Clone)]
pub struct RotationContext {
    pub store: Arc<dyn WidgetStore>,
    pub ui: Arc<dyn UiSignals>,
    pub playback: Arc<dyn PlaybackObserver>,
    pub clock: Arc<dyn Clock>,
    pub locks: WidgetLocks,
}

impl RotationContext {
    pub fn new(
        store: Arc<dyn WidgetStore>,
        ui: Arc<dyn UiSignals>,
        playback: Arc<dyn PlaybackObserver>,
    ) -> Self {
        Self {
            store,
            ui,
            playback,
            clock: Arc::new(SystemClock),
            locks: WidgetLocks::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
