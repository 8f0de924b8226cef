use std::sync::Arc;

use shared::{
    domain::{PathDescriptor, WidgetId},
    protocol::{Outcome, PassReport},
};
use tokio::{
    sync::{mpsc, oneshot, watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    error::RotationError,
    navigation::{Direction, Navigator},
    scheduler::{PassKind, Scheduler, SchedulerCommand},
    settings::{RefreshSettings, SettingsSource, MIRRORED_PROPERTIES},
    RotationContext,
};

const COMMAND_BUFFER: usize = 16;

/// Entry point for the host: lifecycle hooks plus the manual actions a
/// front end can trigger.
pub struct RotationService {
    ctx: RotationContext,
    navigator: Navigator,
    settings_source: Arc<dyn SettingsSource>,
    settings: watch::Sender<RefreshSettings>,
    commands: mpsc::Sender<SchedulerCommand>,
    cancel: CancellationToken,
    pending_scheduler: Mutex<Option<Scheduler>>,
    scheduler_task: Mutex<Option<JoinHandle<()>>>,
}

impl RotationService {
    pub fn new(ctx: RotationContext, settings_source: Arc<dyn SettingsSource>) -> Arc<Self> {
        let initial = RefreshSettings::load(settings_source.as_ref());
        let (settings, settings_rx) = watch::channel(initial);
        let (commands, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let cancel = CancellationToken::new();
        let scheduler = Scheduler::new(ctx.clone(), settings_rx, commands_rx, cancel.clone());

        Arc::new(Self {
            navigator: Navigator::new(ctx.clone()),
            ctx,
            settings_source,
            settings,
            commands,
            cancel,
            pending_scheduler: Mutex::new(Some(scheduler)),
            scheduler_task: Mutex::new(None),
        })
    }

    /// Swap in a customised scheduler before [`Self::on_start`].
    pub async fn configure_scheduler(&self, configure: impl FnOnce(Scheduler) -> Scheduler) {
        let mut pending = self.pending_scheduler.lock().await;
        if let Some(scheduler) = pending.take() {
            *pending = Some(configure(scheduler));
        }
    }

    /// Mirror settings, clean malformed widgets, run the startup pass and
    /// hand the scheduler to a background task.
    pub async fn on_start(&self) -> Result<PassReport, RotationError> {
        info!("starting widget rotation service");
        self.on_settings_changed();

        let mut pending = self.pending_scheduler.lock().await;
        let scheduler = pending.take().ok_or(RotationError::AlreadyStarted)?;
        let report = match scheduler.startup().await {
            Ok(report) => report,
            Err(error) => {
                *pending = Some(scheduler);
                return Err(error);
            }
        };

        let task = tokio::spawn(scheduler.run());
        *self.scheduler_task.lock().await = Some(task);
        Ok(report)
    }

    /// Re-read settings, mirror the exposed ones into display properties and
    /// publish a fresh snapshot for the next pass.
    pub fn on_settings_changed(&self) -> RefreshSettings {
        if let Err(error) = self.settings_source.reload() {
            warn!(error = %format!("{error:#}"), "failed to reload settings; keeping previous values");
        }

        for key in MIRRORED_PROPERTIES {
            match self.settings_source.get_string(key) {
                Some(value) => {
                    info!(property = key, %value, "property set");
                    self.ctx.ui.set_display_property(key, &value);
                }
                None => {
                    info!(property = key, "property cleared");
                    self.ctx.ui.clear_display_property(key);
                }
            }
        }

        let snapshot = RefreshSettings::load(self.settings_source.as_ref());
        self.settings.send_replace(snapshot);
        self.ctx.ui.refresh_container();
        snapshot
    }

    pub fn on_abort_requested(&self) {
        info!("abort requested, stopping widget rotation service");
        self.cancel.cancel();
    }

    /// Abort and wait for the scheduler task to finish its current widget.
    pub async fn shutdown(&self) {
        self.on_abort_requested();
        if let Some(task) = self.scheduler_task.lock().await.take() {
            if let Err(error) = task.await {
                warn!(%error, "scheduler task ended abnormally");
            }
        }
    }

    pub fn settings(&self) -> RefreshSettings {
        *self.settings.borrow()
    }

    pub async fn next(
        &self,
        widget_id: &WidgetId,
        candidate: PathDescriptor,
    ) -> Result<Outcome, RotationError> {
        self.navigator
            .navigate(widget_id, Direction::Forward(candidate))
            .await
    }

    pub async fn back(&self, widget_id: &WidgetId) -> Result<Outcome, RotationError> {
        self.navigator.navigate(widget_id, Direction::Backward).await
    }

    pub async fn reset(&self, widget_id: &WidgetId) -> Result<Outcome, RotationError> {
        self.navigator.navigate(widget_id, Direction::Reset).await
    }

    /// Rotate every widget now, ignoring timers and gating.
    ///
    /// Once started, the request is queued on the scheduler task so it never
    /// overlaps a timed pass.
    pub async fn force_refresh_all(&self) -> Result<PassReport, RotationError> {
        {
            let pending = self.pending_scheduler.lock().await;
            if let Some(scheduler) = pending.as_ref() {
                return scheduler.pass(PassKind::Forced).await;
            }
        }

        if self.cancel.is_cancelled() {
            return Err(RotationError::Stopped);
        }

        let (respond_to, response) = oneshot::channel();
        self.commands
            .send(SchedulerCommand::RefreshNow { respond_to })
            .await
            .map_err(|_| RotationError::Stopped)?;
        response.await.map_err(|_| RotationError::Stopped)?
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
