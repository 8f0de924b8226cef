use std::time::Duration;

use shared::protocol::{Outcome, PassReport, PassStatus};
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    engine::{CandidatePool, RotationEngine},
    error::RotationError,
    navigation::Navigator,
    settings::{RefreshMode, RefreshSettings},
    signals::{NOTIFICATION_MESSAGE, NOTIFICATION_TITLE},
    RotationContext,
};

pub const WAKE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// First pass after cleanup: gated, never notifies.
    Startup,
    /// Timer wake: gated, notifies per the notification mode.
    Scheduled,
    /// Manual refresh: ungated, rotates everything, always notifies.
    Forced,
}

pub enum SchedulerCommand {
    RefreshNow {
        respond_to: oneshot::Sender<Result<PassReport, RotationError>>,
    },
}

pub struct Scheduler {
    ctx: RotationContext,
    engine: RotationEngine,
    navigator: Navigator,
    settings: watch::Receiver<RefreshSettings>,
    commands: mpsc::Receiver<SchedulerCommand>,
    cancel: CancellationToken,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        ctx: RotationContext,
        settings: watch::Receiver<RefreshSettings>,
        commands: mpsc::Receiver<SchedulerCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine: RotationEngine::new(ctx.clone()),
            navigator: Navigator::new(ctx.clone()),
            ctx,
            settings,
            commands,
            cancel,
            interval: WAKE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Reset malformed widgets, then run the startup pass.
    pub async fn startup(&self) -> Result<PassReport, RotationError> {
        self.clean_widgets().await?;
        self.pass(PassKind::Startup).await
    }

    async fn clean_widgets(&self) -> Result<(), RotationError> {
        let widgets = self
            .ctx
            .store
            .find_defined_widgets(None)
            .await
            .map_err(RotationError::Store)?;

        for widget in widgets {
            match self.ctx.store.clean(&widget.id).await {
                Ok(true) => {}
                Ok(false) => {
                    if let Err(error) = self.navigator.recover(&widget.id).await {
                        warn!(widget_id = %widget.id, %error, "failed to reset malformed widget");
                    }
                }
                Err(error) => {
                    warn!(widget_id = %widget.id, error = %format!("{error:#}"), "widget validity check failed");
                }
            }
        }
        Ok(())
    }

    /// Sleep/wake loop. Returns once the cancellation token fires.
    ///
    /// Forced refreshes run between wakes without moving the next wake.
    pub async fn run(mut self) {
        info!(interval = ?self.interval, "widget refresh scheduler started");

        let mut next_wake = Instant::now() + self.interval;
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                command = self.commands.recv(), if commands_open => match command {
                    Some(SchedulerCommand::RefreshNow { respond_to }) => {
                        let report = self.pass(PassKind::Forced).await;
                        let _ = respond_to.send(report);
                    }
                    None => commands_open = false,
                },
                _ = time::sleep_until(next_wake) => {
                    if let Err(error) = self.pass(PassKind::Scheduled).await {
                        error!(%error, "scheduled widget refresh failed");
                    }
                    next_wake = Instant::now() + self.interval;
                }
            }
        }

        info!("widget refresh scheduler stopped");
    }

    pub async fn pass(&self, kind: PassKind) -> Result<PassReport, RotationError> {
        let settings = *self.settings.borrow();

        if kind != PassKind::Forced {
            match settings.refresh_mode {
                RefreshMode::Off => {
                    info!("widget refreshing not enabled");
                    return Ok(PassReport::skipped(PassStatus::Disabled));
                }
                RefreshMode::SkipDuringPlayback if self.ctx.playback.is_playing_video() => {
                    info!("playback detected, skipping widget refresh");
                    return Ok(PassReport::skipped(PassStatus::PlaybackActive));
                }
                RefreshMode::On | RefreshMode::SkipDuringPlayback => {}
            }
        }

        let has_widgets = !self
            .ctx
            .store
            .find_defined_widgets(None)
            .await
            .map_err(RotationError::Store)?
            .is_empty();
        if !has_widgets {
            info!("no widgets defined, nothing to refresh");
            return Ok(PassReport::skipped(PassStatus::NoWidgets));
        }

        let notified = match kind {
            PassKind::Startup => false,
            PassKind::Scheduled => settings
                .notification_mode
                .allows(self.ctx.playback.is_playing_video()),
            PassKind::Forced => true,
        };
        if notified {
            self.ctx.ui.show_notification(
                NOTIFICATION_TITLE,
                NOTIFICATION_MESSAGE,
                settings.notification_sound,
            );
        }

        info!(?kind, "refreshing widgets");
        let force = kind == PassKind::Forced;
        let mut report = PassReport {
            status: PassStatus::Completed,
            rotated: Vec::new(),
            notified,
        };

        let groups = self
            .ctx
            .store
            .find_defined_groups()
            .await
            .map_err(RotationError::Store)?;

        'groups: for group in groups {
            let widgets = match self.ctx.store.find_defined_widgets(Some(&group.id)).await {
                Ok(widgets) => widgets,
                Err(error) => {
                    error!(group_id = %group.id, error = %format!("{error:#}"), "failed to list group widgets");
                    continue;
                }
            };

            let mut pool = CandidatePool::default();
            for widget in widgets {
                if self.cancel.is_cancelled() {
                    report.status = PassStatus::Aborted;
                    break 'groups;
                }

                let widget_id = widget.id.clone();
                let evaluation = self
                    .engine
                    .evaluate(&widget_id, Some(widget), pool, force, &settings)
                    .await;
                pool = evaluation.pool;
                if evaluation.outcome == Outcome::Applied {
                    report.rotated.push(widget_id);
                }
            }
        }

        self.ctx.ui.refresh_container();
        info!(
            status = ?report.status,
            rotated = report.rotated.len(),
            "widget refresh finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
