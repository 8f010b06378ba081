//! Campaign runner — simulated automated sending, one contact at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DEFAULT_SEND_DELAY;
use crate::contacts::model::{ContactPatch, DraftStatus};
use crate::contacts::store::ContactStore;
use crate::error::{CampaignError, StoreError};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Simulated dispatch latency, injectable so tests need not sleep.
#[async_trait]
pub trait DispatchDelay: Send + Sync {
    async fn wait(&self);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct TokioDelay(pub Duration);

impl Default for TokioDelay {
    fn default() -> Self {
        Self(DEFAULT_SEND_DELAY)
    }
}

#[async_trait]
impl DispatchDelay for TokioDelay {
    async fn wait(&self) {
        tokio::time::sleep(self.0).await;
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl DispatchDelay for NoDelay {
    async fn wait(&self) {
        tokio::task::yield_now().await;
    }
}

/// Runner state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
    #[default]
    Idle,
    Running,
}

/// Current progress snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CampaignProgress {
    pub state: CampaignState,
    pub completed: usize,
    pub total: usize,
    /// Rounded percentage of targets completed.
    pub percent: u8,
}

/// Summary of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CampaignReport {
    /// Size of the target set fixed at start.
    pub targets: usize,
    /// Targets marked sent.
    pub sent: usize,
    /// Targets that vanished or could no longer be marked sent.
    pub skipped: usize,
    pub cancelled: bool,
}

/// Events published while a run progresses.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CampaignEvent {
    Started { total: usize },
    Progress {
        contact_id: Uuid,
        completed: usize,
        total: usize,
        percent: u8,
    },
    Finished { report: CampaignReport },
}

/// `round(100 * completed / total)`, rounding halves up.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (200 * completed + total) / (2 * total);
    pct.min(100) as u8
}

/// Resets the runner to idle when a run ends.
struct RunGuard<'a>(&'a CampaignRunner);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0
            .progress_tx
            .send_modify(|p| p.state = CampaignState::Idle);
        self.0.running.store(false, Ordering::SeqCst);
    }
}

/// Walks every sendable contact sequentially, marking each as sent.
pub struct CampaignRunner {
    store: Arc<ContactStore>,
    delay: Arc<dyn DispatchDelay>,
    running: AtomicBool,
    cancel: AtomicBool,
    progress_tx: watch::Sender<CampaignProgress>,
    events: broadcast::Sender<CampaignEvent>,
}

impl CampaignRunner {
    pub fn new(store: Arc<ContactStore>, delay: Arc<dyn DispatchDelay>) -> Self {
        let (progress_tx, _progress_rx) = watch::channel(CampaignProgress::default());
        let (events, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self {
            store,
            delay,
            running: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            progress_tx,
            events,
        }
    }

    /// Subscribe to run events.
    pub fn subscribe(&self) -> broadcast::Receiver<CampaignEvent> {
        self.events.subscribe()
    }

    /// Watch the latest progress snapshot.
    pub fn watch_progress(&self) -> watch::Receiver<CampaignProgress> {
        self.progress_tx.subscribe()
    }

    pub fn progress(&self) -> CampaignProgress {
        *self.progress_tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the current run to stop before its next target.
    ///
    /// A target already in flight always completes.
    pub fn cancel(&self) {
        if self.is_running() {
            info!("Campaign cancellation requested");
            self.cancel.store(true, Ordering::SeqCst);
        }
    }

    /// Run one campaign over the contacts sendable right now.
    pub async fn run(&self) -> Result<CampaignReport, CampaignError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CampaignError::AlreadyRunning);
        }
        let _guard = RunGuard(self);
        self.cancel.store(false, Ordering::SeqCst);

        let targets: Vec<(Uuid, DraftStatus)> = self
            .store
            .snapshot()
            .await
            .into_iter()
            .filter(|c| c.is_sendable())
            .map(|c| (c.id, c.draft_status))
            .collect();

        let total = targets.len();
        if total == 0 {
            debug!("No sendable contacts, campaign skipped");
            let report = CampaignReport::default();
            let _ = self.events.send(CampaignEvent::Finished { report });
            return Ok(report);
        }

        info!(total, "Campaign started");
        self.progress_tx.send_replace(CampaignProgress {
            state: CampaignState::Running,
            completed: 0,
            total,
            percent: 0,
        });
        let _ = self.events.send(CampaignEvent::Started { total });

        let mut report = CampaignReport {
            targets: total,
            ..CampaignReport::default()
        };

        for (i, (id, prior_status)) in targets.into_iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                info!(completed = i, total, "Campaign cancelled");
                report.cancelled = true;
                break;
            }

            if self.dispatch(id, prior_status).await {
                report.sent += 1;
            } else {
                report.skipped += 1;
            }

            let completed = i + 1;
            let percent = progress_percent(completed, total);
            self.progress_tx.send_modify(|p| {
                p.completed = completed;
                p.percent = percent;
            });
            let _ = self.events.send(CampaignEvent::Progress {
                contact_id: id,
                completed,
                total,
                percent,
            });
        }

        info!(
            sent = report.sent,
            skipped = report.skipped,
            cancelled = report.cancelled,
            "Campaign finished"
        );
        let _ = self.events.send(CampaignEvent::Finished { report });
        Ok(report)
    }

    /// Send to one target. Returns whether it ended up sent.
    async fn dispatch(&self, id: Uuid, prior_status: DraftStatus) -> bool {
        if let Err(e) = self
            .store
            .update(id, ContactPatch::draft_status(DraftStatus::DISPATCHING))
            .await
        {
            warn!(contact_id = %id, error = %e, "Campaign target vanished");
            return false;
        }

        self.delay.wait().await;

        match self.store.update(id, ContactPatch::sent()).await {
            Ok(_) => {
                debug!(contact_id = %id, "Campaign message sent");
                true
            }
            Err(StoreError::NotFound { .. }) => {
                warn!(contact_id = %id, "Campaign target removed mid-send");
                false
            }
            Err(e) => {
                warn!(contact_id = %id, error = %e, "Campaign target could not be sent");
                if let Err(e) = self
                    .store
                    .update(id, ContactPatch::draft_status(prior_status))
                    .await
                {
                    warn!(contact_id = %id, error = %e, "Failed to restore draft status");
                }
                false
            }
        }
    }
}
