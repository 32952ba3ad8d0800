//! Timed status messages shown while a submission is in flight.
//!
//! The schedule only paces the messages. Completion of the visible sequence
//! is combined with the real outcome by the controller, never inferred from
//! the timer alone.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::{AbortHandle, JoinHandle},
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressPhase {
    pub label: String,
    pub min_duration: Duration,
}

impl ProgressPhase {
    pub fn new(label: impl Into<String>, min_duration: Duration) -> Self {
        Self {
            label: label.into(),
            min_duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressStatus {
    NotStarted,
    Playing { index: usize, label: String },
    Finished,
    Cancelled,
}

impl ProgressStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, ProgressStatus::Finished | ProgressStatus::Cancelled)
    }
}

#[derive(Debug)]
pub struct ProgressSequencer {
    phases: Arc<[ProgressPhase]>,
    status: Arc<watch::Sender<ProgressStatus>>,
}

impl ProgressSequencer {
    pub fn new(phases: Vec<ProgressPhase>) -> Self {
        let (status, _) = watch::channel(ProgressStatus::NotStarted);
        Self {
            phases: phases.into(),
            status: Arc::new(status),
        }
    }

    pub fn phases(&self) -> &[ProgressPhase] {
        &self.phases
    }

    pub fn total_duration(&self) -> Duration {
        self.phases.iter().map(|phase| phase.min_duration).sum()
    }

    pub fn status(&self) -> ProgressStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressStatus> {
        self.status.subscribe()
    }

    /// Plays the phases from the first one. The first label is visible as
    /// soon as this returns.
    pub fn start(&self) -> ProgressRun {
        let phases = Arc::clone(&self.phases);
        let status = Arc::clone(&self.status);
        status.send_replace(match phases.first() {
            Some(first) => ProgressStatus::Playing {
                index: 0,
                label: first.label.clone(),
            },
            None => ProgressStatus::Finished,
        });

        let task_status = Arc::clone(&status);
        let task: JoinHandle<()> = tokio::spawn(async move {
            for (index, phase) in phases.iter().enumerate() {
                let playing = ProgressStatus::Playing {
                    index,
                    label: phase.label.clone(),
                };
                if !advance(&task_status, playing) {
                    return;
                }
                tokio::time::sleep(phase.min_duration).await;
            }
            if advance(&task_status, ProgressStatus::Finished) {
                debug!("progress: all phases shown");
            }
        });

        ProgressRun {
            status: status.subscribe(),
            canceller: ProgressCanceller {
                abort: task.abort_handle(),
                status,
            },
        }
    }
}

/// Handle to one playback. Dropping it stops the timer.
#[derive(Debug)]
pub struct ProgressRun {
    status: watch::Receiver<ProgressStatus>,
    canceller: ProgressCanceller,
}

impl ProgressRun {
    /// Waits until every phase has been shown. Returns `false` if playback was
    /// cancelled first.
    pub async fn wait_finished(&mut self) -> bool {
        match self.status.wait_for(ProgressStatus::is_settled).await {
            Ok(status) => *status == ProgressStatus::Finished,
            Err(_) => false,
        }
    }

    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn canceller(&self) -> ProgressCanceller {
        self.canceller.clone()
    }
}

impl Drop for ProgressRun {
    fn drop(&mut self) {
        self.canceller.cancel();
    }
}

/// Moves playback forward unless it was cancelled in the meantime.
fn advance(status: &watch::Sender<ProgressStatus>, next: ProgressStatus) -> bool {
    status.send_if_modified(|current| {
        if *current == ProgressStatus::Cancelled {
            false
        } else {
            *current = next;
            true
        }
    })
}

#[derive(Debug, Clone)]
pub struct ProgressCanceller {
    abort: AbortHandle,
    status: Arc<watch::Sender<ProgressStatus>>,
}

impl ProgressCanceller {
    /// Stops the timer. A playback that already finished stays finished.
    pub fn cancel(&self) {
        // A finished task no longer owns the shared status.
        if self.abort.is_finished() {
            return;
        }
        self.abort.abort();
        let cancelled = self.status.send_if_modified(|status| {
            if matches!(status, ProgressStatus::Playing { .. }) {
                *status = ProgressStatus::Cancelled;
                true
            } else {
                false
            }
        });
        if cancelled {
            debug!("progress: playback cancelled");
        }
    }
}

#[cfg(test)]
#[path = "tests/progress_tests.rs"]
mod tests;
