use crate::controller::RateRefreshController;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Handle to the refresh loop started by [`RateRefreshController::start`].
///
/// Dropping the handle stops the loop.
pub struct RefreshHandle {
    manual: mpsc::UnboundedSender<()>,
    stopped: AtomicBool,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub(crate) fn spawn(controller: Arc<RateRefreshController>, interval: Duration) -> Self {
        let (manual, mut requests) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            // the first tick completes immediately
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => debug!("Scheduled rate refresh"),
                    request = requests.recv() => match request {
                        Some(()) => debug!("Manual rate refresh requested"),
                        None => break,
                    },
                }

                // cycles run detached so the timer keeps its schedule
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    let _ = controller.refresh().await;
                });
            }
        });

        info!("Rate refresh loop started, interval {:?}", interval);

        Self {
            manual,
            stopped: AtomicBool::new(false),
            task,
        }
    }

    /// Ask for a refresh outside the schedule. Returns `false` once stopped.
    pub fn request_refresh(&self) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }
        self.manual.send(()).is_ok()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Cancel the timer and stop accepting manual refresh requests.
    ///
    /// A cycle that is already running is left to finish.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.task.abort();
            info!("Rate refresh loop stopped");
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
