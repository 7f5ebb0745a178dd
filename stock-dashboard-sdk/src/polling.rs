//! Periodic re-check of running tasks, reporting the ones that disappear.
//!
//! The loop refreshes task state every interval while anything is (or just
//! was) running, diffs the running-id set across the refresh and hands the
//! ids that vanished to a callback. It stops by itself once two consecutive
//! views are empty, or when the caller cancels it.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stock_dashboard_core::{disappeared_ids, TaskId};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SdkResult;

/// Something that can report and refresh the set of running tasks.
#[async_trait]
pub trait TaskSource: Send + Sync + 'static {
    /// Running task ids as of the last refresh.
    async fn running_ids(&self) -> BTreeSet<TaskId>;

    /// Re-fetches task state from the server.
    async fn refresh(&self) -> SdkResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Stopped,
}

/// Handle to a running poll loop. Dropping it leaves the loop running;
/// call [`cancel`](Self::cancel) to stop it.
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
    stopped: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl PollHandle {
    /// Stops the loop. An in-flight refresh is abandoned and its outcome is
    /// never reported.
    pub fn cancel(&self) {
        self.token.cancel();
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn state(&self) -> PollState {
        if self.stopped.load(Ordering::SeqCst) {
            PollState::Stopped
        } else {
            PollState::Polling
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that stops the loop when cancelled, for use from another task
    /// while [`wait`](Self::wait) owns the handle.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Waits for the loop to terminate.
    pub async fn wait(self) {
        if let Err(e) = self.join.await {
            warn!(error = %e, "Task poller ended abnormally");
        }
    }
}

/// Spawns the poll loop on the current runtime.
pub fn start_polling<S, F>(source: Arc<S>, interval: Duration, on_completed: F) -> PollHandle
where
    S: TaskSource,
    F: FnMut(Vec<TaskId>) + Send + 'static,
{
    let token = CancellationToken::new();
    let stopped = Arc::new(AtomicBool::new(false));

    let join = tokio::spawn(run(
        source,
        interval,
        token.clone(),
        Arc::clone(&stopped),
        on_completed,
    ));

    PollHandle {
        token,
        stopped,
        join,
    }
}

async fn run<S, F>(
    source: Arc<S>,
    period: Duration,
    token: CancellationToken,
    stopped: Arc<AtomicBool>,
    mut on_completed: F,
) where
    S: TaskSource,
    F: FnMut(Vec<TaskId>) + Send + 'static,
{
    let mut previous = source.running_ids().await;
    info!(running = previous.len(), "Task polling started");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("Task polling cancelled");
                break;
            }
            _ = ticker.tick() => {}
        }

        let before = source.running_ids().await;
        if previous.is_empty() && before.is_empty() {
            info!("No running tasks, task polling stopped");
            break;
        }

        let refreshed = tokio::select! {
            _ = token.cancelled() => {
                debug!("Task polling cancelled during refresh");
                break;
            }
            result = source.refresh() => result,
        };

        match refreshed {
            Ok(()) => {
                let after = source.running_ids().await;
                let completed = disappeared_ids(&before, &after);
                if !completed.is_empty() && !token.is_cancelled() {
                    info!(count = completed.len(), ids = ?completed, "Tasks completed");
                    on_completed(completed);
                }
                previous = after;
            }
            Err(e) => {
                warn!(error = %e, "Task polling refresh failed");
            }
        }
    }

    stopped.store(true, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves a scripted sequence of running-id sets, one per refresh.
    struct Scripted {
        current: Mutex<BTreeSet<TaskId>>,
        upcoming: Mutex<VecDeque<BTreeSet<TaskId>>>,
        refreshes: Mutex<usize>,
        failures_left: Mutex<usize>,
        refresh_delay: Duration,
    }

    impl Scripted {
        fn new(initial: &[i64], upcoming: Vec<Vec<i64>>) -> Arc<Self> {
            Self::slow(initial, upcoming, Duration::ZERO)
        }

        fn slow(initial: &[i64], upcoming: Vec<Vec<i64>>, refresh_delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                current: Mutex::new(ids(initial)),
                upcoming: Mutex::new(upcoming.iter().map(|s| ids(s)).collect()),
                refreshes: Mutex::new(0),
                failures_left: Mutex::new(0),
                refresh_delay,
            })
        }

        /// Like [`new`](Self::new), but the first `failures` refreshes error out
        /// and leave the running set as it was.
        fn flaky(initial: &[i64], failures: usize, upcoming: Vec<Vec<i64>>) -> Arc<Self> {
            let source = Self::new(initial, upcoming);
            *source.failures_left.lock().unwrap() = failures;
            source
        }

        fn refreshes(&self) -> usize {
            *self.refreshes.lock().unwrap()
        }
    }

    fn ids(raw: &[i64]) -> BTreeSet<TaskId> {
        raw.iter().copied().map(TaskId).collect()
    }

    #[async_trait]
    impl TaskSource for Scripted {
        async fn running_ids(&self) -> BTreeSet<TaskId> {
            self.current.lock().unwrap().clone()
        }

        async fn refresh(&self) -> SdkResult<()> {
            *self.refreshes.lock().unwrap() += 1;
            if !self.refresh_delay.is_zero() {
                tokio::time::sleep(self.refresh_delay).await;
            }
            {
                let mut failures = self.failures_left.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(SdkError::Transport("connection refused".to_string()));
                }
            }
            let next = self.upcoming.lock().unwrap().pop_front().unwrap_or_default();
            *self.current.lock().unwrap() = next;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_disappeared_ids_once() {
        let source = Scripted::new(&[1, 2], vec![vec![2], vec![]]);
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);

        let handle = start_polling(Arc::clone(&source), Duration::from_secs(3), move |done| {
            sink.lock().unwrap().push(done);
        });
        handle.wait().await;

        assert_eq!(
            *reported.lock().unwrap(),
            vec![vec![TaskId(1)], vec![TaskId(2)]]
        );
        // third tick sees two empty views in a row and stops without a request
        assert_eq!(source.refreshes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_immediately_when_idle() {
        let source = Scripted::new(&[], vec![]);
        let handle = start_polling(Arc::clone(&source), Duration::from_secs(3), |_| {
            panic!("no completions expected")
        });
        handle.wait().await;

        assert_eq!(source.refreshes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_refresh_drops_result() {
        let source = Scripted::slow(&[1], vec![vec![]], Duration::from_secs(60));
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);

        let handle = start_polling(Arc::clone(&source), Duration::from_secs(3), move |done| {
            sink.lock().unwrap().push(done);
        });

        // first tick at 3s starts a refresh that would take 60s
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(source.refreshes(), 1);
        assert_eq!(handle.state(), PollState::Polling);

        handle.cancel();
        assert_eq!(handle.state(), PollState::Stopped);
        handle.wait().await;

        assert!(reported.lock().unwrap().is_empty());
        assert_eq!(source.running_ids().await, ids(&[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_view() {
        let source = Scripted::flaky(&[1], 2, vec![vec![]]);
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);

        let handle = start_polling(Arc::clone(&source), Duration::from_secs(3), move |done| {
            sink.lock().unwrap().push(done);
        });

        // ticks at 3s and 6s both fail
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(source.refreshes(), 2);
        assert_eq!(handle.state(), PollState::Polling);
        assert!(reported.lock().unwrap().is_empty());
        assert_eq!(source.running_ids().await, ids(&[1]));

        handle.wait().await;

        assert_eq!(*reported.lock().unwrap(), vec![vec![TaskId(1)]]);
        assert_eq!(source.refreshes(), 3);
    }
}
