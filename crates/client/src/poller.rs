//! Client-side status polling.
//!
//! [`observe`] turns a run id into a stream of status snapshots, one per
//! interval tick, ending right after the first snapshot that carries an
//! image URL. [`spawn`] drives that stream on a background task and hands
//! back a [`PollHandle`] for the single completion and for cancellation.
//!
//! Polling has no overall deadline: a run the provider never finishes is
//! polled until the caller cancels.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dreamrun_core::run::RunView;
use dreamrun_core::types::RunId;
use futures::{Stream, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::api::{ClientError, DreamrunClient};

/// Default time between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5_000);

/// A failed status check. Never surfaces from [`observe`]; failed ticks are
/// logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Status unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can report a run's current state.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, run_id: &str) -> Result<RunView, PollError>;
}

#[async_trait]
impl StatusSource for DreamrunClient {
    async fn fetch(&self, run_id: &str) -> Result<RunView, PollError> {
        Ok(self.status(run_id).await?)
    }
}

struct ObserveState<S: ?Sized> {
    source: Arc<S>,
    run_id: RunId,
    every: Duration,
    ticker: Option<Interval>,
    finished: bool,
}

fn new_ticker(every: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Stream of snapshots for `run_id`, one per successful tick.
///
/// Nothing happens until the stream is first polled; the first check is
/// one interval after that. The stream ends after yielding a snapshot with
/// an image URL. Dropping it stops the timer. Calling `observe` again
/// starts an independent stream.
pub fn observe<S>(
    source: Arc<S>,
    run_id: impl Into<RunId>,
    every: Duration,
) -> impl Stream<Item = RunView> + Send + 'static
where
    S: StatusSource + ?Sized + 'static,
{
    let state = ObserveState {
        source,
        run_id: run_id.into(),
        every,
        ticker: None,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        let mut ticker = state.ticker.take().unwrap_or_else(|| new_ticker(state.every));
        loop {
            ticker.tick().await;
            match state.source.fetch(&state.run_id).await {
                Ok(view) => {
                    if view.image_url.is_some() {
                        state.finished = true;
                    } else {
                        state.ticker = Some(ticker);
                    }
                    return Some((view, state));
                }
                Err(e) => {
                    tracing::debug!(
                        run_id = %state.run_id,
                        error = %e,
                        "Status check failed, waiting for next tick",
                    );
                }
            }
        }
    })
}

/// A background poller started by [`spawn`].
///
/// Dropping the handle cancels the poller; it never outlives its owner.
pub struct PollHandle {
    run_id: RunId,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
    task: JoinHandle<()>,
    completion: Option<oneshot::Receiver<RunView>>,
}

impl PollHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Wait for the completed snapshot.
    ///
    /// Yields the snapshot the first time it is awaited after completion.
    /// Returns `None` if the poller was cancelled or on any later call.
    pub async fn completed(&mut self) -> Option<RunView> {
        let receiver = self.completion.as_mut()?;
        let outcome = receiver.await.ok();
        self.completion = None;
        outcome
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling. Returns once the task, and with it the timer, is gone.
    pub async fn cancel(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(run_id = %self.run_id, error = %e, "Poller task ended abnormally");
        }
    }
}

/// Poll `run_id` on a background task until it completes or is cancelled.
pub fn spawn<S>(source: Arc<S>, run_id: impl Into<RunId>, every: Duration) -> PollHandle
where
    S: StatusSource + ?Sized + 'static,
{
    let run_id: RunId = run_id.into();
    let cancel = CancellationToken::new();
    let (tx, rx) = oneshot::channel();

    let token = cancel.clone();
    let task_run_id = run_id.clone();
    let task = tokio::spawn(async move {
        let mut snapshots = Box::pin(observe(source, task_run_id.clone(), every));
        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::debug!(run_id = %task_run_id, "Poller cancelled");
                    return;
                }
                next = snapshots.next() => match next {
                    Some(view) if view.image_url.is_some() => {
                        tracing::info!(run_id = %task_run_id, "Run complete");
                        if tx.send(view).is_err() {
                            tracing::debug!(
                                run_id = %task_run_id,
                                "Completion receiver already gone, dropping snapshot",
                            );
                        }
                        return;
                    }
                    Some(view) => {
                        tracing::debug!(
                            run_id = %task_run_id,
                            status = view.status.as_str(),
                            "Run still pending",
                        );
                    }
                    None => return,
                }
            }
        }
    });

    PollHandle {
        run_id,
        _cancel_on_drop: cancel.clone().drop_guard(),
        cancel,
        task,
        completion: Some(rx),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use dreamrun_core::run::RunStatus;

    use super::*;

    const EVERY: Duration = Duration::from_millis(5_000);

    /// Completes on call `complete_on`; fails on call `fail_on`.
    struct Scripted {
        calls: AtomicUsize,
        complete_on: usize,
        fail_on: Option<usize>,
    }

    impl Scripted {
        fn new(complete_on: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                complete_on,
                fail_on: None,
            })
        }

        fn failing_on(complete_on: usize, fail_on: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                complete_on,
                fail_on: Some(fail_on),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for Scripted {
        async fn fetch(&self, run_id: &str) -> Result<RunView, PollError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(call) == self.fail_on {
                return Err(PollError::Unavailable("connection refused".into()));
            }
            let done = call >= self.complete_on;
            Ok(RunView {
                run_id: run_id.to_string(),
                status: if done { RunStatus::Complete } else { RunStatus::Pending },
                image_url: done.then(|| format!("https://cdn.test/{call}.png")),
                created_at: Utc::now(),
                completed_at: done.then(Utc::now),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stream_ends_after_first_complete_snapshot() {
        let source = Scripted::new(3);

        let snapshots: Vec<RunView> = observe(source.clone(), "run-1", EVERY).collect().await;

        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[2].image_url.as_deref(), Some("https://cdn.test/3.png"));
        assert_eq!(source.calls(), 3);

        tokio::time::sleep(EVERY * 10).await;
        assert_eq!(source.calls(), 3, "no tick after completion");
    }

    #[tokio::test(start_paused = true)]
    async fn stream_is_lazy() {
        let source = Scripted::new(1);
        let snapshots = observe(source.clone(), "run-1", EVERY);

        tokio::time::sleep(EVERY * 5).await;
        assert_eq!(source.calls(), 0);
        drop(snapshots);
    }

    #[tokio::test(start_paused = true)]
    async fn first_check_waits_one_interval() {
        let source = Scripted::new(1);
        let started = Instant::now();

        let snapshots: Vec<RunView> = observe(source, "run-1", EVERY).collect().await;

        assert_eq!(snapshots.len(), 1);
        assert!(started.elapsed() >= EVERY);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tick_is_skipped() {
        let source = Scripted::failing_on(3, 2);

        let snapshots: Vec<RunView> = observe(source.clone(), "run-1", EVERY).collect().await;

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].status, RunStatus::Pending);
        assert_eq!(snapshots[1].status, RunStatus::Complete);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_can_be_restarted() {
        let source = Scripted::new(1);

        let first: Vec<RunView> = observe(source.clone(), "run-1", EVERY).collect().await;
        let second: Vec<RunView> = observe(source.clone(), "run-1", EVERY).collect().await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_poller_completes_exactly_once() {
        let source = Scripted::new(3);
        let mut handle = spawn(source.clone(), "run-1", EVERY);

        let view = handle.completed().await.expect("completion");
        assert_eq!(view.image_url.as_deref(), Some("https://cdn.test/3.png"));
        assert_eq!(source.calls(), 3);

        tokio::time::sleep(EVERY * 10).await;
        assert_eq!(source.calls(), 3, "no fourth tick");
        assert!(handle.completed().await.is_none());
        assert!(handle.is_finished());
        handle.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_completion_stops_ticks() {
        let source = Scripted::new(100);
        let handle = spawn(source.clone(), "run-1", EVERY);

        tokio::time::sleep(EVERY * 2 + EVERY / 2).await;
        assert_eq!(source.calls(), 2);

        handle.cancel().await;
        tokio::time::sleep(EVERY * 10).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_ticks() {
        let source = Scripted::new(100);
        let handle = spawn(source.clone(), "run-1", EVERY);

        tokio::time::sleep(EVERY * 2 + EVERY / 5).await;
        assert_eq!(source.calls(), 2);

        drop(handle);
        tokio::time::sleep(EVERY * 10).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_survives_dropped_receiver() {
        let source = Scripted::new(2);
        let mut handle = spawn(source.clone(), "run-1", EVERY);
        handle.completion = None;

        tokio::time::sleep(EVERY * 3).await;
        assert_eq!(source.calls(), 2);
        assert!(handle.is_finished());
        handle.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_poller_reports_no_completion() {
        let source = Scripted::new(100);
        let mut handle = spawn(source, "run-1", EVERY);

        handle.cancel.cancel();
        assert!(handle.completed().await.is_none());
        handle.cancel().await;
    }
}
