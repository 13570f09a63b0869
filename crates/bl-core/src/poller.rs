//! Job status polling.
//!
//! A [`JobPoller`] tracks one job at a time. The first status request is
//! issued as soon as a job id is set (and polling is enabled); every later
//! request is scheduled `poll_interval` after the previous response has been
//! applied, so a single poller never has two requests in flight.
//!
//! Reconfiguring the poller (new job id, enable/disable, new interval) or
//! dropping it cancels the running loop. Responses that were already in
//! flight are discarded: each loop carries the epoch it was started under and
//! may only touch the snapshot while that epoch is current.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::JobKind;
use crate::error::PollError;
use crate::job::{JobSnapshot, JobStatus, JobStatusResponse, RemoteJobStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Read-only job status endpoint. Must be safe to call repeatedly.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str, kind: JobKind)
    -> Result<JobStatusResponse, PollError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub enabled: bool,
    pub kind: JobKind,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            enabled: true,
            kind: JobKind::default(),
        }
    }
}

pub type CompleteHook = Arc<dyn Fn(&Value) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Default)]
struct Hooks {
    on_complete: Option<CompleteHook>,
    on_error: Option<ErrorHook>,
}

struct Shared {
    epoch: u64,
    snapshot: watch::Sender<JobSnapshot>,
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct JobPoller {
    source: Arc<dyn JobStatusSource>,
    config: PollerConfig,
    job_id: Option<String>,
    hooks: Hooks,
    shared: Arc<Mutex<Shared>>,
    task: Option<PollTask>,
}

impl JobPoller {
    pub fn new(source: Arc<dyn JobStatusSource>, config: PollerConfig) -> Self {
        let (snapshot, _) = watch::channel(JobSnapshot::default());

        Self {
            source,
            config,
            job_id: None,
            hooks: Hooks::default(),
            shared: Arc::new(Mutex::new(Shared { epoch: 0, snapshot })),
            task: None,
        }
    }

    /// Called once with the result payload when the job completes.
    /// Takes effect for loops started after this call. Runs while the
    /// poller's state is locked, so it must not call back into the poller.
    pub fn on_complete(mut self, hook: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.hooks.on_complete = Some(Arc::new(hook));
        self
    }

    /// Called once with the failure message when the job fails. Same
    /// locking rule as [`on_complete`](Self::on_complete).
    pub fn on_error(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.hooks.on_error = Some(Arc::new(hook));
        self
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Track a different job, or none. Must be called inside a Tokio runtime.
    pub fn set_job(&mut self, job_id: Option<String>) {
        if self.job_id == job_id {
            return;
        }
        self.job_id = job_id;
        self.restart(true);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled == enabled {
            return;
        }
        self.config.enabled = enabled;
        self.restart(false);
    }

    pub fn set_poll_interval(&mut self, poll_interval: Duration) {
        if self.config.poll_interval == poll_interval {
            return;
        }
        self.config.poll_interval = poll_interval;
        self.restart(false);
    }

    /// Tear down the running loop. Nothing in flight is applied afterwards.
    pub fn stop(&mut self) {
        self.halt_task();
        lock(&self.shared).epoch += 1;
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    pub fn snapshot(&self) -> JobSnapshot {
        lock(&self.shared).snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        lock(&self.shared).snapshot.subscribe()
    }

    fn halt_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            task.handle.abort();
        }
    }

    fn restart(&mut self, reset: bool) {
        self.halt_task();

        let job_id = self.job_id.clone().filter(|_| self.config.enabled);

        let epoch = {
            let mut shared = lock(&self.shared);
            shared.epoch += 1;
            shared.snapshot.send_modify(|snapshot| {
                if reset {
                    *snapshot = JobSnapshot::default();
                }
                snapshot.status = if job_id.is_some() {
                    JobStatus::Polling
                } else {
                    JobStatus::Idle
                };
            });
            shared.epoch
        };

        let Some(job_id) = job_id else {
            debug!(enabled = self.config.enabled, "Poller idle");
            return;
        };

        let cancel = CancellationToken::new();
        let run = PollLoop {
            source: self.source.clone(),
            shared: self.shared.clone(),
            hooks: self.hooks.clone(),
            job_id,
            kind: self.config.kind,
            interval: self.config.poll_interval,
            epoch,
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(run.run());

        self.task = Some(PollTask { cancel, handle });
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Flow {
    Continue,
    Halt,
}

enum Outcome {
    Progress,
    Completed(Option<Value>),
    Failed(Option<String>),
    Ignored,
    Transient,
}

struct PollLoop {
    source: Arc<dyn JobStatusSource>,
    shared: Arc<Mutex<Shared>>,
    hooks: Hooks,
    job_id: String,
    kind: JobKind,
    interval: Duration,
    epoch: u64,
    cancel: CancellationToken,
}

impl PollLoop {
    async fn run(self) {
        info!(job_id = %self.job_id, kind = %self.kind, "Polling job status");

        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = self.source.fetch_status(&self.job_id, self.kind) => result,
            };

            match self.apply(result) {
                Some(Flow::Continue) => {}
                Some(Flow::Halt) | None => return,
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Returns `None` when the loop has been superseded.
    fn apply(&self, result: Result<JobStatusResponse, PollError>) -> Option<Flow> {
        // Held until the hooks have returned, so no hook of this loop fires
        // once `stop` or a reconfiguration has returned.
        let shared = lock(&self.shared);
        if shared.epoch != self.epoch || self.cancel.is_cancelled() {
            debug!(job_id = %self.job_id, "Discarding stale job status");
            return None;
        }

        let outcome = match result {
            Ok(resp) => match resp.status {
                RemoteJobStatus::Completed => {
                    shared.snapshot.send_modify(|snapshot| {
                        snapshot.status = JobStatus::Completed;
                        snapshot.progress = 100;
                        snapshot.data = resp.data.clone();
                    });
                    Outcome::Completed(resp.data)
                }
                RemoteJobStatus::Failed => {
                    shared.snapshot.send_modify(|snapshot| {
                        snapshot.status = JobStatus::Failed;
                        snapshot.error = resp.error.clone();
                    });
                    Outcome::Failed(resp.error)
                }
                RemoteJobStatus::Active | RemoteJobStatus::Waiting => {
                    let progress = resp.progress.unwrap_or(0).min(100) as u8;
                    shared.snapshot.send_modify(|snapshot| {
                        snapshot.status = JobStatus::Polling;
                        snapshot.progress = progress;
                    });
                    debug!(job_id = %self.job_id, progress, "Job in progress");
                    Outcome::Progress
                }
                RemoteJobStatus::Unknown => Outcome::Ignored,
            },
            Err(err) => {
                warn!(job_id = %self.job_id, error = %err, "Job status fetch error");
                shared.snapshot.send_modify(|snapshot| {
                    snapshot.error = Some(err.to_string());
                });
                Outcome::Transient
            }
        };

        let flow = match outcome {
            Outcome::Completed(data) => {
                info!(job_id = %self.job_id, "Job completed");
                if let Some(hook) = &self.hooks.on_complete {
                    hook(data.as_ref().unwrap_or(&Value::Null));
                }
                Flow::Halt
            }
            Outcome::Failed(error) => {
                let message = error.as_deref().unwrap_or("Job failed");
                warn!(job_id = %self.job_id, error = message, "Job failed");
                if let Some(hook) = &self.hooks.on_error {
                    hook(message);
                }
                Flow::Halt
            }
            Outcome::Ignored => {
                debug!(job_id = %self.job_id, "Unrecognized job status, polling again");
                Flow::Continue
            }
            Outcome::Progress | Outcome::Transient => Flow::Continue,
        };
        drop(shared);

        Some(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst};

    use serde_json::json;
    use tokio::sync::Notify;
    use tokio::time::Instant;

    type Reply = Result<JobStatusResponse, PollError>;

    enum Step {
        Now(Reply),
        After(Duration, Reply),
        Gated(Arc<Notify>, Reply),
    }

    #[derive(Default)]
    struct FakeSource {
        script: Mutex<VecDeque<Step>>,
        calls: Mutex<Vec<(String, Instant)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn scripted(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn call_ids(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
        }
    }

    #[async_trait]
    impl JobStatusSource for FakeSource {
        async fn fetch_status(
            &self,
            job_id: &str,
            _kind: JobKind,
        ) -> Result<JobStatusResponse, PollError> {
            self.calls.lock().unwrap().push((job_id.to_string(), Instant::now()));
            let now = self.in_flight.fetch_add(1, SeqCst) + 1;
            self.max_in_flight.fetch_max(now, SeqCst);

            let step = self.script.lock().unwrap().pop_front();
            let reply = match step {
                Some(Step::Now(reply)) => reply,
                Some(Step::After(delay, reply)) => {
                    tokio::time::sleep(delay).await;
                    reply
                }
                Some(Step::Gated(gate, reply)) => {
                    gate.notified().await;
                    reply
                }
                None => Ok(JobStatusResponse::in_progress(RemoteJobStatus::Waiting, 0)),
            };

            self.in_flight.fetch_sub(1, SeqCst);
            reply
        }
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn active(progress: u32) -> Step {
        Step::Now(Ok(JobStatusResponse::in_progress(RemoteJobStatus::Active, progress)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_halts_polling() {
        let source = FakeSource::scripted(vec![
            Step::Now(Ok(JobStatusResponse::in_progress(RemoteJobStatus::Waiting, 0))),
            active(60),
            Step::Now(Ok(JobStatusResponse::completed(json!({ "modelUrl": "astronaut.glb" })))),
        ]);
        let completions = Arc::new(AtomicUsize::new(0));
        let hits = completions.clone();

        let mut poller = JobPoller::new(source.clone(), PollerConfig::default()).on_complete(
            move |data| {
                if data["modelUrl"] == "astronaut.glb" {
                    hits.fetch_add(1, SeqCst);
                }
            },
        );
        let mut rx = poller.subscribe();
        poller.set_job(Some("job-1".into()));

        let snapshot = rx.wait_for(|s| s.status.is_terminal()).await.unwrap().clone();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.data, Some(json!({ "modelUrl": "astronaut.glb" })));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 3);
        assert_eq!(completions.load(SeqCst), 1);
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_halts_and_keeps_error() {
        let source = FakeSource::scripted(vec![
            active(10),
            Step::Now(Ok(JobStatusResponse::failed("Mesh reconstruction failed"))),
        ]);
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();

        let mut poller = JobPoller::new(source.clone(), PollerConfig::default())
            .on_error(move |message| sink.lock().unwrap().push(message.to_string()));
        let mut rx = poller.subscribe();
        poller.set_job(Some("job-2".into()));

        let snapshot = rx.wait_for(|s| s.status.is_terminal()).await.unwrap().clone();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("Mesh reconstruction failed"));
        assert_eq!(snapshot.progress, 10);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(*reported.lock().unwrap(), vec!["Mesh reconstruction failed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_keeps_polling() {
        let source = FakeSource::scripted(vec![
            Step::Now(Err(PollError::Transport("connection reset".into()))),
            active(30),
            Step::Now(Ok(JobStatusResponse::completed(json!({})))),
        ]);
        let mut poller = JobPoller::new(source.clone(), PollerConfig::default());
        let mut rx = poller.subscribe();
        poller.set_job(Some("job-3".into()));

        let snapshot = rx.wait_for(|s| s.error.is_some()).await.unwrap().clone();
        assert_eq!(snapshot.status, JobStatus::Polling);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Job status request failed: connection reset")
        );

        let snapshot = rx.wait_for(|s| s.status.is_terminal()).await.unwrap().clone();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_status_changes_nothing() {
        let gate = Arc::new(Notify::new());
        let source = FakeSource::scripted(vec![
            active(40),
            Step::Now(Ok(JobStatusResponse::in_progress(RemoteJobStatus::Unknown, 90))),
            Step::Gated(gate.clone(), Ok(JobStatusResponse::completed(json!({})))),
        ]);
        let mut poller = JobPoller::new(source.clone(), PollerConfig::default());
        poller.set_job(Some("job-4".into()));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(source.calls(), 3);

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.status, JobStatus::Polling);
        assert_eq!(snapshot.progress, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_clamped_not_interpolated() {
        let gate = Arc::new(Notify::new());
        let source = FakeSource::scripted(vec![
            active(150),
            Step::Gated(gate, Ok(JobStatusResponse::completed(json!({})))),
        ]);
        let mut poller = JobPoller::new(source.clone(), PollerConfig::default());
        poller.set_job(Some("job-5".into()));
        settle().await;

        assert_eq!(poller.snapshot().progress, 100);
        assert_eq!(poller.snapshot().status, JobStatus::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_discards_in_flight_response() {
        let gate = Arc::new(Notify::new());
        let source = FakeSource::scripted(vec![Step::Gated(
            gate.clone(),
            Ok(JobStatusResponse::completed(json!({ "modelUrl": "late.glb" }))),
        )]);
        let completions = Arc::new(AtomicUsize::new(0));
        let hits = completions.clone();

        let mut poller = JobPoller::new(source.clone(), PollerConfig::default())
            .on_complete(move |_| {
                hits.fetch_add(1, SeqCst);
            });
        poller.set_job(Some("job-6".into()));
        settle().await;
        assert_eq!(source.calls(), 1);

        poller.set_enabled(false);
        gate.notify_one();
        settle().await;

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.status, JobStatus::Idle);
        assert_eq!(snapshot.progress, 0);
        assert!(snapshot.data.is_none());
        assert_eq!(completions.load(SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_change_discards_previous_job() {
        let gate = Arc::new(Notify::new());
        let source = FakeSource::scripted(vec![
            Step::Gated(
                gate.clone(),
                Ok(JobStatusResponse::completed(json!({ "job": "a" }))),
            ),
            active(25),
        ]);
        let mut poller = JobPoller::new(source.clone(), PollerConfig::default());
        poller.set_job(Some("a".into()));
        settle().await;

        poller.set_job(Some("b".into()));
        settle().await;
        gate.notify_one();
        settle().await;

        assert_eq!(source.call_ids(), vec!["a", "b"]);
        let snapshot = poller.snapshot();
        assert_eq!(snapshot.status, JobStatus::Polling);
        assert_eq!(snapshot.progress, 25);
        assert!(snapshot.data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_poll_scheduled_after_response() {
        let source = FakeSource::scripted(vec![
            Step::After(
                Duration::from_secs(5),
                Ok(JobStatusResponse::in_progress(RemoteJobStatus::Active, 10)),
            ),
            Step::After(
                Duration::from_secs(5),
                Ok(JobStatusResponse::in_progress(RemoteJobStatus::Active, 20)),
            ),
            Step::Now(Ok(JobStatusResponse::completed(json!({})))),
        ]);
        let mut poller = JobPoller::new(source.clone(), PollerConfig::default());
        let mut rx = poller.subscribe();
        poller.set_job(Some("job-7".into()));
        rx.wait_for(|s| s.status.is_terminal()).await.unwrap();

        let times = source.call_times();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_secs(7));
        assert_eq!(times[2] - times[1], Duration::from_secs(7));
        assert_eq!(source.max_in_flight.load(SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_restarts_without_reset() {
        let source = FakeSource::scripted(vec![active(30), active(40), active(50)]);
        let mut poller = JobPoller::new(source.clone(), PollerConfig::default());
        poller.set_job(Some("job-10".into()));
        settle().await;
        assert_eq!(source.calls(), 1);

        poller.set_poll_interval(Duration::from_secs(10));
        assert_eq!(poller.snapshot().progress, 30);
        settle().await;
        assert_eq!(source.calls(), 2);
        assert_eq!(poller.snapshot().progress, 40);

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(source.calls(), 2);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.calls(), 3);
        assert_eq!(poller.snapshot().progress, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_waits_for_running_hook() {
        let source = FakeSource::scripted(vec![Step::Now(Ok(JobStatusResponse::completed(
            json!({}),
        )))]);
        let (entered_tx, mut entered) = tokio::sync::mpsc::unbounded_channel();
        let finished = Arc::new(AtomicBool::new(false));
        let done = finished.clone();

        let mut poller =
            JobPoller::new(source, PollerConfig::default()).on_complete(move |_| {
                let _ = entered_tx.send(());
                std::thread::sleep(Duration::from_millis(50));
                done.store(true, SeqCst);
            });
        poller.set_job(Some("job-11".into()));

        entered.recv().await.unwrap();
        poller.stop();
        assert!(finished.load(SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_or_missing_job_stays_idle() {
        let source = FakeSource::scripted(vec![active(10)]);
        let config = PollerConfig {
            enabled: false,
            ..Default::default()
        };
        let mut poller = JobPoller::new(source.clone(), config);

        poller.set_job(Some("job-8".into()));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.calls(), 0);
        assert_eq!(poller.snapshot().status, JobStatus::Idle);

        poller.set_enabled(true);
        settle().await;
        assert_eq!(source.calls(), 1);
        assert_eq!(poller.snapshot().progress, 10);

        poller.set_job(None);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(poller.snapshot(), JobSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let source = FakeSource::scripted(vec![active(10)]);
        let mut poller = JobPoller::new(source.clone(), PollerConfig::default());
        poller.set_job(Some("job-9".into()));
        settle().await;
        drop(poller);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 1);
    }
}
