//! Background polling of one job's detail endpoint.
//!
//! A [`PollHandle`] owns the worker thread. Dropping or cancelling the handle
//! stops the loop; a result that arrives after cancellation is discarded
//! rather than delivered.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::api::{ApiClient, ApiError, JobRecord};

/// Something that can fetch a job snapshot by identity.
pub trait JobSource: Send + 'static {
    fn fetch_job(&self, job_id: &str) -> Result<JobRecord, ApiError>;
}

impl JobSource for ApiClient {
    fn fetch_job(&self, job_id: &str) -> Result<JobRecord, ApiError> {
        self.job_detail(job_id)
    }
}

/// Outcome of one fetch, sent from the worker to the handle's owner.
#[derive(Clone, Debug, PartialEq)]
pub enum PollEvent {
    Fetched { job_id: String, job: JobRecord },
    /// 404: the job does not exist. Polling has stopped.
    NotFound { job_id: String },
    /// Any other failure. Polling carries on at the next tick.
    FetchFailed { job_id: String, message: String },
}

impl PollEvent {
    pub fn job_id(&self) -> &str {
        match self {
            Self::Fetched { job_id, .. }
            | Self::NotFound { job_id }
            | Self::FetchFailed { job_id, .. } => job_id,
        }
    }
}

/// What the loop does after a fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollStep {
    /// Wait one interval and fetch again.
    Continue,
    Stop,
}

/// Poll again while the job is pending or processing, and after transient
/// failures. Stop on a terminal (or unrecognised) status and on 404.
pub fn next_step(result: &Result<JobRecord, ApiError>) -> PollStep {
    match result {
        Ok(job) if job.status.is_in_progress() => PollStep::Continue,
        Ok(job) if job.status.is_terminal() => PollStep::Stop,
        Ok(job) => {
            tracing::warn!("Job {} reported unrecognised status '{}'; polling stops", job.job_id, job.status);
            PollStep::Stop
        }
        Err(ApiError::NotFound) => PollStep::Stop,
        Err(_) => PollStep::Continue,
    }
}

/// Cancellable handle on a running poll loop.
pub struct PollHandle {
    job_id: String,
    cancel: Arc<AtomicBool>,
    // Dropping the sender wakes the worker out of its interval wait.
    wake_tx: Option<Sender<()>>,
    events: Receiver<PollEvent>,
    worker: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Fetch immediately, then every `interval` while the job is still moving.
    pub fn start<S: JobSource>(source: S, job_id: impl Into<String>, interval: Duration) -> Self {
        let job_id = job_id.into();
        let cancel = Arc::new(AtomicBool::new(false));
        let (wake_tx, wake_rx) = mpsc::channel::<()>();
        let (event_tx, events) = mpsc::channel();
        let worker = {
            let job_id = job_id.clone();
            let cancel = cancel.clone();
            thread::spawn(move || poll_loop(source, job_id, interval, cancel, wake_rx, event_tx))
        };
        tracing::debug!("Started polling job {job_id} every {interval:?}");
        Self {
            job_id,
            cancel,
            wake_tx: Some(wake_tx),
            events,
            worker: Some(worker),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn try_next(&self) -> Option<PollEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next event. `None` on timeout or once the loop has ended
    /// and every event was taken.
    pub fn next_timeout(&self, timeout: Duration) -> Option<PollEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// True once the worker has exited (stopped on its own or cancelled).
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    /// Stop the loop. No event produced after this call reaches the owner.
    pub fn cancel(&mut self) {
        if !self.cancel.swap(true, Ordering::Relaxed) {
            tracing::debug!("Cancelled polling job {}", self.job_id);
        }
        self.wake_tx.take();
        while self.events.try_recv().is_ok() {}
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
        // Detach: an in-flight request may take up to the read timeout to return,
        // and the worker will discard its result.
        self.worker.take();
    }
}

fn poll_loop<S: JobSource>(
    source: S,
    job_id: String,
    interval: Duration,
    cancel: Arc<AtomicBool>,
    wake_rx: Receiver<()>,
    events: Sender<PollEvent>,
) {
    loop {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let result = source.fetch_job(&job_id);
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let step = next_step(&result);
        let event = match result {
            Ok(job) => {
                tracing::debug!("Job {job_id} is {}", job.status);
                PollEvent::Fetched {
                    job_id: job_id.clone(),
                    job,
                }
            }
            Err(ApiError::NotFound) => {
                tracing::warn!("Job {job_id} not found");
                PollEvent::NotFound {
                    job_id: job_id.clone(),
                }
            }
            Err(err) => {
                tracing::warn!("Fetching job {job_id} failed: {err}");
                PollEvent::FetchFailed {
                    job_id: job_id.clone(),
                    message: err.to_string(),
                }
            }
        };
        if events.send(event).is_err() || step == PollStep::Stop {
            break;
        }
        match wake_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!("Stopped polling job {job_id}");
}
