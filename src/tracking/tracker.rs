//! Owner-side view of one tracked job, fed by a background poll loop.

use std::time::Duration;

use crate::api::JobRecord;

use super::poller::{JobSource, PollEvent, PollHandle};

/// What a status screen should show right now.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JobView<'a> {
    /// Nothing fetched yet.
    Loading,
    NotFound { job_id: &'a str },
    /// No snapshot yet and the last fetch failed; polling continues.
    Unavailable { message: &'a str },
    /// Latest snapshot, plus the error from the most recent fetch if it failed.
    Job {
        job: &'a JobRecord,
        fetch_error: Option<&'a str>,
    },
}

/// Holds the read-only snapshot of one tracked job and the poll loop feeding it.
///
/// Switching to another job or dropping the tracker cancels the loop.
pub struct JobTracker<S: JobSource + Clone> {
    source: S,
    interval: Duration,
    job_id: Option<String>,
    job: Option<JobRecord>,
    fetch_error: Option<String>,
    not_found: bool,
    handle: Option<PollHandle>,
}

impl<S: JobSource + Clone> JobTracker<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            job_id: None,
            job: None,
            fetch_error: None,
            not_found: false,
            handle: None,
        }
    }

    /// Start tracking `job_id`. Re-tracking the current job is a no-op.
    pub fn track(&mut self, job_id: &str) {
        if self.job_id.as_deref() == Some(job_id) && self.handle.is_some() {
            return;
        }
        self.stop();
        self.job_id = Some(job_id.to_string());
        self.job = None;
        self.fetch_error = None;
        self.not_found = false;
        self.handle = Some(PollHandle::start(
            self.source.clone(),
            job_id,
            self.interval,
        ));
    }

    /// Cancel the poll loop, keeping the last snapshot.
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn job(&self) -> Option<&JobRecord> {
        self.job.as_ref()
    }

    /// True while the loop may still produce events.
    pub fn is_polling(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// True when nothing further will change: the loop is gone and its events are applied.
    pub fn is_settled(&self) -> bool {
        self.handle.is_none()
    }

    /// Apply every event that is already waiting. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.handle.as_ref().and_then(PollHandle::try_next) {
            self.apply(event);
            applied += 1;
        }
        self.release_finished_handle();
        applied
    }

    /// Block up to `timeout` for the next event, then apply everything waiting.
    /// Returns `true` when the view changed.
    pub fn wait_for_update(&mut self, timeout: Duration) -> bool {
        let Some(first) = self.handle.as_ref().and_then(|handle| handle.next_timeout(timeout)) else {
            self.release_finished_handle();
            return false;
        };
        self.apply(first);
        self.pump();
        true
    }

    pub fn view(&self) -> JobView<'_> {
        if self.not_found {
            return JobView::NotFound {
                job_id: self.job_id.as_deref().unwrap_or_default(),
            };
        }
        match (&self.job, &self.fetch_error) {
            (Some(job), error) => JobView::Job {
                job,
                fetch_error: error.as_deref(),
            },
            (None, Some(message)) => JobView::Unavailable { message },
            (None, None) => JobView::Loading,
        }
    }

    fn apply(&mut self, event: PollEvent) {
        if self.job_id.as_deref() != Some(event.job_id()) {
            return;
        }
        match event {
            PollEvent::Fetched { job, .. } => {
                self.job = Some(job);
                self.fetch_error = None;
            }
            PollEvent::NotFound { .. } => {
                self.not_found = true;
                self.job = None;
                self.stop();
            }
            PollEvent::FetchFailed { message, .. } => {
                self.fetch_error = Some(message);
            }
        }
    }

    fn release_finished_handle(&mut self) {
        let finished = self.handle.as_ref().is_some_and(PollHandle::is_finished);
        if finished {
            // Events sent just before exit are still queued.
            while let Some(event) = self.handle.as_ref().and_then(PollHandle::try_next) {
                self.apply(event);
            }
            self.handle = None;
        }
    }
}
