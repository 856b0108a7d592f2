//! Owns one submission attempt: form state, field errors and the in-flight request.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::api::CreatedJob;

use super::form::{IntakeError, SequencingMode, StagedFile, SubmissionForm};
use super::submitter::{JobSubmitter, SubmissionError};
use super::validation::{self, FormField, ValidationErrors};

/// Shown when the upload worker went away without reporting back.
pub const WORKER_LOST: &str = "Submission stopped unexpectedly; please try again";

#[derive(Debug)]
struct SubmitResult {
    result: Result<CreatedJob, SubmissionError>,
}

/// Where the submission currently stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitPhase {
    Editing,
    /// A request is in flight; further submits are ignored.
    Submitting,
    Submitted(CreatedJob),
}

pub struct SubmitController {
    submitter: JobSubmitter,
    form: SubmissionForm,
    errors: ValidationErrors,
    /// Receiver for the in-flight request; the worker holds the only sender.
    pending: Option<Receiver<SubmitResult>>,
    submitted: Option<CreatedJob>,
}

impl SubmitController {
    pub fn new(submitter: JobSubmitter, form: SubmissionForm) -> Self {
        Self {
            submitter,
            form,
            errors: ValidationErrors::default(),
            pending: None,
            submitted: None,
        }
    }

    pub fn form(&self) -> &SubmissionForm {
        &self.form
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn phase(&self) -> SubmitPhase {
        match (&self.submitted, self.is_submitting()) {
            (Some(created), _) => SubmitPhase::Submitted(created.clone()),
            (None, true) => SubmitPhase::Submitting,
            (None, false) => SubmitPhase::Editing,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn set_project_name(&mut self, value: impl Into<String>) {
        self.form.project_name = value.into();
        self.errors.clear(FormField::ProjectName);
    }

    pub fn set_email(&mut self, value: impl Into<String>) {
        self.form.email = value.into();
        self.errors.clear(FormField::Email);
    }

    pub fn set_sequencing_mode(&mut self, mode: SequencingMode) {
        self.form.sequencing_mode = mode;
    }

    pub fn set_notify_by_email(&mut self, notify: bool) {
        self.form.notify_by_email = notify;
    }

    pub fn set_use_sample_data(&mut self, use_sample_data: bool) {
        self.form.use_sample_data = use_sample_data;
        if use_sample_data {
            self.errors.clear(FormField::Files);
        }
    }

    /// Add one batch of files; a refused batch leaves the form untouched and
    /// reports through the `files` slot.
    pub fn add_files(&mut self, batch: Vec<StagedFile>) -> Result<usize, IntakeError> {
        match self.form.add_files(batch) {
            Ok(added) => {
                self.errors.clear(FormField::Files);
                Ok(added)
            }
            Err(err) => {
                self.errors.set(FormField::Files, err.to_string());
                Err(err)
            }
        }
    }

    pub fn add_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<usize, IntakeError> {
        let batch = paths
            .iter()
            .map(StagedFile::from_path)
            .collect::<Result<Vec<_>, _>>();
        match batch {
            Ok(batch) => self.add_files(batch),
            Err(err) => {
                self.errors.set(FormField::Files, err.to_string());
                Err(err)
            }
        }
    }

    pub fn remove_file(&mut self, index: usize) -> Option<StagedFile> {
        self.form.remove_file(index)
    }

    /// Validate and, if the form is clean, start the upload in the background.
    ///
    /// Returns `false` without doing anything while a request is already in
    /// flight or after a job was created.
    pub fn submit(&mut self) -> bool {
        if self.is_submitting() || self.submitted.is_some() {
            return false;
        }
        self.errors = validation::validate(&self.form);
        if !self.errors.is_valid() {
            tracing::debug!("Submission blocked by {} field error(s)", self.errors.len());
            return false;
        }
        let submitter = self.submitter.clone();
        let form = self.form.clone();
        self.pending = Some(spawn_worker(move || submitter.submit(&form)));
        true
    }

    /// Apply a finished request without blocking.
    pub fn poll_messages(&mut self) {
        let Some(rx) = &self.pending else {
            return;
        };
        match rx.try_recv() {
            Ok(message) => self.apply(message),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => self.worker_lost(),
        }
    }

    /// Block until the in-flight request finishes or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> SubmitPhase {
        if let Some(rx) = &self.pending {
            match rx.recv_timeout(timeout) {
                Ok(message) => self.apply(message),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.worker_lost(),
            }
        }
        self.phase()
    }

    /// Back to an empty form for another submission, keeping mode and notification choice.
    pub fn reset(&mut self) {
        self.form = SubmissionForm::new(self.form.sequencing_mode, self.form.notify_by_email);
        self.errors = ValidationErrors::default();
        self.submitted = None;
        self.pending = None;
    }

    fn worker_lost(&mut self) {
        tracing::error!("Upload worker exited without a result");
        self.pending = None;
        self.errors.set(FormField::Files, WORKER_LOST);
    }

    fn apply(&mut self, message: SubmitResult) {
        self.pending = None;
        match message.result {
            Ok(created) => {
                self.errors = ValidationErrors::default();
                self.submitted = Some(created);
            }
            Err(SubmissionError::Invalid(errors)) => self.errors = errors,
            Err(err) => self.errors.set(FormField::Files, err.to_string()),
        }
    }
}

/// Run `job` on its own thread. The returned receiver disconnects without a
/// message if the thread dies before sending.
fn spawn_worker<F>(job: F) -> Receiver<SubmitResult>
where
    F: FnOnce() -> Result<CreatedJob, SubmissionError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = job();
        let _ = tx.send(SubmitResult { result });
    });
    rx
}
