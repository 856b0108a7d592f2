use thiserror::Error;

use crate::api::{ApiClient, ApiError, CreatedJob, UploadForm};

use super::form::SubmissionForm;
use super::validation::{self, ValidationErrors};

/// Why a submission produced no job.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Please correct the highlighted fields")]
    Invalid(ValidationErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Turns a validated form into one upload request.
///
/// Every call creates a new job; guarding against double submission is up to
/// the caller.
#[derive(Clone, Debug)]
pub struct JobSubmitter {
    client: ApiClient,
}

impl JobSubmitter {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn submit(&self, form: &SubmissionForm) -> Result<CreatedJob, SubmissionError> {
        let errors = validation::validate(form);
        if !errors.is_valid() {
            return Err(SubmissionError::Invalid(errors));
        }
        let body = request_body(form);
        tracing::info!(
            "Submitting project '{}' ({}, {} file(s), sample data: {})",
            form.project_name.trim(),
            form.sequencing_mode.as_str(),
            body.file_names().len(),
            form.use_sample_data
        );
        match self.client.create_job(body) {
            Ok(created) => {
                tracing::info!("Job {} created with status {}", created.job_id, created.status);
                Ok(created)
            }
            Err(err) => {
                tracing::warn!("Submission failed: {err}");
                Err(err.into())
            }
        }
    }
}

/// Upload fields for the job endpoint. Files are attached in form order
/// and only when the user's own data is being analysed.
pub fn request_body(form: &SubmissionForm) -> UploadForm {
    let mut body = UploadForm::new();
    body.text("project_name", form.project_name.trim())
        .text("email", form.email.trim())
        .text("data_type", form.sequencing_mode.as_str())
        .text("send_email", bool_field(form.notify_by_email))
        .text("use_test_data", bool_field(form.use_sample_data));
    if !form.use_sample_data {
        for file in form.files() {
            body.file("files", file.name(), file.path());
        }
    }
    body
}

fn bool_field(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
