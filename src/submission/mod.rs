//! Building, checking and sending a job submission.

mod controller;
mod form;
pub mod pairing;
mod submitter;
pub mod validation;

pub use controller::{SubmitController, SubmitPhase};
pub use form::{
    ACCEPTED_EXTENSIONS, IntakeError, SequencingMode, StagedFile, SubmissionForm,
    UploadedFileDescriptor, is_accepted_upload,
};
pub use pairing::{NamedFile, ReadRole};
pub use submitter::{JobSubmitter, SubmissionError, request_body};
pub use validation::{FormField, ValidationErrors, validate};
