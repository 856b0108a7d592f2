//! Library exports for the command-line client and integration tests.
/// Submission and job-status calls against the analysis server.
pub mod api;
/// Application directory helpers.
pub mod app_dirs;
/// Command-line parsing, dispatch and text rendering.
pub mod cli;
/// Persisted client settings.
pub mod config;
/// Shared HTTP agent and bounded body reads.
pub mod http_client;
/// Logging setup.
pub mod logging;
/// Status labels, colours, sizes and result artifacts for display.
pub mod presenter;
/// Upload form, pairing of read files, validation and submission.
pub mod submission;
/// Polling a job until it settles.
pub mod tracking;
