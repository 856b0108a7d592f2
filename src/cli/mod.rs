//! Command-line front end: parse, load settings, dispatch, print.

pub mod args;
pub mod render;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::app_dirs::{self, AppDirError};
use crate::config::{self, ClientSettings, ConfigError};
use crate::presenter;
use crate::submission::{JobSubmitter, SubmissionForm, SubmitController, SubmitPhase};
use crate::tracking::{JobTracker, JobView};

pub use args::{ArgsError, Command, ConfigArgs, Invocation, SubmitArgs, help_text, parse_args};

/// How long one `track` iteration waits for news before re-checking the loop.
const TRACK_WAKE: Duration = Duration::from_millis(500);
const SUBMIT_WAKE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Args(#[from] ArgsError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error("Submission not sent: {0} field(s) need attention")]
    InvalidForm(usize),
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),
    #[error("Job {0} has no HTML report")]
    NoReport(String),
    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to open {url}: {source}")]
    OpenBrowser {
        url: String,
        source: std::io::Error,
    },
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Run one parsed invocation, writing command output to `out`.
pub fn run(invocation: Invocation, out: &mut dyn Write) -> Result<(), CliError> {
    let Invocation { base_url, command } = invocation;
    match command {
        Command::Help => {
            out.write_all(help_text().as_bytes())?;
            Ok(())
        }
        Command::Config(changes) => run_config(changes, out),
        command => {
            let settings = config::load_or_default()?;
            let client = client_for(&settings, base_url.as_deref())?;
            dispatch(command, &settings, &client, out)
        }
    }
}

/// Build the API client, letting `--base-url` win over settings and environment.
pub fn client_for(settings: &ClientSettings, base_url: Option<&str>) -> Result<ApiClient, ConfigError> {
    let base = match base_url {
        Some(raw) => config::parse_base_url(raw)?,
        None => settings.base_url()?,
    };
    tracing::debug!("Using analysis server {base}");
    Ok(ApiClient::new(base, settings.timeouts()))
}

fn dispatch(
    command: Command,
    settings: &ClientSettings,
    client: &ApiClient,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Submit(args) => {
            let track = args.track;
            let job_id = submit(args, settings, client, out)?;
            if track {
                track_job(client, &job_id, settings.poll_interval(), out)?;
            }
            Ok(())
        }
        Command::Track { job_id } => track_job(client, &job_id, settings.poll_interval(), out),
        Command::Status { job_id } => {
            let snapshot = client.job_status(&job_id)?;
            out.write_all(render::render_status(&snapshot).as_bytes())?;
            Ok(())
        }
        Command::Results { job_id } => {
            let result = client.job_results(&job_id)?;
            out.write_all(render::render_results(&result, client.endpoints()).as_bytes())?;
            Ok(())
        }
        Command::Bacteria { job_id } => {
            let breakdown = client.bacteria(&job_id)?;
            out.write_all(render::render_bacteria(&breakdown).as_bytes())?;
            Ok(())
        }
        Command::Download { job_id, dir } => download(client, &job_id, dir, out),
        Command::Open { job_id } => open_report(client, &job_id, out),
        Command::Help | Command::Config(_) => Ok(()),
    }
}

/// Fill the form from flags and defaults, submit it and wait for the job identity.
pub fn submit(
    args: SubmitArgs,
    settings: &ClientSettings,
    client: &ApiClient,
    out: &mut dyn Write,
) -> Result<String, CliError> {
    let mode = args.mode.unwrap_or(settings.defaults.sequencing_mode);
    let notify = settings.defaults.notify_by_email && !args.no_email;
    let mut controller = SubmitController::new(
        JobSubmitter::new(client.clone()),
        SubmissionForm::new(mode, notify),
    );
    controller.set_project_name(args.project_name);
    controller.set_email(
        args.email
            .or_else(|| settings.defaults.email.clone())
            .unwrap_or_default(),
    );
    controller.set_use_sample_data(args.sample_data);
    if args.sample_data {
        if !args.files.is_empty() {
            tracing::warn!("Ignoring {} file(s) because sample data was requested", args.files.len());
        }
    } else if !args.files.is_empty() && controller.add_paths(&args.files).is_err() {
        out.write_all(render::render_field_errors(controller.errors()).as_bytes())?;
        return Err(CliError::InvalidForm(controller.errors().len()));
    }

    if !controller.submit() {
        out.write_all(render::render_field_errors(controller.errors()).as_bytes())?;
        return Err(CliError::InvalidForm(controller.errors().len()));
    }
    writeln!(out, "Uploading...")?;
    loop {
        match controller.wait(SUBMIT_WAKE) {
            SubmitPhase::Submitting => continue,
            SubmitPhase::Submitted(job) => {
                out.write_all(render::render_submitted(&job).as_bytes())?;
                return Ok(job.job_id);
            }
            SubmitPhase::Editing => {
                let message = controller
                    .errors()
                    .iter()
                    .map(|(_, message)| message.to_string())
                    .next()
                    .unwrap_or_else(|| "no response from server".to_string());
                return Err(CliError::SubmissionFailed(message));
            }
        }
    }
}

/// Follow a job until it settles, printing the view whenever it changes.
pub fn track_job(
    client: &ApiClient,
    job_id: &str,
    interval: Duration,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let mut tracker = JobTracker::new(client.clone(), interval);
    tracker.track(job_id);
    let mut last_rendered: Option<String> = None;
    loop {
        tracker.wait_for_update(TRACK_WAKE);
        let view = tracker.view();
        if view != JobView::Loading {
            let text = render::render_job_view(&view, client.endpoints());
            if last_rendered.as_deref() != Some(text.as_str()) {
                out.write_all(text.as_bytes())?;
                out.flush()?;
                last_rendered = Some(text);
            }
        }
        if tracker.is_settled() {
            break;
        }
    }
    Ok(())
}

fn download(
    client: &ApiClient,
    job_id: &str,
    dir: Option<PathBuf>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let result = client.job_results(job_id)?;
    let artifacts = presenter::artifacts(&result);
    if artifacts.is_empty() {
        writeln!(out, "No artifacts available for job {job_id}")?;
        return Ok(());
    }
    let dir = match dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir).map_err(|source| CliError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            dir
        }
        None => app_dirs::downloads_dir(job_id)?,
    };
    for artifact in &artifacts {
        let destination = dir.join(presenter::artifact_file_name(artifact));
        let bytes = client.download(artifact.link, &destination)?;
        writeln!(
            out,
            "{}: {} ({})",
            artifact.kind.label(),
            destination.display(),
            presenter::format_file_size(bytes)
        )?;
    }
    Ok(())
}

fn open_report(client: &ApiClient, job_id: &str, out: &mut dyn Write) -> Result<(), CliError> {
    let result = client.job_results(job_id)?;
    let link = result
        .report_html
        .as_deref()
        .filter(|link| !link.trim().is_empty())
        .ok_or_else(|| CliError::NoReport(job_id.to_string()))?;
    let url = client.endpoints().resolve_artifact(link);
    tracing::info!("Opening report {url}");
    open::that(&url).map_err(|source| CliError::OpenBrowser {
        url: url.clone(),
        source,
    })?;
    writeln!(out, "Opened {url}")?;
    Ok(())
}

fn run_config(changes: ConfigArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let path = config::config_path()?;
    let mut settings = config::load_from(&path)?;
    if !changes.is_empty() {
        apply_config_changes(&mut settings, changes)?;
        config::save_to_path(&settings, &path)?;
        tracing::info!("Saved settings to {}", path.display());
    }
    out.write_all(render::render_settings(&settings, &path).as_bytes())?;
    Ok(())
}

/// Apply `config --set-*` flags. The base URL is validated before anything is saved.
pub fn apply_config_changes(settings: &mut ClientSettings, changes: ConfigArgs) -> Result<(), ConfigError> {
    if let Some(base_url) = changes.set_base_url {
        config::parse_base_url(&base_url)?;
        settings.api.base_url = base_url.trim().trim_end_matches('/').to_string();
    }
    if let Some(secs) = changes.set_interval_secs {
        settings.polling.interval_secs = secs;
    }
    if let Some(email) = changes.set_email {
        let email = email.trim().to_string();
        settings.defaults.email = (!email.is_empty()).then_some(email);
    }
    Ok(())
}
