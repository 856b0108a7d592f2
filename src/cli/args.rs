//! Hand-rolled argument parsing for the `seqsubmit` binary.

use std::path::PathBuf;

use thiserror::Error;

use crate::submission::SequencingMode;

pub const BIN_NAME: &str = "seqsubmit";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("Missing command\n\n{help}", help = help_text())]
    MissingCommand,
    #[error("Unknown command '{0}'\n\n{help}", help = help_text())]
    UnknownCommand(String),
    #[error("Unknown argument '{arg}' for '{command}'\n\n{help}", help = help_text())]
    UnknownArgument { command: &'static str, arg: String },
    #[error("Missing value for {0}")]
    MissingValue(&'static str),
    #[error("Invalid value '{value}' for {flag}: {reason}")]
    InvalidValue {
        flag: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("'{0}' needs a job ID")]
    MissingJobId(&'static str),
    #[error("'{0}' is not a valid job ID")]
    InvalidJobId(String),
}

/// Parsed command line: global options plus one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub base_url: Option<String>,
    pub command: Command,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Submit(SubmitArgs),
    Track { job_id: String },
    Status { job_id: String },
    Results { job_id: String },
    Bacteria { job_id: String },
    Download { job_id: String, dir: Option<PathBuf> },
    Open { job_id: String },
    Config(ConfigArgs),
}

/// Flags of `submit`. Unset options fall back to the configured defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitArgs {
    pub project_name: String,
    pub email: Option<String>,
    pub mode: Option<SequencingMode>,
    pub no_email: bool,
    pub sample_data: bool,
    pub track: bool,
    pub files: Vec<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigArgs {
    pub set_base_url: Option<String>,
    pub set_interval_secs: Option<u64>,
    pub set_email: Option<String>,
}

impl ConfigArgs {
    pub fn is_empty(&self) -> bool {
        self.set_base_url.is_none() && self.set_interval_secs.is_none() && self.set_email.is_none()
    }
}

/// Parse everything after the program name.
pub fn parse_args(args: Vec<String>) -> Result<Invocation, ArgsError> {
    let mut base_url = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--base-url" => base_url = Some(next_value(&args, &mut i, "--base-url")?),
            "-h" | "--help" => {
                return Ok(Invocation {
                    base_url,
                    command: Command::Help,
                });
            }
            _ => break,
        }
        i += 1;
    }
    let Some(name) = args.get(i) else {
        return Err(ArgsError::MissingCommand);
    };
    let rest = &args[i + 1..];
    if rest.iter().any(|arg| arg == "-h" || arg == "--help") {
        return Ok(Invocation {
            base_url,
            command: Command::Help,
        });
    }
    let command = match name.as_str() {
        "help" => Command::Help,
        "submit" => Command::Submit(parse_submit(rest)?),
        "track" => Command::Track {
            job_id: single_job_id("track", rest)?,
        },
        "status" => Command::Status {
            job_id: single_job_id("status", rest)?,
        },
        "results" => Command::Results {
            job_id: single_job_id("results", rest)?,
        },
        "bacteria" => Command::Bacteria {
            job_id: single_job_id("bacteria", rest)?,
        },
        "open" => Command::Open {
            job_id: single_job_id("open", rest)?,
        },
        "download" => parse_download(rest)?,
        "config" => Command::Config(parse_config(rest)?),
        other => return Err(ArgsError::UnknownCommand(other.to_string())),
    };
    Ok(Invocation { base_url, command })
}

fn parse_submit(args: &[String]) -> Result<SubmitArgs, ArgsError> {
    let mut parsed = SubmitArgs::default();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--project" => parsed.project_name = next_value(args, &mut i, "--project")?,
            "--email" => parsed.email = Some(next_value(args, &mut i, "--email")?),
            "--mode" => {
                let value = next_value(args, &mut i, "--mode")?;
                parsed.mode = Some(SequencingMode::parse(&value).ok_or(ArgsError::InvalidValue {
                    flag: "--mode",
                    value,
                    reason: "expected single-end or paired-end",
                })?);
            }
            "--no-email" => parsed.no_email = true,
            "--sample-data" => parsed.sample_data = true,
            "--track" => parsed.track = true,
            flag if flag.starts_with("--") => {
                return Err(ArgsError::UnknownArgument {
                    command: "submit",
                    arg: flag.to_string(),
                });
            }
            path => parsed.files.push(PathBuf::from(path)),
        }
        i += 1;
    }
    Ok(parsed)
}

fn parse_download(args: &[String]) -> Result<Command, ArgsError> {
    let mut job_id = None;
    let mut dir = None;
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--dir" => dir = Some(PathBuf::from(next_value(args, &mut i, "--dir")?)),
            value if job_id.is_none() && !value.starts_with("--") => {
                job_id = Some(checked_job_id(value)?);
            }
            unknown => {
                return Err(ArgsError::UnknownArgument {
                    command: "download",
                    arg: unknown.to_string(),
                });
            }
        }
        i += 1;
    }
    let job_id = job_id.ok_or(ArgsError::MissingJobId("download"))?;
    Ok(Command::Download { job_id, dir })
}

fn parse_config(args: &[String]) -> Result<ConfigArgs, ArgsError> {
    let mut parsed = ConfigArgs::default();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--set-base-url" => parsed.set_base_url = Some(next_value(args, &mut i, "--set-base-url")?),
            "--set-interval" => {
                let value = next_value(args, &mut i, "--set-interval")?;
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ArgsError::InvalidValue {
                        flag: "--set-interval",
                        value,
                        reason: "expected a positive number of seconds",
                    })?;
                parsed.set_interval_secs = Some(secs);
            }
            "--set-email" => parsed.set_email = Some(next_value(args, &mut i, "--set-email")?),
            unknown => {
                return Err(ArgsError::UnknownArgument {
                    command: "config",
                    arg: unknown.to_string(),
                });
            }
        }
        i += 1;
    }
    Ok(parsed)
}

fn single_job_id(command: &'static str, args: &[String]) -> Result<String, ArgsError> {
    match args {
        [] => Err(ArgsError::MissingJobId(command)),
        [job_id] => checked_job_id(job_id),
        [_, extra, ..] => Err(ArgsError::UnknownArgument {
            command,
            arg: extra.clone(),
        }),
    }
}

/// Job IDs end up in URLs and local directory names; allow only plain identifiers.
fn checked_job_id(value: &str) -> Result<String, ArgsError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(value.to_string())
    } else {
        Err(ArgsError::InvalidJobId(value.to_string()))
    }
}

fn next_value(args: &[String], i: &mut usize, name: &'static str) -> Result<String, ArgsError> {
    let next = args.get(*i + 1).ok_or(ArgsError::MissingValue(name))?;
    *i += 1;
    Ok(next.clone())
}

pub fn help_text() -> String {
    format!(
        "Usage: {BIN_NAME} [--base-url URL] <command> [options]\n\n\
Commands:\n\
  submit --project NAME --email ADDR [FILE...]   Upload FASTQ files and create a job\n\
      --mode <single-end|paired-end>   Sequencing mode (default: from config)\n\
      --no-email                       Do not send a notification email\n\
      --sample-data                    Analyse the bundled sample data instead of FILEs\n\
      --track                          Follow the new job until it finishes\n\
  track <JOB_ID>                       Poll a job until it completes or fails\n\
  status <JOB_ID>                      Show the current status once\n\
  results <JOB_ID>                     List result artifacts of a completed job\n\
  bacteria <JOB_ID>                    Show the genus-level read breakdown\n\
  download <JOB_ID> [--dir DIR]        Save every available artifact\n\
  open <JOB_ID>                        Open the HTML report in a browser\n\
  config [--set-base-url URL] [--set-interval SECS] [--set-email ADDR]\n\
                                       Show or change saved settings\n\n\
Options:\n\
  --base-url URL                       Analysis server for this run\n\
  -h, --help                           Show help\n"
    )
}
