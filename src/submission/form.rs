//! Submission form state: sequencing mode, staged FASTQ files and batch intake.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pairing::{self, NamedFile};

/// File suffixes the pipeline accepts for raw reads.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[".fastq.gz", ".fq.gz"];

/// Sequencing layout of the submitted reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequencingMode {
    SingleEnd,
    #[default]
    PairedEnd,
}

impl SequencingMode {
    /// Wire value sent as `data_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleEnd => "single-end",
            Self::PairedEnd => "paired-end",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single-end" | "single" | "se" => Some(Self::SingleEnd),
            "paired-end" | "paired" | "pe" => Some(Self::PairedEnd),
            _ => None,
        }
    }
}

/// Name and size of one upload. Validation and pairing only ever see these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFileDescriptor {
    pub name: String,
    pub size: u64,
}

impl NamedFile for UploadedFileDescriptor {
    fn file_name(&self) -> &str {
        &self.name
    }
}

/// A descriptor plus the on-disk location the submitter streams from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedFile {
    descriptor: UploadedFileDescriptor,
    path: PathBuf,
}

impl StagedFile {
    pub fn new(descriptor: UploadedFileDescriptor, path: impl Into<PathBuf>) -> Self {
        Self {
            descriptor,
            path: path.into(),
        }
    }

    /// Stage a local file, reading its name and size from the filesystem.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IntakeError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|source| IntakeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(IntakeError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| IntakeError::NotAFile {
                path: path.to_path_buf(),
            })?;
        Ok(Self::new(
            UploadedFileDescriptor {
                name,
                size: metadata.len(),
            },
            path,
        ))
    }

    pub fn descriptor(&self) -> &UploadedFileDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl NamedFile for StagedFile {
    fn file_name(&self) -> &str {
        self.name()
    }
}

/// Reasons a batch of files is refused before it reaches the form.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Unsupported file '{name}': expected .fastq.gz or .fq.gz")]
    UnsupportedExtension { name: String },
    #[error("Not a regular file: {path}")]
    NotAFile { path: PathBuf },
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// True for names ending in one of [`ACCEPTED_EXTENSIONS`], ignoring case.
pub fn is_accepted_upload(name: &str) -> bool {
    let lowered = name.to_lowercase();
    ACCEPTED_EXTENSIONS
        .iter()
        .any(|extension| lowered.ends_with(extension))
}

/// User input for one job submission.
///
/// When `use_sample_data` is set the server runs on its bundled dataset and
/// `files` is ignored by both validation and submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmissionForm {
    pub project_name: String,
    pub email: String,
    pub sequencing_mode: SequencingMode,
    pub notify_by_email: bool,
    pub use_sample_data: bool,
    files: Vec<StagedFile>,
}

impl SubmissionForm {
    pub fn new(sequencing_mode: SequencingMode, notify_by_email: bool) -> Self {
        Self {
            sequencing_mode,
            notify_by_email,
            ..Self::default()
        }
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn descriptors(&self) -> Vec<&UploadedFileDescriptor> {
        self.files.iter().map(StagedFile::descriptor).collect()
    }

    /// Append one batch (one drop or one picker selection).
    ///
    /// The batch is put into read order on its own; files accepted earlier are
    /// never re-sorted. A batch with any unsupported name is refused whole.
    pub fn add_files(&mut self, batch: Vec<StagedFile>) -> Result<usize, IntakeError> {
        if let Some(rejected) = batch.iter().find(|file| !is_accepted_upload(file.name())) {
            return Err(IntakeError::UnsupportedExtension {
                name: rejected.name().to_string(),
            });
        }
        let added = batch.len();
        self.files.extend(pairing::order(batch));
        Ok(added)
    }

    /// Stage and append local paths as one batch.
    pub fn add_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<usize, IntakeError> {
        let batch = paths
            .iter()
            .map(StagedFile::from_path)
            .collect::<Result<Vec<_>, _>>()?;
        self.add_files(batch)
    }

    /// Remove the file at `index`; out of range is a no-op.
    pub fn remove_file(&mut self, index: usize) -> Option<StagedFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }
}
