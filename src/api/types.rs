//! Wire shapes returned by the analysis server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline state of a job. Unrecognised values are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other(value) => value,
        }
    }

    /// Pending and processing jobs are still moving and keep the poller alive.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response to a successful upload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreatedJob {
    pub job_id: String,
    pub status: JobStatus,
}

/// Full job snapshot from the detail endpoint. Replaced wholesale on every fetch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub data_type: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub send_email: Option<bool>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub files: Vec<JobFile>,
    #[serde(default)]
    pub result: Option<ResultRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFile {
    pub file_name: String,
    pub file_size: u64,
    #[serde(default)]
    pub uploaded_at: String,
}

/// Output artifacts of a finished job. Any field may be missing, even on success.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultRecord {
    pub report_html: Option<String>,
    pub alpha_diversity_plot: Option<String>,
    pub beta_diversity_plot: Option<String>,
    pub taxonomy_plot: Option<String>,
    pub alpha_diversity_data: Option<String>,
    pub beta_diversity_data: Option<String>,
    pub taxonomy_data: Option<String>,
    #[serde(rename = "execution_time")]
    pub execution_time_seconds: Option<f64>,
    pub created_at: Option<String>,
}

/// Lightweight answer from the status endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct JobStatusSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BacteriaEntry {
    pub genus: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub phylum: String,
    pub total_reads: u64,
}

/// Genus-level read counts for a completed job.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BacteriaBreakdown {
    #[serde(default)]
    pub bacteria: Vec<BacteriaEntry>,
    #[serde(default)]
    pub total_count: u64,
}

impl BacteriaBreakdown {
    /// Entries with the most reads first; ties keep server order.
    pub fn by_abundance(&self) -> Vec<&BacteriaEntry> {
        let mut entries: Vec<&BacteriaEntry> = self.bacteria.iter().collect();
        entries.sort_by(|a, b| b.total_reads.cmp(&a.total_reads));
        entries
    }

    pub fn total_reads(&self) -> u64 {
        self.bacteria.iter().map(|entry| entry.total_reads).sum()
    }
}
