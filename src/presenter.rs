//! Pure mappings from job data to what a status screen shows.

use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339, macros::format_description};

use crate::api::ResultRecord;

/// Icon shown next to a job status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusIcon {
    CheckCircle,
    Spinner,
    Clock,
    XCircle,
}

/// Colour role of a job status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusColor {
    Success,
    Primary,
    Warning,
    Destructive,
    Muted,
}

impl StatusColor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Primary => "primary",
            Self::Warning => "warning",
            Self::Destructive => "destructive",
            Self::Muted => "muted",
        }
    }
}

/// Unknown statuses share the pending clock.
pub fn status_icon(status: &str) -> StatusIcon {
    match status {
        "completed" => StatusIcon::CheckCircle,
        "processing" => StatusIcon::Spinner,
        "failed" => StatusIcon::XCircle,
        _ => StatusIcon::Clock,
    }
}

pub fn status_color(status: &str) -> StatusColor {
    match status {
        "completed" => StatusColor::Success,
        "processing" => StatusColor::Primary,
        "pending" => StatusColor::Warning,
        "failed" => StatusColor::Destructive,
        _ => StatusColor::Muted,
    }
}

/// Capitalise the first character and leave the rest alone.
pub fn status_label(status: &str) -> String {
    let mut chars = status.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Banner text for a job that is still moving.
pub fn progress_message(status: &str) -> Option<&'static str> {
    match status {
        "pending" => Some("Queued for Processing"),
        "processing" => Some("Processing Your Data"),
        _ => None,
    }
}

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable size in powers of 1024 with one decimal place.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    let mut scale = 1u64;
    while unit + 1 < SIZE_UNITS.len() && bytes / scale >= 1024 {
        scale *= 1024;
        unit += 1;
    }
    format!("{:.1} {}", bytes as f64 / scale as f64, SIZE_UNITS[unit])
}

pub fn format_execution_time(seconds: f64) -> String {
    format!("Completed in {seconds:.1}s")
}

/// Render an RFC 3339 timestamp in local time. Unparseable input comes back unchanged.
pub fn format_timestamp(raw: &str) -> String {
    let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) else {
        return raw.to_string();
    };
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    parsed
        .to_offset(offset)
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| raw.to_string())
}

/// A downloadable output of a finished job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact<'a> {
    pub kind: ArtifactKind,
    pub link: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Report,
    AlphaDiversityPlot,
    BetaDiversityPlot,
    TaxonomyPlot,
    AlphaDiversityData,
    BetaDiversityData,
    TaxonomyData,
}

impl ArtifactKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Report => "Download Report",
            Self::AlphaDiversityPlot => "Alpha Diversity Plot",
            Self::BetaDiversityPlot => "Beta Diversity Plot",
            Self::TaxonomyPlot => "Taxonomy Plot",
            Self::AlphaDiversityData => "Alpha Diversity Data",
            Self::BetaDiversityData => "Beta Diversity Data",
            Self::TaxonomyData => "Taxonomy Data",
        }
    }

    /// Stable file stem used when saving the artifact locally.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::AlphaDiversityPlot => "alpha_diversity_plot",
            Self::BetaDiversityPlot => "beta_diversity_plot",
            Self::TaxonomyPlot => "taxonomy_plot",
            Self::AlphaDiversityData => "alpha_diversity_data",
            Self::BetaDiversityData => "beta_diversity_data",
            Self::TaxonomyData => "taxonomy_data",
        }
    }
}

/// Every artifact the result carries, in display order. Missing or blank links are skipped.
pub fn artifacts(result: &ResultRecord) -> Vec<Artifact<'_>> {
    [
        (ArtifactKind::Report, &result.report_html),
        (ArtifactKind::AlphaDiversityPlot, &result.alpha_diversity_plot),
        (ArtifactKind::BetaDiversityPlot, &result.beta_diversity_plot),
        (ArtifactKind::TaxonomyPlot, &result.taxonomy_plot),
        (ArtifactKind::AlphaDiversityData, &result.alpha_diversity_data),
        (ArtifactKind::BetaDiversityData, &result.beta_diversity_data),
        (ArtifactKind::TaxonomyData, &result.taxonomy_data),
    ]
    .into_iter()
    .filter_map(|(kind, link)| {
        link.as_deref()
            .filter(|link| !link.trim().is_empty())
            .map(|link| Artifact { kind, link })
    })
    .collect()
}

/// Local file name for a downloaded artifact, keeping the server's extension.
pub fn artifact_file_name(artifact: &Artifact<'_>) -> String {
    let path = artifact.link.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{}.{}", artifact.kind.file_stem(), ext)
        }
        _ => artifact.kind.file_stem().to_string(),
    }
}
