//! Plain-text views for terminal output.

use std::fmt::Write as _;
use std::path::Path;

use crate::api::{BacteriaBreakdown, CreatedJob, Endpoints, JobRecord, JobStatus, JobStatusSnapshot, ResultRecord};
use crate::config::ClientSettings;
use crate::presenter::{self, StatusIcon};
use crate::submission::{FormField, ValidationErrors};
use crate::tracking::JobView;

fn glyph(icon: StatusIcon) -> &'static str {
    match icon {
        StatusIcon::CheckCircle => "[done]",
        StatusIcon::Spinner => "[....]",
        StatusIcon::Clock => "[wait]",
        StatusIcon::XCircle => "[fail]",
    }
}

fn field_label(field: FormField) -> &'static str {
    match field {
        FormField::ProjectName => "Project name",
        FormField::Email => "Email",
        FormField::Files => "Files",
    }
}

fn status_line(status: &JobStatus) -> String {
    let raw = status.as_str();
    format!(
        "{} {}",
        glyph(presenter::status_icon(raw)),
        presenter::status_label(raw)
    )
}

pub fn render_field_errors(errors: &ValidationErrors) -> String {
    let mut out = String::new();
    for (field, message) in errors.iter() {
        let _ = writeln!(out, "  {}: {message}", field_label(field));
    }
    out
}

pub fn render_submitted(job: &CreatedJob) -> String {
    let mut out = String::from("Analysis submitted\n");
    let _ = writeln!(out, "  Job ID: {}", job.job_id);
    let _ = writeln!(out, "  Status: {}", status_line(&job.status));
    let _ = writeln!(out, "  Follow it with: seqsubmit track {}", job.job_id);
    out
}

pub fn render_job_view(view: &JobView<'_>, endpoints: &Endpoints) -> String {
    match view {
        JobView::Loading => "Loading job...\n".to_string(),
        JobView::NotFound { job_id } => format!(
            "Job Not Found\n  The job you're looking for doesn't exist: {job_id}\n"
        ),
        JobView::Unavailable { message } => {
            format!("Job status unavailable: {message}\n  Retrying...\n")
        }
        JobView::Job { job, fetch_error } => {
            let mut out = render_job(job, endpoints);
            if let Some(message) = fetch_error {
                let _ = writeln!(out, "  (last refresh failed: {message})");
            }
            out
        }
    }
}

pub fn render_job(job: &JobRecord, endpoints: &Endpoints) -> String {
    let mut out = String::new();
    let title = if job.project_name.is_empty() {
        job.job_id.as_str()
    } else {
        job.project_name.as_str()
    };
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "  Job ID: {}", job.job_id);
    let _ = writeln!(out, "  Status: {}", status_line(&job.status));
    if !job.email.is_empty() {
        let _ = writeln!(out, "  Email: {}", job.email);
    }
    if let Some(data_type) = &job.data_type {
        let _ = writeln!(out, "  Data type: {}", data_type.to_uppercase());
    }
    if !job.created_at.is_empty() {
        let _ = writeln!(out, "  Created: {}", presenter::format_timestamp(&job.created_at));
    }
    if !job.updated_at.is_empty() {
        let _ = writeln!(out, "  Last updated: {}", presenter::format_timestamp(&job.updated_at));
    }
    if let Some(message) = presenter::progress_message(job.status.as_str()) {
        let _ = writeln!(out, "  {message}: this view updates automatically.");
    }
    if job.status == JobStatus::Failed {
        let detail = job
            .error_message
            .as_deref()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or("The analysis failed without further details.");
        let _ = writeln!(out, "  Error details: {detail}");
    }
    if !job.files.is_empty() {
        let _ = writeln!(out, "  Uploaded files:");
        for file in &job.files {
            let _ = writeln!(
                out,
                "    {} ({})",
                file.file_name,
                presenter::format_file_size(file.file_size)
            );
        }
    }
    if job.status == JobStatus::Completed {
        if let Some(result) = &job.result {
            out.push_str(&render_results(result, endpoints));
        }
    }
    out
}

pub fn render_status(snapshot: &JobStatusSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  {}", snapshot.job_id, status_line(&snapshot.status));
    if let Some(message) = presenter::progress_message(snapshot.status.as_str()) {
        let _ = writeln!(out, "  {message}");
    }
    if !snapshot.updated_at.is_empty() {
        let _ = writeln!(out, "  Last updated: {}", presenter::format_timestamp(&snapshot.updated_at));
    }
    if let Some(completed) = &snapshot.completed_at {
        let _ = writeln!(out, "  Completed: {}", presenter::format_timestamp(completed));
    }
    if let Some(message) = &snapshot.error_message {
        let _ = writeln!(out, "  Error details: {message}");
    }
    out
}

pub fn render_results(result: &ResultRecord, endpoints: &Endpoints) -> String {
    let mut out = String::from("  Analysis Results\n");
    match result.execution_time_seconds {
        Some(seconds) => {
            let _ = writeln!(out, "    {}", presenter::format_execution_time(seconds));
        }
        None => out.push_str("    Analysis complete\n"),
    }
    let artifacts = presenter::artifacts(result);
    if artifacts.is_empty() {
        out.push_str("    No downloadable artifacts\n");
    }
    for artifact in artifacts {
        let _ = writeln!(
            out,
            "    {}: {}",
            artifact.kind.label(),
            endpoints.resolve_artifact(artifact.link)
        );
    }
    out
}

pub fn render_bacteria(breakdown: &BacteriaBreakdown) -> String {
    let entries = breakdown.by_abundance();
    if entries.is_empty() {
        return "No bacteria detected\n".to_string();
    }
    let total = breakdown.total_reads();
    let genus_width = entries
        .iter()
        .map(|entry| entry.genus.len())
        .max()
        .unwrap_or(0)
        .max("Genus".len());
    let mut out = String::new();
    let _ = writeln!(out, "{:<genus_width$}  {:>12}  {:>6}  Family / Phylum", "Genus", "Reads", "Share");
    for entry in &entries {
        let share = if total == 0 {
            0.0
        } else {
            entry.total_reads as f64 * 100.0 / total as f64
        };
        let _ = writeln!(
            out,
            "{:<genus_width$}  {:>12}  {:>5.1}%  {} / {}",
            entry.genus, entry.total_reads, share, entry.family, entry.phylum
        );
    }
    let _ = writeln!(out, "{} genera, {total} reads", breakdown.total_count.max(entries.len() as u64));
    out
}

pub fn render_settings(settings: &ClientSettings, path: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Settings file: {}", path.display());
    let _ = writeln!(out, "  API base URL: {}", settings.api.base_url);
    let _ = writeln!(
        out,
        "  Timeouts: connect {}s, read {}s, upload {}s",
        settings.api.connect_timeout_secs, settings.api.read_timeout_secs, settings.api.write_timeout_secs
    );
    let _ = writeln!(out, "  Poll interval: {}s", settings.polling.interval_secs);
    let _ = writeln!(
        out,
        "  Default email: {}",
        settings.defaults.email.as_deref().unwrap_or("(none)")
    );
    let _ = writeln!(out, "  Notify by email: {}", settings.defaults.notify_by_email);
    let _ = writeln!(out, "  Sequencing mode: {}", settings.defaults.sequencing_mode.as_str());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::new(url::Url::parse("http://localhost:8000").unwrap())
    }

    fn job(json: serde_json::Value) -> JobRecord {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn failed_job_shows_error_or_generic_text() {
        let with_message = job(serde_json::json!({
            "job_id": "j", "status": "failed", "error_message": "Out of memory"
        }));
        assert!(render_job(&with_message, &endpoints()).contains("Error details: Out of memory"));
        let without = job(serde_json::json!({"job_id": "j", "status": "failed"}));
        assert!(render_job(&without, &endpoints()).contains("failed without further details"));
    }

    #[test]
    fn completed_job_lists_absolute_artifact_links() {
        let completed = job(serde_json::json!({
            "job_id": "j",
            "project_name": "Soil",
            "status": "completed",
            "result": {"report_html": "/media/r.html", "execution_time": 61.25}
        }));
        let text = render_job(&completed, &endpoints());
        assert!(text.starts_with("Soil\n"));
        assert!(text.contains("[done] Completed"));
        assert!(text.contains("Completed in 61.2s") || text.contains("Completed in 61.3s"));
        assert!(text.contains("Download Report: http://localhost:8000/media/r.html"));
        assert!(!text.contains("Taxonomy Plot"));
    }

    #[test]
    fn processing_job_shows_progress_banner() {
        let processing = job(serde_json::json!({"job_id": "j", "status": "processing"}));
        let text = render_job(&processing, &endpoints());
        assert!(text.contains("Processing Your Data"));
        assert!(!text.contains("Analysis Results"));
    }

    #[test]
    fn not_found_view() {
        let text = render_job_view(&JobView::NotFound { job_id: "ghost" }, &endpoints());
        assert!(text.starts_with("Job Not Found"));
    }

    #[test]
    fn field_errors_are_labelled() {
        let mut errors = ValidationErrors::default();
        errors.set(FormField::Email, "Email is required");
        assert_eq!(render_field_errors(&errors), "  Email: Email is required\n");
    }

    #[test]
    fn bacteria_table_is_sorted_with_shares() {
        let breakdown: BacteriaBreakdown = serde_json::from_value(serde_json::json!({
            "bacteria": [
                {"genus": "Bacillus", "family": "Bacillaceae", "phylum": "Firmicutes", "total_reads": 25},
                {"genus": "Pseudomonas", "family": "Pseudomonadaceae", "phylum": "Proteobacteria", "total_reads": 75}
            ],
            "total_count": 2
        }))
        .unwrap();
        let text = render_bacteria(&breakdown);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("Pseudomonas"));
        assert!(lines[1].contains("75.0%"));
        assert!(lines[2].contains("25.0%"));
        assert_eq!(lines[3], "2 genera, 100 reads");
    }
}
