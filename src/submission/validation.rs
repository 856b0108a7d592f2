//! Submission preconditions. Pure: safe to call on every edit and again at submit.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::form::{SequencingMode, SubmissionForm};
use super::pairing;

pub const PROJECT_NAME_REQUIRED: &str = "Project name is required";
pub const EMAIL_REQUIRED: &str = "Email is required";
pub const EMAIL_INVALID: &str = "Please enter a valid email address";
pub const FILES_REQUIRED: &str = "Please upload at least one FASTQ file";
pub const SINGLE_END_COUNT: &str = "Single-end sequencing requires exactly 1 FASTQ file";
pub const PAIRED_END_COUNT: &str = "Paired-end sequencing requires exactly 2 FASTQ files (R1 and R2)";
pub const PAIRED_END_ROLES: &str = "Paired-end files must include R1 (forward) and R2 (reverse) reads. \
Name them like sample_R1.fastq.gz / sample_R2.fastq.gz \
(_1/_2, _F/_R and _forward/_reverse also work)";

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Form fields that can carry an error message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    ProjectName,
    Email,
    /// Also where submission failures are shown.
    Files,
}

impl FormField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProjectName => "projectName",
            Self::Email => "email",
            Self::Files => "files",
        }
    }
}

/// Field-scoped error messages. Empty means the form is valid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<FormField, String>,
}

impl ValidationErrors {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: FormField, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn clear(&mut self, field: FormField) {
        self.errors.remove(&field);
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.errors
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }
}

/// `local@domain.tld`: one `@`, a dot after it, no whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Check every rule and collect all failures together.
pub fn validate(form: &SubmissionForm) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    if form.project_name.trim().is_empty() {
        errors.set(FormField::ProjectName, PROJECT_NAME_REQUIRED);
    }

    if form.email.trim().is_empty() {
        errors.set(FormField::Email, EMAIL_REQUIRED);
    } else if !is_valid_email(&form.email) {
        errors.set(FormField::Email, EMAIL_INVALID);
    }

    if !form.use_sample_data {
        if let Some(message) = file_error(form) {
            errors.set(FormField::Files, message);
        }
    }

    errors
}

fn file_error(form: &SubmissionForm) -> Option<&'static str> {
    let files = form.descriptors();
    if files.is_empty() {
        return Some(FILES_REQUIRED);
    }
    match form.sequencing_mode {
        SequencingMode::SingleEnd if files.len() != 1 => Some(SINGLE_END_COUNT),
        SequencingMode::SingleEnd => None,
        SequencingMode::PairedEnd if files.len() != 2 => Some(PAIRED_END_COUNT),
        SequencingMode::PairedEnd if !pairing::is_complete_pair(&files) => Some(PAIRED_END_ROLES),
        SequencingMode::PairedEnd => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::form::{StagedFile, UploadedFileDescriptor};

    fn form_with(mode: SequencingMode, names: &[&str]) -> SubmissionForm {
        let mut form = SubmissionForm::new(mode, true);
        form.project_name = "Gut study".to_string();
        form.email = "researcher@university.edu".to_string();
        let batch = names
            .iter()
            .map(|name| {
                StagedFile::new(
                    UploadedFileDescriptor {
                        name: name.to_string(),
                        size: 1,
                    },
                    format!("/tmp/{name}"),
                )
            })
            .collect();
        form.add_files(batch).unwrap();
        form
    }

    #[test]
    fn complete_paired_form_is_valid() {
        let form = form_with(
            SequencingMode::PairedEnd,
            &["sample_R1.fastq.gz", "sample_R2.fastq.gz"],
        );
        assert!(validate(&form).is_valid());
    }

    #[test]
    fn all_errors_are_reported_together() {
        let mut form = SubmissionForm::default();
        form.project_name = "   ".to_string();
        let errors = validate(&form);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get(FormField::ProjectName), Some(PROJECT_NAME_REQUIRED));
        assert_eq!(errors.get(FormField::Email), Some(EMAIL_REQUIRED));
        assert_eq!(errors.get(FormField::Files), Some(FILES_REQUIRED));
    }

    #[test]
    fn malformed_email_is_rejected() {
        for email in ["plain", "a@b", "a b@c.de", "a@@b.cd", " a@b.cd"] {
            let mut form = form_with(SequencingMode::SingleEnd, &["x.fastq.gz"]);
            form.email = email.to_string();
            assert_eq!(validate(&form).get(FormField::Email), Some(EMAIL_INVALID), "{email}");
        }
        assert!(is_valid_email("first.last@lab.example.org"));
    }

    #[test]
    fn single_end_requires_one_file() {
        let form = form_with(SequencingMode::SingleEnd, &["a_R1.fq.gz", "a_R2.fq.gz"]);
        assert_eq!(validate(&form).get(FormField::Files), Some(SINGLE_END_COUNT));
        let form = form_with(SequencingMode::SingleEnd, &["a.fq.gz"]);
        assert!(validate(&form).is_valid());
    }

    #[test]
    fn paired_end_requires_two_files() {
        let form = form_with(SequencingMode::PairedEnd, &["a_R1.fq.gz"]);
        assert_eq!(validate(&form).get(FormField::Files), Some(PAIRED_END_COUNT));
    }

    #[test]
    fn paired_end_with_unknown_roles_is_rejected() {
        let form = form_with(SequencingMode::PairedEnd, &["a.fq.gz", "b.fq.gz"]);
        assert_eq!(validate(&form).get(FormField::Files), Some(PAIRED_END_ROLES));
        let form = form_with(SequencingMode::PairedEnd, &["a_R1.fq.gz", "b_1.fq.gz"]);
        assert_eq!(validate(&form).get(FormField::Files), Some(PAIRED_END_ROLES));
    }

    #[test]
    fn roles_are_checked_on_the_final_file_set() {
        let mut form = form_with(SequencingMode::PairedEnd, &["s_R2.fq.gz"]);
        form.add_files(vec![StagedFile::new(
            UploadedFileDescriptor {
                name: "s_R1.fq.gz".to_string(),
                size: 1,
            },
            "/tmp/s_R1.fq.gz",
        )])
        .unwrap();
        assert!(validate(&form).is_valid());
    }

    #[test]
    fn sample_data_skips_file_rules() {
        let mut form = form_with(SequencingMode::PairedEnd, &[]);
        form.use_sample_data = true;
        assert!(validate(&form).is_valid());

        let mut form = form_with(SequencingMode::SingleEnd, &["a.fq.gz", "b.fq.gz"]);
        form.use_sample_data = true;
        assert!(validate(&form).is_valid());
    }

    #[test]
    fn clearing_a_field_leaves_the_others() {
        let mut errors = validate(&SubmissionForm::default());
        errors.clear(FormField::Email);
        assert!(errors.get(FormField::Email).is_none());
        assert!(errors.get(FormField::ProjectName).is_some());
    }
}
