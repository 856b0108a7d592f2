//! Fields and files for the upload endpoint, sent as `multipart/form-data`.
//!
//! File parts stream from disk while the request is written. No length is
//! declared for them, so the body goes out chunked and a file that changes
//! between staging and sending cannot desync the request framing.

use std::path::PathBuf;

use reqwest::blocking::multipart::{Form, Part};

use super::ApiError;

#[derive(Clone, Debug, PartialEq, Eq)]
struct FilePart {
    field: &'static str,
    file_name: String,
    path: PathBuf,
}

/// Ordered text fields followed by file parts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadForm {
    fields: Vec<(&'static str, String)>,
    files: Vec<FilePart>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, name: &'static str, value: impl Into<String>) -> &mut Self {
        self.fields.push((name, value.into()));
        self
    }

    /// Attach a file under `field`, announced to the server as `file_name`.
    pub fn file(
        &mut self,
        field: &'static str,
        file_name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> &mut Self {
        self.files.push(FilePart {
            field,
            file_name: file_name.into(),
            path: path.into(),
        });
        self
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|file| file.file_name.as_str()).collect()
    }

    /// Open every file and build the request form. Fails on the first file
    /// that cannot be opened.
    pub fn into_multipart(self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for file in self.files {
            let part = Part::file(&file.path)
                .map_err(|source| ApiError::ReadFile {
                    path: file.path.clone(),
                    source,
                })?
                .file_name(file.file_name);
            form = form.part(file.field, part);
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_field_and_file_order() {
        let mut form = UploadForm::new();
        form.text("project_name", "Soil")
            .text("use_test_data", "false")
            .file("files", "a_R1.fq.gz", "/reads/a_R1.fq.gz")
            .file("files", "a_R2.fq.gz", "/reads/a_R2.fq.gz");
        assert_eq!(form.text_value("project_name"), Some("Soil"));
        assert_eq!(form.text_value("email"), None);
        assert_eq!(form.file_names(), vec!["a_R1.fq.gz", "a_R2.fq.gz"]);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.fq.gz");
        let mut form = UploadForm::new();
        form.text("project_name", "Soil").file("files", "gone.fq.gz", &path);
        match form.into_multipart() {
            Err(ApiError::ReadFile { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected ReadFile, got {other:?}"),
        }
    }

    #[test]
    fn announces_a_multipart_boundary() {
        let mut form = UploadForm::new();
        form.text("project_name", "Soil");
        let form = form.into_multipart().unwrap();
        assert!(!form.boundary().is_empty());
    }
}
