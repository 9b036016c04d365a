//! Multipart form collection for upload endpoints.
//!
//! Uploads are buffered in memory (bounded by the router's body limit) and
//! split into file parts and plain text fields.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;
use projectflow_core::types::DbId;

use crate::error::{AppError, AppResult};

/// One file part of a multipart body.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// All parts of a multipart body.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain the multipart stream. Any part carrying a file name is a file;
    /// everything else is kept as text.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
                    form.files.push(UploadedFile {
                        file_name,
                        content_type,
                        data,
                    });
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid field {name}: {e}")))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// A text field, trimmed; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// An optional numeric id field.
    pub fn id(&self, name: &str) -> AppResult<Option<DbId>> {
        self.text(name)
            .map(|v| {
                v.parse::<DbId>()
                    .map_err(|_| AppError::BadRequest(format!("{name} must be an integer id")))
            })
            .transpose()
    }

    pub fn required_id(&self, name: &str) -> AppResult<DbId> {
        self.id(name)?
            .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))
    }

    /// Take the first uploaded file.
    pub fn take_file(&mut self) -> AppResult<UploadedFile> {
        if self.files.is_empty() {
            return Err(AppError::BadRequest("No file uploaded".into()));
        }
        let file = self.files.remove(0);
        if file.data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".into()));
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> UploadForm {
        UploadForm {
            files: Vec::new(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn blank_text_is_absent() {
        let f = form(&[("remark", "  "), ("doc_name", " Plan ")]);
        assert_eq!(f.text("remark"), None);
        assert_eq!(f.text("doc_name").as_deref(), Some("Plan"));
    }

    #[test]
    fn ids_are_parsed() {
        let f = form(&[("project_id", "12"), ("task_id", "x")]);
        assert_eq!(f.id("project_id").unwrap(), Some(12));
        assert!(f.id("task_id").is_err());
        assert!(f.required_id("phase_id").is_err());
    }

    #[test]
    fn missing_file_is_bad_request() {
        assert!(form(&[]).take_file().is_err());
    }
}
