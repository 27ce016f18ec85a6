use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;

use crate::core::request::RequestSnapshot;

/// Error type for multipart parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MultipartError {
    #[error("Not a multipart request: {0}")]
    NotMultipart(String),

    #[error("Missing multipart boundary")]
    MissingBoundary,

    #[error("Malformed multipart body: {0}")]
    Malformed(String),
}

/// A file part of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Parsed multipart body: text fields and uploaded files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    pub fn add_file(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    /// First value of a text field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }
}

/// MultipartParser defines the port used to wrap upload requests before
/// their handler executes
pub trait MultipartParser: Send + Sync + 'static {
    fn parse(&self, request: &RequestSnapshot) -> Result<MultipartForm, MultipartError>;
}
