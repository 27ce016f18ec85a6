//! `multipart/form-data` parsing for upload routes, backed by `multer`.
//!
//! The HTTP adapter buffers the request body before dispatch, so the parser
//! feeds the buffered [`Bytes`] to `multer` as a single-chunk stream and
//! drives it to completion without a runtime.
use std::convert::Infallible;

use bytes::Bytes;
use futures_util::{FutureExt, stream};
use multer::Multipart;

use crate::{
    core::request::RequestSnapshot,
    ports::multipart::{MultipartError, MultipartForm, MultipartParser, UploadedFile},
};

/// Buffered `multipart/form-data` parser
#[derive(Debug, Clone, Default)]
pub struct FormDataParser {
    max_parts: Option<usize>,
}

impl FormDataParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject bodies with more than `max_parts` parts
    pub fn with_max_parts(mut self, max_parts: usize) -> Self {
        self.max_parts = Some(max_parts);
        self
    }

    fn boundary(content_type: &str) -> Result<String, MultipartError> {
        multer::parse_boundary(content_type).map_err(|e| match e {
            multer::Error::NoBoundary => MultipartError::MissingBoundary,
            _ => MultipartError::NotMultipart(content_type.to_string()),
        })
    }

    async fn read_form(
        &self,
        body: Bytes,
        boundary: String,
    ) -> Result<MultipartForm, MultipartError> {
        let chunks = stream::iter([Ok::<_, Infallible>(body)]);
        let mut multipart = Multipart::new(chunks, boundary);
        let mut form = MultipartForm::new();
        let mut parts = 0usize;

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            parts += 1;
            if self.max_parts.is_some_and(|max| parts > max) {
                return Err(MultipartError::Malformed(format!(
                    "more than {} parts",
                    parts - 1
                )));
            }

            let name = field.name().map(str::to_string).ok_or_else(|| {
                MultipartError::Malformed("part without a content-disposition name".into())
            })?;
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(|mime| mime.to_string());
                    let data = field.bytes().await.map_err(malformed)?;
                    form.add_file(UploadedFile {
                        field: name,
                        file_name,
                        content_type,
                        data,
                    });
                }
                None => {
                    let value = field.text().await.map_err(malformed)?;
                    form.add_field(name, value);
                }
            }
        }

        Ok(form)
    }
}

impl MultipartParser for FormDataParser {
    fn parse(&self, request: &RequestSnapshot) -> Result<MultipartForm, MultipartError> {
        let content_type = request
            .content_type()
            .ok_or_else(|| MultipartError::NotMultipart("missing content-type".into()))?;
        let boundary = Self::boundary(content_type)?;

        // A fully buffered body never leaves the parser waiting on input
        let stalled = || Err(MultipartError::Malformed("multipart stream stalled".into()));
        self.read_form(request.body().clone(), boundary)
            .now_or_never()
            .unwrap_or_else(stalled)
    }
}

fn malformed(error: multer::Error) -> MultipartError {
    MultipartError::Malformed(error.to_string())
}
