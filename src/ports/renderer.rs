use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::Response;
use thiserror::Error;

use crate::core::{request::RequestContext, view::TemplateKind};

/// Error type for view rendering
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RenderError {
    #[error("No renderer registered for {0} templates")]
    NoRenderer(TemplateKind),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Render failed: {0}")]
    Failed(String),

    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for rendering
pub type RenderResult<T> = Result<T, RenderError>;

/// ViewRenderer defines the port for the template engines bound to a kind
#[async_trait]
pub trait ViewRenderer: Send + Sync + 'static {
    /// Render the template at `path` (relative to the view root, without suffix)
    ///
    /// # Arguments
    /// * `kind` - The template kind selected by the dispatcher
    /// * `path` - Template path without its suffix
    /// * `ctx` - The request context, including URL params and multipart fields
    async fn render(
        &self,
        kind: TemplateKind,
        path: &str,
        ctx: &RequestContext,
    ) -> RenderResult<Response<AxumBody>>;
}
