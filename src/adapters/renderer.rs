use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::{
    body::Body as AxumBody,
    http::{StatusCode, header},
};
use hyper::Response;

use crate::{
    adapters::file_system::FileResourceStore,
    core::{
        dispatcher::Resolution,
        request::RequestContext,
        view::{TemplateKind, View},
    },
    ports::{
        renderer::{RenderError, RenderResult, ViewRenderer},
        resource_store::ResourceError,
    },
};

/// Turns a [`Resolution`] into an HTTP response.
///
/// Status and redirect views are answered directly; template views go to the
/// renderer registered for their kind.
#[derive(Default, Clone)]
pub struct RendererRegistry {
    renderers: HashMap<TemplateKind, Arc<dyn ViewRenderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a renderer to a template kind, replacing any previous binding
    pub fn register(&mut self, kind: TemplateKind, renderer: Arc<dyn ViewRenderer>) -> &mut Self {
        self.renderers.insert(kind, renderer);
        self
    }

    pub fn with(mut self, kind: TemplateKind, renderer: Arc<dyn ViewRenderer>) -> Self {
        self.register(kind, renderer);
        self
    }

    pub fn supports(&self, kind: TemplateKind) -> bool {
        self.renderers.contains_key(&kind)
    }

    pub async fn render(&self, resolution: &Resolution) -> RenderResult<Response<AxumBody>> {
        let ctx = &resolution.context;
        let response = match &resolution.view {
            View::Status(status) => build_response(*status, None, AxumBody::empty())?,
            View::Redirect { location } => build_response(
                StatusCode::FOUND,
                Some((header::LOCATION.as_str(), location.as_str())),
                AxumBody::empty(),
            )?,
            View::Template { kind, path } => {
                let renderer = self
                    .renderers
                    .get(kind)
                    .ok_or(RenderError::NoRenderer(*kind))?;
                renderer.render(*kind, path, ctx).await?
            }
        };

        if ctx.request().is_head() {
            let (parts, _) = response.into_parts();
            return Ok(Response::from_parts(parts, AxumBody::empty()));
        }
        Ok(response)
    }
}

fn build_response(
    status: StatusCode,
    header: Option<(&str, &str)>,
    body: AxumBody,
) -> RenderResult<Response<AxumBody>> {
    let mut builder = Response::builder().status(status);
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }
    builder
        .body(body)
        .map_err(|e| RenderError::Failed(e.to_string()))
}

/// Serves template files verbatim from the view directory.
///
/// Bound to [`TemplateKind::Html`] by default; plain HTML needs no engine.
pub struct FileTemplateRenderer {
    store: FileResourceStore,
}

impl FileTemplateRenderer {
    pub fn new(store: FileResourceStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ViewRenderer for FileTemplateRenderer {
    async fn render(
        &self,
        kind: TemplateKind,
        path: &str,
        _ctx: &RequestContext,
    ) -> RenderResult<Response<AxumBody>> {
        let file = format!("{path}{}", kind.suffix());
        let contents = self.store.read(&file).await.map_err(|e| match e {
            ResourceError::InvalidPath(_) => RenderError::TemplateNotFound(file.clone()),
            ResourceError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                RenderError::TemplateNotFound(file.clone())
            }
            ResourceError::IoError(io) => RenderError::IoError(io),
        })?;

        tracing::debug!(template = %file, bytes = contents.len(), "Rendered template file");
        build_response(
            StatusCode::OK,
            Some((header::CONTENT_TYPE.as_str(), "text/html; charset=utf-8")),
            AxumBody::from(contents),
        )
    }
}
