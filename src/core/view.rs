//! Render targets selected by the dispatcher.
//!
//! A [`View`] is opaque to the dispatch core: it only names what should be
//! rendered. Turning it into bytes is the job of a
//! [`ViewRenderer`](crate::ports::renderer::ViewRenderer).
use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Template families the convention probe knows how to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Html,
    Jsp,
    Freemarker,
    Velocity,
}

impl TemplateKind {
    /// Default convention probe order.
    pub const DEFAULT_PRECEDENCE: [TemplateKind; 4] = [
        TemplateKind::Html,
        TemplateKind::Jsp,
        TemplateKind::Freemarker,
        TemplateKind::Velocity,
    ];

    /// File suffix (including the dot) backing this kind.
    pub fn suffix(&self) -> &'static str {
        match self {
            TemplateKind::Html => ".html",
            TemplateKind::Jsp => ".jsp",
            TemplateKind::Freemarker => ".ftl",
            TemplateKind::Velocity => ".vm",
        }
    }

    /// Resolve a suffix, with or without the leading dot.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let normalized = suffix.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::DEFAULT_PRECEDENCE
            .into_iter()
            .find(|kind| kind.suffix()[1..] == normalized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Html => "html",
            TemplateKind::Jsp => "jsp",
            TemplateKind::Freemarker => "freemarker",
            TemplateKind::Velocity => "velocity",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// A template bound by path relative to the view root, without its suffix.
    Template { kind: TemplateKind, path: String },
    /// A bare status response.
    Status(StatusCode),
    Redirect { location: String },
}

impl View {
    pub fn template(kind: TemplateKind, path: impl Into<String>) -> Self {
        View::Template {
            kind,
            path: path.into(),
        }
    }

    /// Bind a template from a path carrying its suffix, e.g. `users/list.jsp`.
    /// Returns `None` when the suffix is not a known template kind.
    pub fn from_template_file(file: &str) -> Option<Self> {
        let trimmed = file.trim_start_matches('/');
        let (stem, suffix) = trimmed.rsplit_once('.')?;
        let kind = TemplateKind::from_suffix(suffix)?;
        Some(View::template(kind, stem))
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        View::Redirect {
            location: location.into(),
        }
    }

    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            View::Template { kind, .. } => kind.as_str(),
            View::Status(_) => "status",
            View::Redirect { .. } => "redirect",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Template { kind, path } => write!(f, "{kind}:{path}"),
            View::Status(code) => write!(f, "status:{}", code.as_u16()),
            View::Redirect { location } => write!(f, "redirect:{location}"),
        }
    }
}
