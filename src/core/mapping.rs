//! Explicit route registrations.
//!
//! Routes are keyed by their exact, normalized path. The method set lives
//! inside the descriptor so that a request with the right path but the wrong
//! method still resolves to the route and can be answered with 405.
use std::{collections::HashMap, fmt, sync::Arc};

use http::Method;

use crate::{
    core::{error::RegistrationError, request::normalize_path},
    ports::handler::Handler,
};

/// Expected value of a required request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamConstraint {
    /// `*`: the parameter must be present, any value passes.
    Present,
    /// The first value must equal this one, ignoring case.
    Equals(String),
}

impl ParamConstraint {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == "*" {
            ParamConstraint::Present
        } else {
            ParamConstraint::Equals(trimmed.to_string())
        }
    }
}

/// A registered route: path, allowed methods, allow-lists and handler.
#[derive(Clone)]
pub struct RouteDescriptor {
    path: String,
    methods: Vec<Method>,
    headers: Vec<(String, String)>,
    params: Vec<(String, ParamConstraint)>,
    upload: bool,
    handler: Arc<dyn Handler>,
}

impl RouteDescriptor {
    pub fn builder(path: &str, handler: Arc<dyn Handler>) -> RouteBuilder {
        RouteBuilder {
            path: path.to_string(),
            methods: Vec::new(),
            headers: Vec::new(),
            params: Vec::new(),
            upload: false,
            handler,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Required headers in declaration order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Required parameters in declaration order.
    pub fn params(&self) -> &[(String, ParamConstraint)] {
        &self.params
    }

    pub fn is_upload(&self) -> bool {
        self.upload
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("upload", &self.upload)
            .finish_non_exhaustive()
    }
}

pub struct RouteBuilder {
    path: String,
    methods: Vec<Method>,
    headers: Vec<(String, String)>,
    params: Vec<(String, ParamConstraint)>,
    upload: bool,
    handler: Arc<dyn Handler>,
}

impl RouteBuilder {
    pub fn method(mut self, method: Method) -> Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    pub fn methods(self, methods: impl IntoIterator<Item = Method>) -> Self {
        methods.into_iter().fold(self, Self::method)
    }

    pub fn header(mut self, name: &str, expected: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), expected.to_string()));
        self
    }

    /// Require a parameter; `"*"` only requires presence.
    pub fn param(mut self, name: &str, expected: &str) -> Self {
        self.params
            .push((name.to_string(), ParamConstraint::parse(expected)));
        self
    }

    pub fn upload(mut self, upload: bool) -> Self {
        self.upload = upload;
        self
    }

    /// Finish the descriptor. A route that declares no method allows `GET`.
    pub fn build(self) -> Result<RouteDescriptor, RegistrationError> {
        if !self.path.starts_with('/') {
            return Err(RegistrationError::InvalidPath { path: self.path });
        }
        let methods = if self.methods.is_empty() {
            vec![Method::GET]
        } else {
            self.methods
        };
        Ok(RouteDescriptor {
            path: normalize_path(&self.path),
            methods,
            headers: self.headers,
            params: self.params,
            upload: self.upload,
            handler: self.handler,
        })
    }
}

/// Exact-path route table. Populated during startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct MappingTable {
    routes: HashMap<String, RouteDescriptor>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: RouteDescriptor) -> Result<(), RegistrationError> {
        if self.routes.contains_key(descriptor.path()) {
            return Err(RegistrationError::DuplicateRoute {
                path: descriptor.path().to_string(),
            });
        }
        tracing::debug!(
            path = descriptor.path(),
            methods = ?descriptor.methods(),
            upload = descriptor.is_upload(),
            "Registered route"
        );
        self.routes.insert(descriptor.path().to_string(), descriptor);
        Ok(())
    }

    /// Look up the route owning `path` (already normalized).
    pub fn resolve(&self, path: &str) -> Option<&RouteDescriptor> {
        self.routes.get(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}
