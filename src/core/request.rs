//! Per-request data consumed by the dispatcher.
//!
//! A [`RequestSnapshot`] is built once from the inbound request and never
//! mutated afterwards. Anything derived while dispatching (URL-rewrite
//! parameters, multipart fields, the matched route) lives on the owning
//! [`RequestContext`] instead, so no per-request state ever leaks into the
//! shared dispatcher.
use std::collections::HashMap;

use bytes::Bytes;
use http::{
    HeaderMap, HeaderName, HeaderValue, Method, header::CONTENT_TYPE, request::Parts,
};

use crate::{core::error::DispatchError, ports::multipart::MultipartForm};

/// Normalize a raw request path: strip query/fragment, collapse repeated
/// slashes, drop any trailing slash and resolve `.` / `..` segments.
///
/// `..` never climbs above the root, so `/a/../../b` becomes `/b`. The root
/// is always `/`.
pub fn normalize_path(raw: &str) -> String {
    let trimmed = raw.split(['?', '#']).next().unwrap_or_default();
    let mut segments: Vec<&str> = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    if segments.is_empty() {
        return "/".to_string();
    }

    let mut normalized = String::with_capacity(trimmed.len() + 1);
    for segment in segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    normalized
}

/// Percent-decode a raw URI path and normalize it.
///
/// Decoding happens first, so encoded separators and dot segments
/// (`%2F`, `%2E%2E`) are resolved like their literal forms. Paths that do not
/// decode to UTF-8 are rejected.
pub fn decode_path(raw: &str) -> Result<String, DispatchError> {
    let decoded = urlencoding::decode(raw).map_err(|_| DispatchError::MalformedPath {
        path: raw.to_string(),
    })?;
    Ok(normalize_path(&decoded))
}

/// Read-only view of an inbound request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    method: Method,
    path: String,
    headers: HeaderMap,
    params: HashMap<String, Vec<String>>,
    body: Bytes,
}

impl RequestSnapshot {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: normalize_path(path),
            headers: HeaderMap::new(),
            params: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Build a snapshot from HTTP request parts and the fully buffered body.
    ///
    /// The path is percent-decoded before normalization. Parameters are
    /// collected from the query string and, for
    /// `application/x-www-form-urlencoded` bodies, from the body as well.
    pub fn from_parts(parts: &Parts, body: Bytes) -> Result<Self, DispatchError> {
        let mut snapshot = Self::new(parts.method.clone(), "/");
        snapshot.path = decode_path(parts.uri.path())?;
        snapshot.headers = parts.headers.clone();
        if let Some(query) = parts.uri.query() {
            snapshot = snapshot.with_query(query);
        }
        let is_form = snapshot
            .content_type()
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            for (key, value) in url::form_urlencoded::parse(&body) {
                snapshot.push_param(key.into_owned(), value.into_owned());
            }
        }
        snapshot.body = body;
        Ok(snapshot)
    }

    /// Add a header. Invalid names or values are skipped with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = name, "Skipping invalid request header"),
        }
        self
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.push_param(name.to_string(), value.to_string());
        self
    }

    /// Merge the pairs of an urlencoded query string into the parameters.
    pub fn with_query(mut self, query: &str) -> Self {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            self.push_param(key.into_owned(), value.into_owned());
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    fn push_param(&mut self, name: String, value: String) {
        self.params.entry(name).or_default().push(value);
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header; non-UTF-8 values are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First value of a request parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn param_values(&self, name: &str) -> &[String] {
        self.params.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the client asked for the response without a body.
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}

/// Per-request dispatch state: the snapshot plus everything derived from it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: RequestSnapshot,
    resolved_path: String,
    url_params: Vec<String>,
    multipart: Option<MultipartForm>,
    route: Option<String>,
}

impl RequestContext {
    pub fn new(request: RequestSnapshot) -> Self {
        let resolved_path = request.path().to_string();
        Self {
            request,
            resolved_path,
            url_params: Vec::new(),
            multipart: None,
            route: None,
        }
    }

    pub fn request(&self) -> &RequestSnapshot {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// The normalized inbound path.
    pub fn path(&self) -> &str {
        self.request.path()
    }

    /// The path after URL-rewrite splitting (equal to [`Self::path`] otherwise).
    pub fn resolved_path(&self) -> &str {
        &self.resolved_path
    }

    /// Ordered URL-rewrite parameters, in the order they appeared in the path.
    pub fn url_params(&self) -> &[String] {
        &self.url_params
    }

    pub fn url_param(&self, index: usize) -> Option<&str> {
        self.url_params.get(index).map(String::as_str)
    }

    pub fn multipart(&self) -> Option<&MultipartForm> {
        self.multipart.as_ref()
    }

    /// The registered path of the matched route, if dispatch went through a mapping.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Parameter lookup that also sees multipart text fields once the
    /// request has been wrapped for upload.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request
            .param(name)
            .or_else(|| self.multipart.as_ref().and_then(|form| form.field(name)))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    pub(crate) fn set_url_params(&mut self, base: String, params: Vec<String>) {
        self.resolved_path = base;
        self.url_params = params;
    }

    pub(crate) fn attach_multipart(&mut self, form: MultipartForm) {
        self.multipart = Some(form);
    }

    pub(crate) fn set_route(&mut self, route: &str) {
        self.route = Some(route.to_string());
    }
}
