//! Configuration data structures for the dispatcher.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files. They are
//! serde‑friendly and include defaults so that minimal configs remain concise.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default function for the URL-rewrite separator
fn default_url_param_separator() -> String {
    "_".to_string()
}

/// Default function for the convention probe order
fn default_extensions() -> Vec<String> {
    [".html", ".jsp", ".ftl", ".vm"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Default function for the view root
fn default_base_view_path() -> String {
    "./views".to_string()
}

/// Convention-mode settings for requests that match no declared route
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ConventionSettings {
    /// Resolve unmapped requests by probing the view directory
    pub enabled: bool,
    /// Evaluate interceptor rules before probing
    pub interceptor_mode: bool,
    /// Split trailing `_`-separated segments off the path as URL parameters
    pub url_rewrite: bool,
    /// Separator used by URL rewriting (a single character)
    #[serde(default = "default_url_param_separator")]
    pub url_param_separator: String,
    /// Path prefixes never resolved by convention (checked first)
    pub deny_paths: Vec<String>,
    /// Path prefixes resolved by convention; empty allows everything not denied
    pub allow_paths: Vec<String>,
    /// View suffixes in probe order
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Root directory holding the view files
    #[serde(default = "default_base_view_path")]
    pub base_view_path: String,
    /// Memoize successful probes until the next reload
    pub probe_cache: bool,
}

impl Default for ConventionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interceptor_mode: false,
            url_rewrite: false,
            url_param_separator: default_url_param_separator(),
            deny_paths: Vec::new(),
            allow_paths: Vec::new(),
            extensions: default_extensions(),
            base_view_path: default_base_view_path(),
            probe_cache: false,
        }
    }
}

/// What a declared route or rule answers with
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewAction {
    /// Render a template; the kind comes from the file suffix (e.g. `users/list.jsp`)
    View { template: String },
    /// Answer with a bare status code
    Status { code: u16 },
    Redirect { location: String },
}

/// A route declared in configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    pub path: String,
    /// Allowed methods; empty means `GET` only
    #[serde(default)]
    pub methods: Vec<String>,
    /// Required headers (name → value, compared case-insensitively)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Required parameters (name → value, or `*` for presence only)
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Parse multipart bodies of POST requests before the action runs
    #[serde(default)]
    pub upload: bool,
    pub action: ViewAction,
}

/// An interceptor rule declared in configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InterceptorRuleConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Exact path, or a prefix when it ends with `*`
    pub pattern: String,
    /// Do not fire when this header is present
    #[serde(default)]
    pub unless_header: Option<String>,
    /// Do not fire when this parameter is present
    #[serde(default)]
    pub unless_param: Option<String>,
    pub action: ViewAction,
}

/// Top-level dispatcher configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    pub listen_addr: String,
    /// Upper bound for buffered request bodies, in bytes
    pub max_body_bytes: usize,
    pub convention: ConventionSettings,
    pub routes: Vec<RouteConfig>,
    pub interceptor_rules: Vec<InterceptorRuleConfig>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
            convention: ConventionSettings::default(),
            routes: Vec::new(),
            interceptor_rules: Vec::new(),
        }
    }
}
