//! mvc-dispatch - the request-dispatch core of a server-side MVC framework.
//!
//! Every incoming request is resolved to a *view* in one of two ways:
//!
//! - **Mapped**: the normalized path matches a registered [`RouteDescriptor`]. The
//!   request must satisfy the route's method, header and parameter constraints
//!   (method → 405, header/param → 400), upload routes get their multipart body
//!   parsed, and the route's [`Handler`](ports::handler::Handler) produces the view.
//! - **Convention**: no route matches. Deny/allow prefixes filter the path,
//!   interceptor rules may short-circuit, trailing `_`-separated URL parameters are
//!   split off, and the view directory is probed for `.html`, `.jsp`, `.ftl` and
//!   `.vm` files in that order. The first existing file wins.
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use http::Method;
//! use mvc_dispatch::{
//!     adapters::FileResourceStore,
//!     core::{ConventionConfig, Dispatcher, RequestSnapshot},
//! };
//!
//! # fn main() -> eyre::Result<()> {
//! let store = FileResourceStore::new("./views")?;
//! let convention = ConventionConfig {
//!     enabled: true,
//!     url_rewrite: true,
//!     ..ConventionConfig::default()
//! };
//! let dispatcher = Dispatcher::builder(convention, Arc::new(store)).build();
//!
//! let resolution = dispatcher.dispatch(RequestSnapshot::new(Method::GET, "/user_42"))?;
//! println!("{} {:?}", resolution.view, resolution.context.url_params());
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! Pure dispatch logic lives in [`core`]. The seams it depends on (resource probing,
//! handlers, multipart parsing, rendering, configuration sources) are traits in
//! [`ports`], with implementations in [`adapters`]. A built [`Dispatcher`] is
//! immutable; configuration reloads build a new one and swap it in atomically.
//!
//! # Error Handling
//! Dispatch outcomes are typed ([`DispatchError`]); loaders and the binary use
//! `eyre::Result<T>` with context attached via `WrapErr`.
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;

pub mod adapters;
pub mod core;

// Re-export the types most embedders need
pub use crate::{
    adapters::{DispatchHandler, FileResourceStore, RendererRegistry},
    config::DispatchConfig,
    core::{
        DispatchError, DispatchMode, Dispatcher, DispatcherBuilder, RequestContext,
        RequestSnapshot, Resolution, RouteDescriptor, TemplateKind, View,
    },
};
