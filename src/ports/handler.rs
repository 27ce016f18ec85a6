use thiserror::Error;

use crate::core::{request::RequestContext, view::View};

/// Error type for handler execution
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// The handler ran but could not produce a result
    #[error("Handler failed: {0}")]
    Failed(String),

    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for handler execution
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Handler defines the port for the code bound to a registered route
pub trait Handler: Send + Sync + 'static {
    /// Execute the handler for a request that passed every route constraint
    ///
    /// # Returns
    /// The view to render, `None` when the handler has nothing to show
    /// (reported as not found), or an error (reported as an internal error)
    fn execute(&self, ctx: &RequestContext) -> HandlerResult<Option<View>>;
}

impl<F> Handler for F
where
    F: Fn(&RequestContext) -> HandlerResult<Option<View>> + Send + Sync + 'static,
{
    fn execute(&self, ctx: &RequestContext) -> HandlerResult<Option<View>> {
        self(ctx)
    }
}

/// ConventionHook lets the application claim an unmapped request after URL
/// parameters were extracted and before the extension probe runs
pub trait ConventionHook: Send + Sync + 'static {
    fn on_convention(&self, ctx: &RequestContext) -> Option<View>;
}

impl<F> ConventionHook for F
where
    F: Fn(&RequestContext) -> Option<View> + Send + Sync + 'static,
{
    fn on_convention(&self, ctx: &RequestContext) -> Option<View> {
        self(ctx)
    }
}
