use thiserror::Error;

/// Error type for resource store operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ResourceError {
    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error when path is invalid
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for resource store operations
pub type ResourceResult<T> = Result<T, ResourceError>;

/// ResourceStore defines the port for the backing storage probed by
/// convention resolution
///
/// The probe runs inside the synchronous dispatch pass, so implementations
/// must answer without suspending.
pub trait ResourceStore: Send + Sync + 'static {
    /// Whether a resource exists at `path`, relative to the store root
    fn exists(&self, path: &str) -> ResourceResult<bool>;
}
