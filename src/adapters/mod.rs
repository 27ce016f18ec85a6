pub mod config_providers;
pub mod file_system;
pub mod http_handler;
pub mod memory_store;
pub mod multipart;
pub mod renderer;

/// Re-export commonly used types from adapters
pub use config_providers::FileConfigProvider;
pub use file_system::FileResourceStore;
pub use http_handler::{DispatchHandler, error_response};
pub use memory_store::InMemoryResourceStore;
pub use multipart::FormDataParser;
pub use renderer::{FileTemplateRenderer, RendererRegistry};
