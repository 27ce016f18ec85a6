pub mod config_provider;
pub mod handler;
pub mod multipart;
pub mod renderer;
pub mod resource_store;
