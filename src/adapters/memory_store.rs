use std::{
    collections::HashSet,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::ports::resource_store::{ResourceError, ResourceResult, ResourceStore};

/// Resource store backed by a fixed set of relative paths
///
/// Counts every probe so callers can observe how much of the extension
/// list convention resolution actually walked.
#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    files: HashSet<String>,
    probes: AtomicUsize,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<'a>(files: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|f| f.trim_start_matches('/').to_string())
                .collect(),
            probes: AtomicUsize::new(0),
        }
    }

    /// Number of `exists` calls served so far
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }
}

impl ResourceStore for InMemoryResourceStore {
    fn exists(&self, path: &str) -> ResourceResult<bool> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let relative = path.trim_start_matches('/');
        if relative.split('/').any(|segment| segment == "..") {
            return Err(ResourceError::InvalidPath(
                "Path traversal attempt detected".to_string(),
            ));
        }
        Ok(self.files.contains(relative))
    }
}
