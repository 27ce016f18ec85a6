use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::ports::resource_store::{ResourceError, ResourceResult, ResourceStore};

/// Resource store rooted at the view directory on local disk
#[derive(Debug, Clone)]
pub struct FileResourceStore {
    root: PathBuf,
}

impl FileResourceStore {
    /// Create a store rooted at `root`, which must be an existing directory
    pub fn new(root: impl AsRef<Path>) -> ResourceResult<Self> {
        let root = std::fs::canonicalize(root.as_ref()).map_err(ResourceError::IoError)?;
        if !root.is_dir() {
            return Err(ResourceError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `path` onto the root and make sure the result cannot escape it.
    ///
    /// Returns `Ok(None)` for a path that stays inside the root but does not exist.
    fn locate(&self, path: &str) -> ResourceResult<Option<PathBuf>> {
        let relative = path.trim_start_matches('/');
        // Parent segments are refused even when they would land back inside the root
        if relative.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(ResourceError::InvalidPath(
                "Path traversal attempt detected".to_string(),
            ));
        }
        let full_path = self.root.join(relative);

        let canonical_path = match std::fs::canonicalize(&full_path) {
            Ok(p) => p,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Missing file: only a miss if its parent would still be within root
                return match full_path
                    .parent()
                    .and_then(|p| std::fs::canonicalize(p).ok())
                {
                    Some(parent) if parent.starts_with(&self.root) => Ok(None),
                    None => Ok(None),
                    _ => Err(ResourceError::InvalidPath(
                        "Path traversal attempt detected".to_string(),
                    )),
                };
            }
            Err(e) => return Err(ResourceError::IoError(e)),
        };

        if !canonical_path.starts_with(&self.root) {
            return Err(ResourceError::InvalidPath(
                "Path traversal attempt detected".to_string(),
            ));
        }
        Ok(Some(canonical_path))
    }

    /// Read a resource relative to the root
    pub async fn read(&self, path: &str) -> ResourceResult<Vec<u8>> {
        let located = self.locate(path)?.ok_or_else(|| {
            ResourceError::IoError(std::io::Error::new(
                ErrorKind::NotFound,
                format!("{path} not found"),
            ))
        })?;
        tokio::fs::read(&located)
            .await
            .map_err(ResourceError::IoError)
    }
}

impl ResourceStore for FileResourceStore {
    fn exists(&self, path: &str) -> ResourceResult<bool> {
        match self.locate(path)? {
            Some(located) => match std::fs::metadata(&located) {
                Ok(metadata) => Ok(metadata.is_file()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(ResourceError::IoError(e)),
            },
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn create_test_file(dir: &TempDir, path: &str, content: &str) -> std::io::Result<()> {
        let full_path = dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(full_path, content).await
    }

    #[tokio::test]
    async fn test_file_exists() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(&temp_dir, "test.html", "content")
            .await
            .unwrap();
        create_test_file(&temp_dir, "nested/page.jsp", "content")
            .await
            .unwrap();
        let store = FileResourceStore::new(temp_dir.path()).unwrap();

        assert!(store.exists("test.html").unwrap());
        assert!(store.exists("/nested/page.jsp").unwrap());
        assert!(!store.exists("nonexistent.html").unwrap());
        assert!(!store.exists("missing_dir/page.html").unwrap());
        // directories are not resources
        assert!(!store.exists("nested").unwrap());
    }

    #[tokio::test]
    async fn test_read_file() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(&temp_dir, "test.html", "<p>Hello</p>")
            .await
            .unwrap();
        let store = FileResourceStore::new(temp_dir.path()).unwrap();

        let result = store.read("test.html").await.unwrap();
        assert_eq!(result, b"<p>Hello</p>");
        assert!(store.read("absent.html").await.is_err());
    }

    #[tokio::test]
    async fn test_path_traversal_protection() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(&temp_dir, "views/index.html", "x")
            .await
            .unwrap();
        let store = FileResourceStore::new(temp_dir.path().join("views")).unwrap();

        assert!(matches!(
            store.exists("../../../etc/passwd"),
            Err(ResourceError::InvalidPath(_))
        ));
        assert!(matches!(
            store.read("../sensitive_file.txt").await,
            Err(ResourceError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_parent_segments_rejected_inside_root() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(&temp_dir, "admin/secret.html", "TOP SECRET")
            .await
            .unwrap();
        tokio::fs::create_dir_all(temp_dir.path().join("pub"))
            .await
            .unwrap();
        let store = FileResourceStore::new(temp_dir.path()).unwrap();

        assert!(store.exists("admin/secret.html").unwrap());
        assert!(matches!(
            store.exists("pub/../admin/secret.html"),
            Err(ResourceError::InvalidPath(_))
        ));
        assert!(matches!(
            store.read("/pub/../admin/secret.html").await,
            Err(ResourceError::InvalidPath(_))
        ));
        // Dots inside a segment are ordinary characters
        assert!(!store.exists("notes..html").unwrap());
    }

    #[test]
    fn test_missing_root_is_rejected() {
        assert!(FileResourceStore::new("/definitely/not/a/view/root").is_err());
    }
}
