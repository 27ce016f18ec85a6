use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eyre::{Context, Result};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::{
    config::{loader::load_config, models::DispatchConfig},
    ports::config_provider::ConfigProvider,
};

/// Configuration provider that loads from a local file and watches for changes.
pub struct FileConfigProvider {
    path: PathBuf,
    // Dropping the watcher stops the notifications
    _watcher: Option<notify::RecommendedWatcher>,
    update_tx: mpsc::Sender<()>,
    // Taken by the first `watch()` call
    update_rx: std::sync::Mutex<Option<mpsc::Receiver<()>>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (tx, rx) = mpsc::channel(1);

        let mut provider = Self {
            path,
            _watcher: None,
            update_tx: tx,
            update_rx: std::sync::Mutex::new(Some(rx)),
        };

        provider.init_watcher()?;
        Ok(provider)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init_watcher(&mut self) -> Result<()> {
        let tx = self.update_tx.clone();
        let config_filename = self
            .path
            .file_name()
            .ok_or_else(|| eyre::eyre!("Invalid config path: {}", self.path.display()))?
            .to_owned();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        if (event.kind.is_modify()
                            || event.kind.is_create()
                            || event.kind.is_remove())
                            && event
                                .paths
                                .iter()
                                .any(|p| p.file_name() == Some(&config_filename))
                        {
                            tracing::debug!(kind = ?event.kind, "Config file changed");
                            // A full channel already holds a pending reload
                            let _ = tx.try_send(());
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "File watch error"),
                }
            })?;

        let watch_dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        watcher
            .watch(watch_dir, RecursiveMode::NonRecursive)
            .wrap_err("Failed to watch config directory")?;

        self._watcher = Some(watcher);
        Ok(())
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load_config(&self) -> Result<DispatchConfig> {
        let path_str = self
            .path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", self.path.display()))?;
        load_config(path_str).await
    }

    fn watch(&self) -> Result<mpsc::Receiver<()>> {
        self.update_rx
            .lock()
            .map_err(|_| eyre::eyre!("Config watch receiver lock poisoned"))?
            .take()
            .ok_or_else(|| eyre::eyre!("Config watch can only be started once"))
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Write};

    use tempfile::tempdir;
    use tokio::time::{Duration, sleep};

    use super::*;

    #[tokio::test]
    async fn test_file_config_provider() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("dispatch.toml");

        let initial_config = r#"
            listen_addr = "127.0.0.1:8080"
            [[routes]]
            path = "/"
            action = { type = "view", template = "index.html" }
        "#;
        {
            let mut file = File::create(&file_path)?;
            file.write_all(initial_config.as_bytes())?;
        }

        let provider = FileConfigProvider::new(&file_path)?;
        let config = provider.load_config().await?;
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.routes.len(), 1);

        let mut rx = provider.watch()?;
        assert!(provider.watch().is_err());

        let new_config = r#"
            listen_addr = "127.0.0.1:9090"
            [convention]
            enabled = true
        "#;

        // Let the watcher settle before the write
        sleep(Duration::from_millis(100)).await;

        {
            let mut file = File::create(&file_path)?;
            file.write_all(new_config.as_bytes())?;
        }

        let notification = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(notification.is_ok(), "Timed out waiting for config update");
        assert!(
            notification.unwrap().is_some(),
            "Channel closed unexpectedly"
        );

        let config = provider.load_config().await?;
        assert_eq!(config.listen_addr, "127.0.0.1:9090");
        assert!(config.convention.enabled);
        assert!(config.routes.is_empty());

        Ok(())
    }
}
