use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::DispatchConfig;

/// Load configuration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<DispatchConfig> {
    let owned = config_path.to_string();
    tokio::task::spawn_blocking(move || load_config_sync(&owned))
        .await
        .wrap_err("Config loading task panicked")?
}

/// Load configuration synchronously
pub fn load_config_sync(config_path: &str) -> Result<DispatchConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml, // Default to TOML
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let dispatch_config: DispatchConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(dispatch_config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::config::models::ViewAction;

    #[tokio::test]
    async fn test_load_toml_config() {
        let toml_content = r#"
listen_addr = "127.0.0.1:3000"

[convention]
enabled = true
url_rewrite = true
deny_paths = ["/admin"]
extensions = [".jsp", ".html"]
base_view_path = "./templates"

[[routes]]
path = "/api/ping"
methods = ["GET", "HEAD"]
action = { type = "status", code = 204 }

[routes.params]
format = "*"

[[interceptor_rules]]
pattern = "/member*"
unless_header = "authorization"
action = { type = "redirect", location = "/login" }
"#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert!(config.convention.enabled);
        assert!(config.convention.url_rewrite);
        assert!(!config.convention.interceptor_mode);
        assert_eq!(config.convention.url_param_separator, "_");
        assert_eq!(config.convention.extensions, vec![".jsp", ".html"]);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].action, ViewAction::Status { code: 204 });
        assert_eq!(config.routes[0].params.get("format").map(String::as_str), Some("*"));
        assert_eq!(config.interceptor_rules.len(), 1);
        assert_eq!(
            config.interceptor_rules[0].action,
            ViewAction::Redirect {
                location: "/login".into()
            }
        );
    }

    #[tokio::test]
    async fn test_load_yaml_config() {
        let yaml_content = r#"
listen_addr: "127.0.0.1:3000"
convention:
  enabled: true
  probe_cache: true
routes:
  - path: "/users"
    action:
      type: "view"
      template: "users/list.jsp"
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert!(config.convention.probe_cache);
        assert_eq!(config.convention.extensions.len(), 4);
        assert_eq!(config.routes.len(), 1);
        assert!(config.routes[0].methods.is_empty());
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let json_content = r#"
{
  "listen_addr": "127.0.0.1:3000",
  "routes": [
    {
      "path": "/old",
      "action": { "type": "redirect", "location": "/new" }
    }
  ]
}
"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, "{}", json_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert!(!config.convention.enabled);
        assert_eq!(config.routes.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        assert!(load_config("/definitely/not/here.toml").await.is_err());
    }
}
