use std::{path::Path, sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use http::Method;
use mvc_dispatch::{
    adapters::{
        DispatchHandler, FileConfigProvider, FileResourceStore, FileTemplateRenderer,
        FormDataParser, InMemoryResourceStore, RendererRegistry,
    },
    config::{DispatchConfig, DispatchConfigValidator, loader::load_config},
    core::{Dispatcher, DispatcherBuilder, RequestSnapshot, TemplateKind},
    metrics,
    ports::{config_provider::ConfigProvider, resource_store::ResourceStore},
    tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "dispatch.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "dispatch.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "dispatch.toml")]
        config: String,
    },
    /// Start the dispatch server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "dispatch.toml")]
        config: String,

        /// Human-readable logs instead of JSON
        #[clap(long)]
        pretty: bool,
    },
    /// Dispatch a single request against a configuration and print the result
    Resolve {
        #[clap(short, long, default_value = "dispatch.toml")]
        config: String,

        /// HTTP method
        #[clap(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request path, optionally with a query string
        path: String,

        /// Request header as `name:value` (repeatable)
        #[clap(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

/// Build the dispatcher and renderers for a configuration.
///
/// When the view directory is missing and convention mode is off, routes
/// still work but nothing can be probed or rendered from disk.
fn build_dispatcher(config: &DispatchConfig) -> Result<(Dispatcher, RendererRegistry)> {
    let view_root = &config.convention.base_view_path;
    let mut renderers = RendererRegistry::new();

    let store: Arc<dyn ResourceStore> = if Path::new(view_root).is_dir() {
        let files = FileResourceStore::new(view_root)
            .with_context(|| format!("Failed to open view directory {view_root}"))?;
        renderers.register(
            TemplateKind::Html,
            Arc::new(FileTemplateRenderer::new(files.clone())),
        );
        Arc::new(files)
    } else if config.convention.enabled {
        return Err(eyre!("View directory '{view_root}' does not exist"));
    } else {
        tracing::warn!(
            view_root = %view_root,
            "View directory missing; template views will fail to render"
        );
        Arc::new(InMemoryResourceStore::new())
    };

    let mut builder = DispatcherBuilder::from_config(config, store)
        .context("Failed to register configured routes")?;
    builder.multipart_parser(Arc::new(FormDataParser::new()));
    Ok((builder.build(), renderers))
}

async fn load_validated(provider: &dyn ConfigProvider) -> Result<DispatchConfig> {
    let config = provider.load_config().await?;
    DispatchConfigValidator::validate(&config).map_err(|e| eyre!("{e}"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config).await,
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Resolve {
            config,
            method,
            path,
            headers,
        }) => resolve_command(&config, &method, &path, &headers).await,
        Some(Commands::Serve { config, pretty }) => serve(&config, pretty).await,
        None => serve(&args.config, false).await,
    }
}

async fn serve(config_path: &str, pretty: bool) -> Result<()> {
    if pretty {
        tracing_setup::init_console_tracing()?;
    } else {
        tracing_setup::init_tracing()?;
    }
    metrics::init_metrics()?;

    tracing::info!(config = %config_path, "Loading initial configuration");
    let config_provider: Arc<dyn ConfigProvider> = Arc::new(
        FileConfigProvider::new(config_path).context("Failed to create config provider")?,
    );
    let initial_config = load_validated(config_provider.as_ref())
        .await
        .with_context(|| format!("Failed to load initial config from {config_path}"))?;

    let (dispatcher, renderers) = build_dispatcher(&initial_config)?;
    let dispatcher_holder = Arc::new(ArcSwap::from_pointee(dispatcher));

    // Config watcher task
    let mut notify_rx = config_provider.watch()?;
    let provider_for_watcher = config_provider.clone();
    let holder_for_watcher = dispatcher_holder.clone();
    let base_config = initial_config.clone();
    let debounce_duration = Duration::from_secs(2);

    tokio::spawn(async move {
        tracing::info!("Config watcher task started");
        let mut last_reload = tokio::time::Instant::now();
        last_reload = last_reload
            .checked_sub(debounce_duration)
            .unwrap_or(last_reload);

        while notify_rx.recv().await.is_some() {
            if last_reload.elapsed() < debounce_duration {
                tracing::debug!("Debouncing config reload event");
                while notify_rx.try_recv().is_ok() {}
                continue;
            }
            last_reload = tokio::time::Instant::now();

            let reloaded = load_validated(provider_for_watcher.as_ref())
                .await
                .and_then(|config| {
                    if config.convention.base_view_path != base_config.convention.base_view_path {
                        return Err(eyre!(
                            "base_view_path cannot change at runtime; restart to apply"
                        ));
                    }
                    if config.listen_addr != base_config.listen_addr {
                        tracing::warn!(
                            listen_addr = %config.listen_addr,
                            "listen_addr changes take effect after restart"
                        );
                    }
                    build_dispatcher(&config).map(|(dispatcher, _)| dispatcher)
                });

            match reloaded {
                Ok(dispatcher) => {
                    holder_for_watcher.store(Arc::new(dispatcher));
                    metrics::increment_config_reload(true);
                    tracing::info!("Configuration reloaded; new dispatcher active");
                }
                Err(e) => {
                    metrics::increment_config_reload(false);
                    tracing::error!(
                        error = %e,
                        "Failed to reload configuration; keeping the current dispatcher"
                    );
                }
            }
            while notify_rx.try_recv().is_ok() {}
        }
        tracing::info!("Config watcher task is shutting down");
    });

    let handler = DispatchHandler::new(
        dispatcher_holder,
        Arc::new(renderers),
        initial_config.max_body_bytes,
    );
    let app = handler.router();

    let listener = tokio::net::TcpListener::bind(&initial_config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", initial_config.listen_addr))?;

    tracing::info!(
        listen_addr = %initial_config.listen_addr,
        routes = initial_config.routes.len(),
        convention = initial_config.convention.enabled,
        "Dispatch server starting"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Dispatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down gracefully"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down gracefully"),
    }
}

/// Validate a configuration file
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match DispatchConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Routes: {}", config.routes.len());
            println!("   • Interceptor Rules: {}", config.interceptor_rules.len());
            println!("   • Convention Mode: {}", config.convention.enabled);
            println!("   • View Directory: {}", config.convention.base_view_path);
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure every route path and rule pattern starts with '/'");
            println!("   • Use view extensions from .html, .jsp, .ftl and .vm");
            println!("   • Verify listen address format (e.g., '127.0.0.1:3000')");
            println!("   • Create the view directory before enabling convention mode");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Request dispatcher configuration

# The address to listen on
listen_addr = "127.0.0.1:8080"

# Resolve unmapped paths to view files
[convention]
enabled = true
interceptor_mode = true
url_rewrite = true
url_param_separator = "_"
deny_paths = ["/admin"]
allow_paths = []
extensions = [".html", ".jsp", ".ftl", ".vm"]
base_view_path = "./views"

# Example route: status-only health probe
[[routes]]
path = "/health"
methods = ["GET", "HEAD"]
action = { type = "status", code = 200 }

# Example route: header-gated view
# [[routes]]
# path = "/reports"
# headers = { x-client = "dashboard" }
# params = { format = "*" }
# action = { type = "view", template = "reports/list.html" }

# Example interceptor rule: send anonymous visitors to the login page
[[interceptor_rules]]
name = "members-only"
pattern = "/members*"
unless_header = "authorization"
action = { type = "redirect", location = "/login" }
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'mvc-dispatch serve --config {config_path}' to start the server");
    Ok(())
}

/// Dry-run one request against a configuration
async fn resolve_command(
    config_path: &str,
    method: &str,
    target: &str,
    headers: &[String],
) -> Result<()> {
    let config = load_config(config_path).await?;
    DispatchConfigValidator::validate(&config).map_err(|e| eyre!("{e}"))?;
    let (dispatcher, _) = build_dispatcher(&config)?;

    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| eyre!("Invalid HTTP method '{method}'"))?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let mut request = RequestSnapshot::new(method, path).with_query(query);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| eyre!("Header '{header}' must look like name:value"))?;
        request = request.with_header(name.trim(), value.trim());
    }

    let output = match dispatcher.dispatch(request) {
        Ok(resolution) => serde_json::json!({
            "status": "resolved",
            "mode": resolution.mode.as_str(),
            "view": resolution.view.to_string(),
            "resolved_path": resolution.context.resolved_path(),
            "url_params": resolution.context.url_params(),
            "route": resolution.context.route(),
        }),
        Err(e) => serde_json::json!({
            "status": e.status().as_u16(),
            "error": e.label(),
            "message": e.to_string(),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
