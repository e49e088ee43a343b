use clap::Parser;
use openbridge::providers::Provider;
use openbridge::{build_router, AppState, AuditLogger, BridgeConfig, JsonlAuditStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "openbridge",
    about = "Anthropic Messages API bridge for OpenAI-compatible providers",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Provider name; sets the base URL to the provider's default
    #[arg(long)]
    provider: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in openbridge::config::config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = BridgeConfig::find_and_load(cli.config.as_deref())?;

    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.debug {
        config.debug = true;
    }
    if let Some(ref name) = cli.provider {
        let provider = Provider::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown provider '{name}'"))?;
        let base_url = provider
            .default_base_url()
            .ok_or_else(|| anyhow::anyhow!("Provider '{name}' has no default base URL"))?;
        config.base_url = base_url.to_string();
    }

    let default_filter = if config.debug {
        "openbridge=debug,tower_http=debug"
    } else {
        "openbridge=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let audit = AuditLogger::new(JsonlAuditStore::open(&config.audit_path)?);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let state = Arc::new(AppState::new(config.clone(), client, audit));

    info!("openbridge v{}", env!("CARGO_PKG_VERSION"));
    match &config.source {
        Some(path) => info!("Using config from: {}", path.display()),
        None => info!("No config file found, using defaults and environment variables"),
    }
    info!("  Provider:  {}", state.provider);
    info!("  Base URL:  {}", config.base_url);
    info!("  Model:     {}", config.model);
    info!("  API key:   {}", config.masked_api_key());
    info!("  Max out:   {} tokens", config.max_tokens);
    info!("  Audit log: {}", config.audit_path.display());
    if config.api_key.is_empty() {
        warn!("No API key configured; set OPENAI_API_KEY or api_key in the config file");
    }
    if config.is_using_defaults() {
        info!("Using the default model configuration. Customize it in openbridge.toml:");
        info!("  api_key = \"your-api-key-here\"");
        info!("  base_url = \"https://api.openai.com/v1\"");
        info!("  model = \"gpt-4o\"");
        info!("  max_tokens = 4096");
    }
    if config.debug {
        info!("Debug logging enabled");
    }

    let app = build_router(state);
    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("  ANTHROPIC_BASE_URL=http://{}/", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
