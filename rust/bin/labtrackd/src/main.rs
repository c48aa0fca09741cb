//! `labtrackd` — the labtrack server binary.
//!
//! Usage:
//!   labtrackd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/labtrack/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod config;

use std::sync::Arc;

use clap::Parser;
use labtrack_core::Module;
use tracing::info;

use config::ServerConfig;

/// labtrack server.
#[derive(Parser, Debug)]
#[command(name = "labtrackd", about = "labtrack server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:8080).
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = labtrack_core::ServiceConfig {
        data_dir: Some(data_dir.clone()),
        listen: cli.listen.clone(),
        ..Default::default()
    };

    let sql = Box::new(
        labtrack_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    // Authorization gate, per config.
    let auth: Arc<dyn labtrack_core::Authenticator> = match server_config.auth.mode.as_str() {
        "allow-all" => Arc::new(labtrack_core::AllowAll),
        _ => Arc::new(labtrack_core::HeaderAuth),
    };

    let lims_service = lims::service::LimsService::new(sql)
        .map_err(|e| anyhow::anyhow!("failed to initialize LIMS service: {}", e))?;
    let lims_module = lims::LimsModule::new(lims_service, auth);
    info!("LIMS module initialized");

    // Build router.
    let app = axum::Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .merge(lims_module.routes());

    // Start server.
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("labtrack server listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
