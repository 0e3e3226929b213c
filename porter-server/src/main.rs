//! # Porter Server
//!
//! HTTP surface for the Porter media pipeline.
//!
//! Exposes the task API (list, profile, pause) and an endpoint that starts
//! an upload pipeline run: local media is fingerprinted, admitted by the
//! remote drive via the prepared descriptor, and pushed part by part, all
//! tracked as a durable task with throttled progress/log persistence and
//! cooperative cancellation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use porter_core::{MediaUploader, PostgresTaskStore, PrepareOptions, TaskRegistry, TaskStore};
use porter_server::drive::HttpDriveClient;
use porter_server::{AppState, Config, create_app};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "porter-server")]
#[command(about = "Personal media pipeline: cloud-drive uploads tracked as durable tasks")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "PORTER_CONFIG", default_value = "porter.toml")]
    config: PathBuf,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }

    let store: Arc<dyn TaskStore> =
        Arc::new(PostgresTaskStore::connect(config.database_url()?).await?);
    let registry = Arc::new(TaskRegistry::new(store, config.storage.logs_dir.clone()));

    let drive = Arc::new(HttpDriveClient::new(&config.drive));
    let uploader = Arc::new(MediaUploader::new(
        drive,
        PrepareOptions {
            token: config.drive.access_token.clone(),
            chunk_size: config.drive.chunk_size,
        },
    ));

    let state = AppState {
        registry,
        uploader,
        owner_id: config.storage.owner_id,
        root_folder_id: config.drive.root_folder_id.clone(),
    };
    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server host/port")?;
    info!("porter-server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
