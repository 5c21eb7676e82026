use anyhow::{Context, Result};
use codelink_api::{AppState, SERVICE_NAME, serve};
use codelink_config::{load_config, validate_config};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, LogFormat, parse_cli};

mod cli;

const DEFAULT_LOG_FILTER: &str = "info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing(cli.log_format);
    run(cli).await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Human => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(Some(cli.config.as_path()))
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let config = cli.apply_overrides(config);

    for warning in validate_config(&config) {
        tracing::warn!(code = warning.code, "{}", warning.message);
    }

    let state = AppState::from_config(&config).with_context(|| {
        format!(
            "default project '{}' is not a valid project name",
            config.storage.default_project
        )
    })?;

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;

    tracing::info!(
        addr = %local_addr,
        projects_root = %config.storage.projects_root.display(),
        default_project = %config.storage.default_project,
        detailed_logging = config.logging.detailed,
        "{SERVICE_NAME} listening"
    );

    serve(listener, state, shutdown_signal())
        .await
        .context("server exited with error")?;

    tracing::info!("{SERVICE_NAME} stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
