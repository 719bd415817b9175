//! Launchpad - Main Entry Point
//!
//! Composition root: wires SQLite, the system probe and the collaborator
//! gateway into the orchestrator, then serves the admin JSON-RPC surface.

mod settings;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use launchpad_api_rpc::{RpcServer, RpcServerConfig};
use launchpad_core::application::{Collaborators, Orchestrator, OrchestratorDeps};
use launchpad_core::port::{SystemTimeProvider, UuidProvider};
use launchpad_core::VERSION;
use launchpad_infra_gateway::{GatewayClient, GatewayConfig};
use launchpad_infra_sqlite::{SqliteJobRepository, SqliteMaintenance};
use launchpad_infra_system::SystemProbeImpl;
use settings::Settings;

const LOG_FORMAT_ENV: &str = "LAUNCHPAD_LOG_FORMAT";
const LOG_DIR_ENV: &str = "LAUNCHPAD_LOG_DIR";

/// Install the global subscriber. The guard flushes the file sink on drop.
fn init_logging(settings: &Settings) -> Result<Option<WorkerGuard>> {
    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| settings.log_format.clone());
    let log_dir = std::env::var(LOG_DIR_ENV).ok().or_else(|| settings.log_dir.clone());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("launchpad=info"))
        .context("failed to create env filter")?;

    let stdout_layer = match log_format.as_str() {
        // Production: JSON structured logging
        "json" => fmt::layer().json().boxed(),
        _ => fmt::layer().pretty().boxed(),
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "launchpad.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration
    let settings = Settings::load()?;
    let _log_guard = init_logging(&settings)?;

    info!(version = VERSION, "Launchpad starting");

    // 2. Database
    if let Some(parent) = settings.database_file().as_deref().and_then(|p| p.parent()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    info!(database_url = %settings.database_url, "Opening database");
    let pool = launchpad_infra_sqlite::open(&settings.database_url)
        .await
        .context("database initialization failed")?;

    // 3. Dependency wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let gateway = Arc::new(
        GatewayClient::connect(&GatewayConfig::new(
            settings.gateway.url.clone(),
            Duration::from_secs(settings.gateway.timeout_secs),
        ))
        .context("collaborator gateway misconfigured")?,
    );
    info!(url = %settings.gateway.url, "Collaborator gateway configured");

    let deps = OrchestratorDeps {
        job_repo: Arc::new(SqliteJobRepository::new(pool.clone(), time_provider.clone())),
        maintenance: Arc::new(SqliteMaintenance::new(pool)),
        system_probe: Arc::new(SystemProbeImpl::new()),
        collaborators: Collaborators {
            businesses: gateway.clone(),
            content: gateway.clone(),
            scaffolder: gateway.clone(),
            campaigns: gateway.clone(),
            payments: gateway.clone(),
            notifications: gateway,
        },
        time_provider,
        id_provider: Arc::new(UuidProvider),
    };

    // 4. Orchestrator
    let orchestrator = Arc::new(
        Orchestrator::new(settings.orchestrator.clone(), deps)
            .context("invalid orchestrator configuration")?,
    );
    orchestrator
        .initialize()
        .await
        .context("orchestrator failed to start")?;

    // 5. JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: settings.rpc.host.clone(),
        port: settings.rpc.port,
    };
    let (addr, rpc_handle) = RpcServer::new(rpc_config, orchestrator.clone())
        .start()
        .await
        .context("RPC server start failed")?;

    info!(rpc_addr = %addr, "System ready");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    // 7. Graceful shutdown: stop intake first, then drain workers
    if let Err(e) = rpc_handle.stop() {
        warn!(error = %e, "RPC server already stopped");
    }
    orchestrator.shutdown().await;

    info!("Shutdown complete");
    Ok(())
}
