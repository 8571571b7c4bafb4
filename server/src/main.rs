use arrayd_core::{Collaborators, ManagerConfig, OperationManager, StreamFanout};
use arrayd_server::demo_collaborators::{
    DemoContainerManager, DemoMetricsCollector, DemoStorageDriver, DemoSystemController, DemoVmManager,
};
use arrayd_server::{AppState, build_router};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// Storage-appliance management agent: operation manager, array lifecycle
/// orchestrator, and WebSocket metrics fan-out.
#[derive(Parser, Debug)]
#[command(name = "arrayd")]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file. Missing file falls back to defaults.
    #[arg(long, default_value = "arrayd.toml")]
    config: PathBuf,

    /// Override the bind address from the config file.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Override the log level from the config file (e.g. "info", "debug").
    #[arg(long)]
    log_level: Option<String>,

    /// Log to stderr instead of the rolling file in the cache directory.
    #[arg(long)]
    log_to_stderr: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = ManagerConfig::load_or_default(&args.config);
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }
    if args.log_to_stderr {
        config.log_to_file = false;
    }

    arrayd_core::utils::logging::init_logging(&config.log_level, config.log_to_file)?;

    tracing::info!(bind_addr = %config.bind_addr, "starting arrayd");

    let collaborators = Collaborators {
        storage: DemoStorageDriver::new(),
        containers: DemoContainerManager::new(),
        vms: DemoVmManager::new(),
        system: DemoSystemController::new(),
        metrics: DemoMetricsCollector::new(),
    };

    let registry = arrayd_core::build_default_registry(collaborators.clone(), &config).await;
    let manager = OperationManager::new(config.clone(), registry);
    let fanout = StreamFanout::new(
        collaborators.metrics.clone(),
        config.stream_tick_interval(),
        config.stream_default_interval(),
        config.stream_client_queue_capacity,
    );

    let state = AppState {
        manager: manager.clone(),
        fanout,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(manager))
        .await?;

    Ok(())
}

async fn shutdown_signal(manager: Arc<OperationManager>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining operations");
    manager.stop().await;
}
