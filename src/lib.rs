pub mod app;
pub mod config;
pub mod error;
pub mod process;
pub mod projects;
pub mod protocol;
pub mod server;
pub mod state;
pub mod websocket;

use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;

pub fn init_logging() {
    let debug_enabled = env::var("DEVRUNNER_DEBUG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Logs panics through tracing and then defers to the default hook. A panic
/// inside a spawned task only ends that task; the server keeps running.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!("Panic: {}", panic_info);
        default_hook(panic_info);
    }));
}

/// Loads configuration and runs the server until Ctrl-C
pub fn run() -> anyhow::Result<()> {
    init_logging();

    let config = ServerConfig::load()?;
    info!(
        "Starting {} v{} (projects: {:?}, assets: {:?})",
        app::APP_NAME,
        app::APP_VERSION,
        config.projects_file,
        config.static_dir
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(server::serve(config, shutdown_signal()))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
    }
}
