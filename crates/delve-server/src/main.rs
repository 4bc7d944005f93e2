//! Server binary for Delve.
//!
//! Wires configuration, storage, and the persistence gateway together and
//! keeps player records durable for the lifetime of the process.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `delve.yaml` (or the path given as the first
//!    argument or in `DELVE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the configured storage backend
//! 4. Start the autosave loop
//! 5. Wait for Ctrl-C, then stop autosave and flush every live session
//!    within the shutdown deadline

mod error;
mod tracing_hooks;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use delve_core::{
    BackendKind, Capabilities, ConfigError, LoggingConfig, PersistenceGateway, SaveSummary,
    ServerConfig, ShutdownSignal,
};
use delve_db::{DragonflyBackend, MemoryBackend, StorageBackend};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;
use crate::tracing_hooks::TracingHooks;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "delve.yaml";

/// Application entry point for the server.
///
/// # Errors
///
/// Returns an error if configuration, storage, or signal setup fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is configured from it, so it comes first.
    let path = config_path();
    let config = load_config(&path).map_err(ServerError::from)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        path = %path.display(),
        found = path.exists(),
        backend = ?config.storage.backend,
        autosave_interval_secs = config.persistence.autosave_interval_secs,
        shutdown_deadline_ms = config.persistence.shutdown_deadline_ms,
        retry_attempts = config.persistence.retry_attempts,
        "Configuration loaded"
    );

    // 3. Install the shutdown signal.
    let shutdown = ShutdownSignal::new();
    let signal = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
            shutdown.trigger();
            result
        })
    };

    let caps = Capabilities::default().with_hooks(Arc::new(TracingHooks));

    // 4-5. Connect storage and serve until shutdown.
    let summary = match config.storage.backend {
        BackendKind::Memory => {
            warn!("Using the in-memory backend; records are lost on exit");
            let gateway = Arc::new(PersistenceGateway::from_config(
                MemoryBackend::new(),
                &config,
                caps,
            ));
            serve(gateway, shutdown).await?
        }
        BackendKind::Dragonfly => {
            info!(url = %config.storage.dragonfly_url, "Connecting to Dragonfly");
            let backend = DragonflyBackend::connect(&config.storage.dragonfly_url)
                .await
                .map_err(ServerError::from)?;
            let gateway = Arc::new(PersistenceGateway::from_config(backend, &config, caps));
            serve(gateway, shutdown).await?
        }
    };

    signal
        .await
        .map_err(|e| ServerError::Task {
            message: format!("signal listener: {e}"),
        })?
        .map_err(ServerError::from)?;

    info!(
        saved = summary.saved,
        failed = summary.failed,
        skipped = summary.skipped,
        "delve-server stopped"
    );
    Ok(())
}

/// Resolve the configuration path from the first argument, `DELVE_CONFIG`,
/// or [`DEFAULT_CONFIG_PATH`].
fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DELVE_CONFIG").ok())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration from `path`, or defaults when the file is absent.
fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    if path.exists() {
        ServerConfig::from_file(path)
    } else {
        ServerConfig::parse("")
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run the autosave loop until `shutdown`, then flush every live session.
async fn serve<B: StorageBackend>(
    gateway: Arc<PersistenceGateway<B>>,
    shutdown: ShutdownSignal,
) -> Result<SaveSummary, ServerError> {
    let autosave = {
        let gateway = Arc::clone(&gateway);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { gateway.run_autosave(&shutdown).await })
    };

    info!("delve-server ready");
    shutdown.wait().await;

    autosave.await.map_err(|e| ServerError::Task {
        message: format!("autosave loop: {e}"),
    })?;
    Ok(gateway.shutdown_flush().await.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use delve_types::PlayerId;

    use super::*;

    #[test]
    fn missing_config_file_uses_defaults() {
        let config = load_config(Path::new("does-not-exist/delve.yaml")).unwrap();
        assert_eq!(config.persistence, ServerConfig::default().persistence);
    }

    #[tokio::test(start_paused = true)]
    async fn serve_flushes_live_sessions_on_shutdown() {
        let backend = Arc::new(MemoryBackend::new());
        let gateway = Arc::new(PersistenceGateway::from_config(
            Arc::clone(&backend),
            &ServerConfig::default(),
            Capabilities::default(),
        ));
        let id = PlayerId::new();
        gateway.join(id).await.unwrap();

        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(serve(Arc::clone(&gateway), shutdown.clone()));
        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown.trigger();

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.saved, 1);
        assert_eq!(backend.write_count(&gateway.store().key(id)).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn serve_autosaves_before_shutdown() {
        let backend = Arc::new(MemoryBackend::new());
        let gateway = Arc::new(PersistenceGateway::from_config(
            Arc::clone(&backend),
            &ServerConfig::default(),
            Capabilities::default(),
        ));
        let id = PlayerId::new();
        gateway.join(id).await.unwrap();

        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(serve(Arc::clone(&gateway), shutdown.clone()));
        tokio::time::sleep(Duration::from_secs(61)).await;
        shutdown.trigger();

        task.await.unwrap().unwrap();
        // One autosave pass plus the shutdown flush.
        assert_eq!(backend.write_count(&gateway.store().key(id)).await, 2);
    }
}
