//! # Hook-Ledger Service
//!
//! Binary entry point for the Hook-Ledger HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Opens the shared event store
//! - Starts the HTTP server from hook-ledger-api

use anyhow::Context;
use hook_ledger_api::{start_server, LoggingConfig, ServiceConfig, ServiceError, StoreHealthChecker};
use hook_ledger_core::{GithubWebhookProcessor, SharedEventStore};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SYSTEM_CONFIG_FILE: &str = "/etc/hook-ledger/service";
const LOCAL_CONFIG_FILE: &str = "config/service";
const CONFIG_FILE_ENV: &str = "HL_CONFIG_FILE";
const ENV_PREFIX: &str = "HL";

#[tokio::main]
async fn main() {
    // Configuration decides the log format, so it is loaded before tracing
    // is initialized. Failures are reported through a default subscriber.
    let explicit_path = std::env::var(CONFIG_FILE_ENV)
        .ok()
        .filter(|p| !p.is_empty());

    let service_config = match load_configuration(explicit_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            error!(
                error = format!("{:#}", e),
                "Service configuration is invalid; aborting. Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    init_tracing(&service_config.logging);
    info!("Starting Hook-Ledger Service");
    if let Some(path) = &explicit_path {
        info!(path = %path, "Loaded configuration from explicit path");
    }

    // -------------------------------------------------------------------------
    // Open the event store
    //
    // The shared handle opens lazily. Warming it here surfaces a broken
    // data directory at startup; the handle retries on the first request if
    // this attempt fails.
    // -------------------------------------------------------------------------
    let shared_store = Arc::new(SharedEventStore::new(service_config.storage.clone()));
    match shared_store.get().await {
        Ok(_) => info!(
            backend = ?service_config.storage.backend,
            data_dir = %service_config.storage.data_dir.display(),
            "Event store ready"
        ),
        Err(e) => warn!(
            error = %e,
            "Event store could not be opened at startup; will retry on first use"
        ),
    }

    let webhook_processor = Arc::new(GithubWebhookProcessor::new());
    let health_checker = Arc::new(StoreHealthChecker::new(shared_store.clone()));

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        endpoint = %service_config.webhooks.endpoint_path,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(
        service_config,
        webhook_processor,
        health_checker,
        shared_store,
    )
    .await
    {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }
}

/// Build the service configuration.
///
/// Sources, later ones overriding earlier ones:
///  1. `/etc/hook-ledger/service.yaml`
///  2. `./config/service.yaml`
///  3. the file named by `HL_CONFIG_FILE` (required when set)
///  4. environment variables prefixed `HL__`, e.g. `HL__SERVER__PORT=9090`
///
/// Absent files fall back to built-in defaults. A malformed file or a value
/// that cannot be coerced to its field type is an error.
fn load_configuration(explicit_path: Option<&str>) -> anyhow::Result<ServiceConfig> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name(SYSTEM_CONFIG_FILE)
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name(LOCAL_CONFIG_FILE)
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = explicit_path {
        // Format follows the file extension
        builder = builder.add_source(config::File::with_name(path).required(true));
    }

    let config = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to build configuration")?;

    let service_config: ServiceConfig = config
        .try_deserialize()
        .context("failed to deserialize service configuration")?;

    service_config.validate()?;
    Ok(service_config)
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "hook_ledger_service={level},hook_ledger_api={level},hook_ledger_core={level},tower_http=info",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
