//! Process entry point: load configuration, wire C1-C8 together, and run
//! until shutdown.

mod config;
mod shutdown;

use std::sync::Arc;

use config::ServerConfig;
use reputation_aggregator::Aggregator;
use reputation_api::{AppState, ApiServer};
use reputation_dnsbl::DnsblProber;
use reputation_health::{HealthChecker, HealthServer};
use reputation_provisioner::{Provisioner, ReqwestUpstreamClient, UpstreamClient};
use reputation_store::{
    DnsblCheckStore, EventStore, MemoryDnsblCheckStore, MemoryEventStore, MemoryReputationStore,
    MemoryReservationStore, PgStore, ReputationStore, ReservationStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reputation_common::logging::init();

    let config_path = find_config_file();
    let config = load_config(config_path.as_deref())?;

    if let Err(e) = reputation_metrics::init_metrics(&config.metrics) {
        tracing::error!(error = %e, "failed to initialize metrics, continuing without them");
    }

    let (event_store, reputation_store, dnsbl_check_store, reservation_store) =
        build_stores(&config).await?;

    let prober = Arc::new(DnsblProber::new(config.dnsbl.clone()));

    let upstream: Arc<dyn UpstreamClient> = Arc::new(ReqwestUpstreamClient::new(&config.provisioner)?);
    let provisioner = Arc::new(Provisioner::new(
        Arc::clone(&reservation_store),
        Arc::clone(&prober),
        upstream,
        config.provisioner.clone(),
    ));

    let aggregator = Arc::new(Aggregator::new(
        Arc::clone(&event_store),
        Arc::clone(&reputation_store),
        Arc::clone(&dnsbl_check_store),
        Arc::clone(&prober),
        config.aggregator.clone(),
    ));

    let health_checker = Arc::new(HealthChecker::new());
    health_checker.set_store_ready(true);
    health_checker.set_dnsbl_ready(true);
    health_checker.set_aggregator_ready(true);

    let app_state = Arc::new(AppState {
        event_store,
        reputation_store,
        dnsbl_check_store,
        reservation_store,
        prober,
        aggregator: Arc::clone(&aggregator),
        provisioner,
        health_checker: Arc::clone(&health_checker),
        recent_actions_limit: config.api.recent_actions_limit,
        webhook_shared_secret: config.api.webhook_shared_secret.clone(),
    });

    let api_server = ApiServer::new(&config.api.listen_address, app_state).await?;
    let health_server = if config.health.enabled {
        Some(HealthServer::new(config.health.clone(), health_checker).await?)
    } else {
        None
    };

    tracing::info!("reputation engine starting");

    let aggregator_task = tokio::spawn(
        Arc::clone(&aggregator).serve(shutdown::SHUTDOWN_BROADCAST.subscribe()),
    );
    let api_task = tokio::spawn(api_server.serve(shutdown::SHUTDOWN_BROADCAST.subscribe()));
    let health_task = health_server
        .map(|server| tokio::spawn(server.serve(shutdown::SHUTDOWN_BROADCAST.subscribe())));

    shutdown::wait_for_shutdown().await?;

    aggregator_task.await?;
    api_task.await??;
    if let Some(task) = health_task {
        task.await??;
    }

    tracing::info!("reputation engine stopped");
    Ok(())
}

type Stores = (
    Arc<dyn EventStore>,
    Arc<dyn ReputationStore>,
    Arc<dyn DnsblCheckStore>,
    Arc<dyn ReservationStore>,
);

/// Selects the Postgres backend when `[database].url` is configured and
/// non-empty, otherwise the in-memory backend.
async fn build_stores(config: &ServerConfig) -> anyhow::Result<Stores> {
    match config.database.url.as_deref() {
        Some(url) if !url.is_empty() => {
            tracing::info!("connecting to Postgres store");
            let store = Arc::new(PgStore::connect(url).await?);
            Ok((
                Arc::clone(&store) as Arc<dyn EventStore>,
                Arc::clone(&store) as Arc<dyn ReputationStore>,
                Arc::clone(&store) as Arc<dyn DnsblCheckStore>,
                store as Arc<dyn ReservationStore>,
            ))
        }
        _ => {
            tracing::warn!(
                "no [database].url configured, running with in-memory stores (not durable)"
            );
            Ok((
                Arc::new(MemoryEventStore::new()) as Arc<dyn EventStore>,
                Arc::new(MemoryReputationStore::new()) as Arc<dyn ReputationStore>,
                Arc::new(MemoryDnsblCheckStore::new()) as Arc<dyn DnsblCheckStore>,
                Arc::new(MemoryReservationStore::new()) as Arc<dyn ReservationStore>,
            ))
        }
    }
}

/// Find the configuration file using the following precedence:
/// 1. `REPUTATION_CONFIG` environment variable
/// 2. `./reputation-engine.toml` (current working directory)
/// 3. `/etc/reputation-engine/reputation-engine.toml` (system-wide config)
fn find_config_file() -> Option<std::path::PathBuf> {
    if let Ok(env_path) = std::env::var("REPUTATION_CONFIG") {
        let path = std::path::PathBuf::from(env_path);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(
            path = %path.display(),
            "REPUTATION_CONFIG points to a non-existent file, falling back to defaults"
        );
    }

    [
        std::path::PathBuf::from("./reputation-engine.toml"),
        std::path::PathBuf::from("/etc/reputation-engine/reputation-engine.toml"),
    ]
    .into_iter()
    .find(|path| path.exists())
}

/// Loads and parses `path`, or falls back to an all-defaults [`ServerConfig`]
/// when no config file was found — so the binary still runs (against
/// in-memory stores) with zero setup for local experimentation.
fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<ServerConfig> {
    let Some(path) = path else {
        tracing::warn!("no configuration file found, using built-in defaults");
        return Ok(ServerConfig::default());
    };

    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config from {}: {e}", path.display()))?;
    let config = ServerConfig::from_toml_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;

    tracing::info!(path = %path.display(), "configuration loaded");
    Ok(config)
}
