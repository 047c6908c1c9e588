use anyhow::Context;
use nimbus_api::{app, AppState};
use nimbus_catalog::TierCatalog;
use nimbus_core::{
    normalize_currency_code, CurrencyDirectory, InMemoryAssignmentDirectory, RegionDirectory,
};
use nimbus_order::{
    LocalOrderSubmitter, OrderStore, ProvisioningDelays, SubmissionOrchestrator, SubmissionPolicy,
};
use nimbus_store::app_config::Config;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nimbus_api=debug,nimbus_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Nimbus API on port {}", config.server.port);

    let repository = nimbus_store::open_repository(&config.storage)
        .await
        .context("Failed to open snapshot storage")?;
    let delays = ProvisioningDelays::from_millis(
        config.scheduler.provisioning_delay_ms,
        config.scheduler.activation_delay_ms,
    );
    let store = OrderStore::hydrate(repository, delays).await;

    let catalog = load_catalog(config.catalog.pricing_feed_path.as_deref()).await;

    let policy = SubmissionPolicy {
        tax_rate: Decimal::from_f64(config.business_rules.tax_rate).unwrap_or_default(),
        default_currency: normalize_currency_code(Some(
            config.business_rules.default_currency.as_str(),
        )),
    };
    let regions = RegionDirectory::new(config.catalog.regions.clone());
    let orchestrator = SubmissionOrchestrator::new(
        Arc::new(LocalOrderSubmitter),
        store.clone(),
        Arc::new(InMemoryAssignmentDirectory::new()),
        regions.clone(),
        CurrencyDirectory::default(),
        policy,
    );

    let app_state = AppState::new(store.clone(), catalog, orchestrator, regions);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.shutdown();
    Ok(())
}

/// A missing or unreadable feed leaves the catalog empty; orders can still be
/// priced with manual overrides.
async fn load_catalog(path: Option<&str>) -> TierCatalog {
    let Some(path) = path else {
        return TierCatalog::empty();
    };

    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Could not read pricing feed {}: {}", path, e);
            return TierCatalog::empty();
        }
    };

    match TierCatalog::from_json(&raw) {
        Ok(catalog) => {
            tracing::info!("Loaded {} tiers from {}", catalog.len(), path);
            catalog
        }
        Err(e) => {
            tracing::warn!("Ignoring malformed pricing feed {}: {}", path, e);
            TierCatalog::empty()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
