use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use nimbus_catalog::{TierCatalog, TierCatalogEntry};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    pub key: String,
    pub name: Option<String>,
    pub country_code: Option<String>,
    pub tier_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionTiers {
    pub region: String,
    pub using_fallback_catalog: bool,
    pub tiers: Vec<TierCatalogEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub tier_count: usize,
    pub regions: Vec<String>,
    pub built_at: chrono::DateTime<chrono::Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/catalog", put(replace_catalog))
        .route("/v1/catalog/regions", get(list_regions))
        .route("/v1/catalog/regions/{region}/tiers", get(region_tiers))
}

/// GET /v1/catalog/regions
async fn list_regions(State(state): State<AppState>) -> Json<Vec<RegionSummary>> {
    let catalog = state.catalog.read().await;
    let regions = catalog
        .regions()
        .into_iter()
        .map(|key| {
            let known = state.regions.get(key);
            RegionSummary {
                key: key.to_string(),
                name: known.map(|r| r.name.clone()),
                country_code: known.map(|r| r.country_code.clone()),
                tier_count: catalog.bucket(key).map_or(0, |b| b.len()),
            }
        })
        .collect();
    Json(regions)
}

/// GET /v1/catalog/regions/{region}/tiers
/// Falls back to every known tier when the region has no bucket of its own
async fn region_tiers(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Json<RegionTiers> {
    let catalog = state.catalog.read().await;
    let (bucket, using_fallback_catalog) = match catalog.bucket(&region) {
        Some(bucket) => (bucket, false),
        None => (catalog.global(), true),
    };

    Json(RegionTiers {
        region,
        using_fallback_catalog,
        tiers: bucket.entries().cloned().collect(),
    })
}

/// PUT /v1/catalog
/// Rebuilds the catalog from a raw pricing feed (JSON array of rows)
async fn replace_catalog(
    State(state): State<AppState>,
    Json(feed): Json<Value>,
) -> Result<Json<CatalogSummary>, AppError> {
    let rows = match feed {
        Value::Array(rows) => rows,
        _ => {
            return Err(AppError::ValidationError(
                "Pricing feed must be a JSON array of rows".to_string(),
            ))
        }
    };

    let catalog = TierCatalog::from_rows(&rows);
    let summary = summarize(&catalog);
    *state.catalog.write().await = catalog;

    info!("Catalog replaced: {} tiers from {} rows", summary.tier_count, rows.len());
    Ok(Json(summary))
}

fn summarize(catalog: &TierCatalog) -> CatalogSummary {
    CatalogSummary {
        tier_count: catalog.len(),
        regions: catalog.regions().into_iter().map(str::to_string).collect(),
        built_at: catalog.built_at(),
    }
}
