use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use nimbus_order::{NewOrder, Order, OrderPatch};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_orders).post(create_order))
        .route("/v1/orders/fast-track", post(fast_track_order))
        .route("/v1/orders/{id}", get(get_order).patch(update_order))
}

/// GET /v1/orders
/// All orders, newest first
async fn list_orders(State(state): State<AppState>) -> Json<Vec<Order>> {
    Json(state.store.list_orders().await)
}

/// GET /v1/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    state
        .store
        .get_order(order_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError(format!("Order {} not found", order_id)))
}

/// POST /v1/orders
async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let id = state.store.create_order(payload).await;
    created(&state, id).await
}

/// POST /v1/orders/fast-track
/// Administrator approval: skips payment and starts provisioning immediately
async fn fast_track_order(
    State(state): State<AppState>,
    Json(payload): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let id = state.store.fast_track_order(payload).await;
    created(&state, id).await
}

/// PATCH /v1/orders/{id}
async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>, AppError> {
    state
        .store
        .update_order(order_id, patch)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError(format!("Order {} not found", order_id)))
}

async fn created(state: &AppState, id: Uuid) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = state
        .store
        .get_order(id)
        .await
        .ok_or_else(|| {
            AppError::InternalServerError(format!("Order {} vanished after create", id))
        })?;
    Ok((StatusCode::CREATED, Json(order)))
}
