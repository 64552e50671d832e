use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use dispatch_core::{CourierUpdate, NewCourier};
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    response::{created, success},
    routes::AppState,
};

fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::bad_request("invalid id"))
}

pub async fn list_couriers(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let couriers = state.couriers.list().await?;
    Ok(success(couriers))
}

pub async fn get_courier(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    match state.couriers.get_by_id(id).await? {
        Some(courier) => Ok(success(courier)),
        None => Err(ApiError::NotFound("courier not found".to_string())),
    }
}

pub async fn create_courier(
    State(state): State<AppState>,
    payload: Result<Json<NewCourier>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(new_courier) = payload?;
    new_courier.validate().map_err(ApiError::BadRequest)?;

    let courier = state.couriers.create(&new_courier).await?;
    info!(courier_id = courier.id, "courier registered");
    Ok(created(courier))
}

pub async fn update_courier(
    State(state): State<AppState>,
    payload: Result<Json<CourierUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(update) = payload?;
    update.validate().map_err(ApiError::BadRequest)?;

    let courier = state.couriers.update(&update).await?;
    info!(courier_id = courier.id, "courier updated");
    Ok(success(courier))
}
