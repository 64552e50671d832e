use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    response::{success, AssignmentResponse, ReleaseResponse},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub order_id: String,
}

fn order_id(payload: Result<Json<OrderRequest>, JsonRejection>) -> ApiResult<String> {
    let Json(request) = payload?;
    let order_id = request.order_id.trim();
    if order_id.is_empty() {
        return Err(ApiError::bad_request("order_id is required"));
    }
    Ok(order_id.to_string())
}

pub async fn assign_delivery(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let order_id = order_id(payload)?;
    let assignment = state.dispatcher.assign(&order_id).await?;
    Ok(success(AssignmentResponse::from(assignment)))
}

pub async fn unassign_delivery(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let order_id = order_id(payload)?;
    let delivery = state.dispatcher.unassign(&order_id).await?;
    Ok(success(ReleaseResponse::new(delivery, "unassigned")))
}

pub async fn complete_delivery(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let order_id = order_id(payload)?;
    let delivery = state.dispatcher.complete(&order_id).await?;
    Ok(success(ReleaseResponse::new(delivery, "completed")))
}
