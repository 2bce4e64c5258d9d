use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    delivery::{CreateDelivery, Delivery, DeliveryWithItems},
    document::DocumentFilter,
};
use utils::document_number::DocumentKind;

use crate::{Deployment, error::ApiError, extract::ApiJson};

pub async fn get_deliveries(
    State(deployment): State<Deployment>,
    Query(filter): Query<DocumentFilter>,
) -> Result<ResponseJson<Vec<Delivery>>, ApiError> {
    let deliveries = Delivery::find_all(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(deliveries))
}

pub async fn get_delivery(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<DeliveryWithItems>, ApiError> {
    load(&deployment, id).await.map(ResponseJson)
}

pub async fn create_delivery(
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateDelivery>,
) -> Result<(StatusCode, ResponseJson<DeliveryWithItems>), ApiError> {
    let delivery = deployment.documents().create_delivery(&payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(delivery)))
}

/// Ship the items: fails without touching stock when any line is short
pub async fn validate_delivery(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<DeliveryWithItems>, ApiError> {
    deployment.documents().validate(DocumentKind::Delivery, id).await?;
    load(&deployment, id).await.map(ResponseJson)
}

pub async fn cancel_delivery(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<DeliveryWithItems>, ApiError> {
    deployment.documents().cancel(DocumentKind::Delivery, id).await?;
    load(&deployment, id).await.map(ResponseJson)
}

async fn load(deployment: &Deployment, id: i64) -> Result<DeliveryWithItems, ApiError> {
    Delivery::find_with_items(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Delivery {id} not found")))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/deliveries", get(get_deliveries).post(create_delivery))
        .route("/deliveries/{id}", get(get_delivery))
        .route("/deliveries/{id}/validate", post(validate_delivery))
        .route("/deliveries/{id}/cancel", post(cancel_delivery))
}
