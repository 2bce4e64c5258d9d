use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    document::DocumentFilter,
    transfer::{CreateTransfer, Transfer, TransferWithItems},
};
use utils::document_number::DocumentKind;

use crate::{Deployment, error::ApiError, extract::ApiJson};

pub async fn get_transfers(
    State(deployment): State<Deployment>,
    Query(filter): Query<DocumentFilter>,
) -> Result<ResponseJson<Vec<Transfer>>, ApiError> {
    let transfers = Transfer::find_all(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(transfers))
}

pub async fn get_transfer(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<TransferWithItems>, ApiError> {
    load(&deployment, id).await.map(ResponseJson)
}

pub async fn create_transfer(
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateTransfer>,
) -> Result<(StatusCode, ResponseJson<TransferWithItems>), ApiError> {
    let transfer = deployment.documents().create_transfer(&payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(transfer)))
}

/// Move every line from the source to the destination warehouse
pub async fn validate_transfer(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<TransferWithItems>, ApiError> {
    deployment.documents().validate(DocumentKind::Transfer, id).await?;
    load(&deployment, id).await.map(ResponseJson)
}

pub async fn cancel_transfer(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<TransferWithItems>, ApiError> {
    deployment.documents().cancel(DocumentKind::Transfer, id).await?;
    load(&deployment, id).await.map(ResponseJson)
}

async fn load(deployment: &Deployment, id: i64) -> Result<TransferWithItems, ApiError> {
    Transfer::find_with_items(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Transfer {id} not found")))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/transfers", get(get_transfers).post(create_transfer))
        .route("/transfers/{id}", get(get_transfer))
        .route("/transfers/{id}/validate", post(validate_transfer))
        .route("/transfers/{id}/cancel", post(cancel_transfer))
}
