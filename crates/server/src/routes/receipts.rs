use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    document::DocumentFilter,
    receipt::{CreateReceipt, Receipt, ReceiptWithItems},
};
use utils::document_number::DocumentKind;

use crate::{Deployment, error::ApiError, extract::ApiJson};

pub async fn get_receipts(
    State(deployment): State<Deployment>,
    Query(filter): Query<DocumentFilter>,
) -> Result<ResponseJson<Vec<Receipt>>, ApiError> {
    let receipts = Receipt::find_all(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(receipts))
}

pub async fn get_receipt(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ReceiptWithItems>, ApiError> {
    load(&deployment, id).await.map(ResponseJson)
}

pub async fn create_receipt(
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateReceipt>,
) -> Result<(StatusCode, ResponseJson<ReceiptWithItems>), ApiError> {
    let receipt = deployment.documents().create_receipt(&payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(receipt)))
}

pub async fn validate_receipt(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ReceiptWithItems>, ApiError> {
    deployment.documents().validate(DocumentKind::Receipt, id).await?;
    load(&deployment, id).await.map(ResponseJson)
}

pub async fn cancel_receipt(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ReceiptWithItems>, ApiError> {
    deployment.documents().cancel(DocumentKind::Receipt, id).await?;
    load(&deployment, id).await.map(ResponseJson)
}

async fn load(deployment: &Deployment, id: i64) -> Result<ReceiptWithItems, ApiError> {
    Receipt::find_with_items(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Receipt {id} not found")))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/receipts", get(get_receipts).post(create_receipt))
        .route("/receipts/{id}", get(get_receipt))
        .route("/receipts/{id}/validate", post(validate_receipt))
        .route("/receipts/{id}/cancel", post(cancel_receipt))
}
