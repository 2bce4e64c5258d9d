use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    adjustment::{Adjustment, AdjustmentDetail, CreateAdjustment},
    document::DocumentFilter,
};
use utils::document_number::DocumentKind;

use crate::{Deployment, error::ApiError, extract::ApiJson};

pub async fn get_adjustments(
    State(deployment): State<Deployment>,
    Query(filter): Query<DocumentFilter>,
) -> Result<ResponseJson<Vec<Adjustment>>, ApiError> {
    let adjustments = Adjustment::find_all(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(adjustments))
}

pub async fn get_adjustment(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<AdjustmentDetail>, ApiError> {
    load(&deployment, id).await.map(ResponseJson)
}

pub async fn create_adjustment(
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateAdjustment>,
) -> Result<(StatusCode, ResponseJson<AdjustmentDetail>), ApiError> {
    let adjustment = deployment.documents().create_adjustment(&payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(adjustment)))
}

/// Apply the counted difference to stock and mark the adjustment done
pub async fn validate_adjustment(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<AdjustmentDetail>, ApiError> {
    deployment
        .documents()
        .validate(DocumentKind::Adjustment, id)
        .await?;
    load(&deployment, id).await.map(ResponseJson)
}

pub async fn cancel_adjustment(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<AdjustmentDetail>, ApiError> {
    deployment
        .documents()
        .cancel(DocumentKind::Adjustment, id)
        .await?;
    load(&deployment, id).await.map(ResponseJson)
}

async fn load(deployment: &Deployment, id: i64) -> Result<AdjustmentDetail, ApiError> {
    Adjustment::find_detail(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Adjustment {id} not found")))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/adjustments", get(get_adjustments).post(create_adjustment))
        .route("/adjustments/{id}", get(get_adjustment))
        .route("/adjustments/{id}/validate", post(validate_adjustment))
        .route("/adjustments/{id}/cancel", post(cancel_adjustment))
}
