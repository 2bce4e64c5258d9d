use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::warehouse::{CreateWarehouse, Warehouse};

use super::ListQuery;
use crate::{Deployment, error::ApiError, extract::ApiJson};

pub async fn get_warehouses(
    State(deployment): State<Deployment>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<Vec<Warehouse>>, ApiError> {
    let warehouses =
        Warehouse::find_all(&deployment.db().pool, query.limit(), query.offset()).await?;
    Ok(ResponseJson(warehouses))
}

pub async fn create_warehouse(
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateWarehouse>,
) -> Result<(StatusCode, ResponseJson<Warehouse>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Warehouse name is required".to_string()));
    }
    let warehouse = Warehouse::create(
        &deployment.db().pool,
        &payload,
        deployment.documents().now(),
    )
    .await?;
    tracing::info!(id = warehouse.id, name = %warehouse.name, "warehouse created");
    Ok((StatusCode::CREATED, ResponseJson(warehouse)))
}

pub fn router() -> Router<Deployment> {
    Router::new().route("/warehouses", get(get_warehouses).post(create_warehouse))
}
