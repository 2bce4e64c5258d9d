use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    product::{CreateProduct, Product},
    stock_level::{StockLevel, WarehouseStock},
};

use super::ListQuery;
use crate::{Deployment, error::ApiError, extract::ApiJson};

/// List products; `search` matches name or SKU ignoring case
pub async fn get_products(
    State(deployment): State<Deployment>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<Vec<Product>>, ApiError> {
    let products = Product::find_all(
        &deployment.db().pool,
        query.search.as_deref(),
        query.limit(),
        query.offset(),
    )
    .await?;
    Ok(ResponseJson(products))
}

pub async fn create_product(
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateProduct>,
) -> Result<(StatusCode, ResponseJson<Product>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Product name is required".to_string()));
    }
    let product = Product::create(
        &deployment.db().pool,
        &payload,
        deployment.documents().now(),
    )
    .await?;
    Ok((StatusCode::CREATED, ResponseJson(product)))
}

pub async fn get_product_stock(
    State(deployment): State<Deployment>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<Vec<WarehouseStock>>, ApiError> {
    let pool = &deployment.db().pool;
    if Product::find_by_id(pool, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Product {id} not found")));
    }
    let stock = StockLevel::find_by_product_id(pool, id).await?;
    Ok(ResponseJson(stock))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/products", get(get_products).post(create_product))
        .route("/products/{id}/stock", get(get_product_stock))
}
