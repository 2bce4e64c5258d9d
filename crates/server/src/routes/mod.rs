use axum::{Router, routing::get};
use db::models::document::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::Deployment;

pub mod adjustments;
pub mod deliveries;
pub mod health;
pub mod numbering;
pub mod products;
pub mod receipts;
pub mod transfers;
pub mod warehouses;

/// `?limit=&offset=&search=` on the warehouse and product lists
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

pub fn router(deployment: Deployment) -> Router {
    let api = Router::new()
        .merge(numbering::router())
        .merge(adjustments::router())
        .merge(deliveries::router())
        .merge(receipts::router())
        .merge(transfers::router())
        .merge(warehouses::router())
        .merge(products::router());

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
