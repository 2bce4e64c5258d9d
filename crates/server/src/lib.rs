use std::sync::Arc;

use axum::Router;
use db::DBService;
use services::services::{clock::Clock, config::AppConfig, documents::DocumentService};

pub mod error;
pub mod extract;
pub mod routes;

/// Shared handles passed to every route handler
#[derive(Clone)]
pub struct Deployment {
    db: DBService,
    documents: DocumentService,
}

impl Deployment {
    pub fn new(db: DBService, clock: Arc<dyn Clock>, config: &AppConfig) -> Self {
        let documents = DocumentService::new(
            db.pool.clone(),
            config.prefixes.clone(),
            clock,
            config.insert_attempts,
        );
        Self { db, documents }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }
}

pub fn app(deployment: Deployment) -> Router {
    routes::router(deployment)
}
