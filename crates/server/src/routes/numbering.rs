//! `GET /api/{kind}/next-number` for every document kind.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::error;
use utils::document_number::DocumentKind;

use crate::{Deployment, error::ApiError};

#[derive(Debug, Serialize)]
pub struct NextNumber {
    pub next: String,
}

pub async fn next_number(
    deployment: Deployment,
    kind: DocumentKind,
) -> Result<ResponseJson<NextNumber>, ApiError> {
    match deployment.documents().allocate_number(kind).await {
        Ok(next) => Ok(ResponseJson(NextNumber { next })),
        Err(e) => {
            error!(kind = %kind, error = %e, "failed to compute next document number");
            Err(ApiError::Internal(format!(
                "Failed to compute next {kind} number"
            )))
        }
    }
}

pub fn router() -> Router<Deployment> {
    DocumentKind::iter().fold(Router::new(), |router, kind| {
        router.route(
            &format!("/{}/next-number", kind.slug()),
            get(move |State(deployment): State<Deployment>| next_number(deployment, kind)),
        )
    })
}
