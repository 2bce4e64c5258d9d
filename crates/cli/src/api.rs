//! HTTP client for the warehouse server.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use utils::document_number::{DocumentKind, PrefixTable};

use crate::fallback::fallback_number;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Deserialize)]
struct NextNumberResponse {
    next: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Where the number used for a new document came from
#[derive(Debug)]
pub enum ResolvedNumber {
    Allocated(String),
    /// Server allocation failed; the number is a local, possibly colliding, placeholder
    Fallback { number: String, cause: ClientError },
}

impl ResolvedNumber {
    pub fn number(&self) -> &str {
        match self {
            ResolvedNumber::Allocated(number) => number,
            ResolvedNumber::Fallback { number, .. } => number,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ResolvedNumber::Fallback { .. })
    }
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// `GET /api/{kind}/next-number`
    pub async fn next_number(&self, kind: DocumentKind) -> Result<String, ClientError> {
        let url = format!("{}/api/{}/next-number", self.base_url, kind.slug());
        debug!(%url, "requesting next document number");
        let response = self.http.get(&url).send().await?;
        let body: NextNumberResponse = Self::check(response).await?.json().await?;
        Ok(body.next)
    }

    /// Allocated number, or the local fallback when the server cannot provide one
    pub async fn resolve_number(
        &self,
        kind: DocumentKind,
        prefixes: &PrefixTable,
        now: DateTime<Utc>,
    ) -> ResolvedNumber {
        match self.next_number(kind).await {
            Ok(number) => ResolvedNumber::Allocated(number),
            Err(cause) => {
                let number = fallback_number(prefixes, kind, now);
                warn!(kind = %kind, %number, error = %cause, "using fallback document number");
                ResolvedNumber::Fallback { number, cause }
            }
        }
    }

    /// `POST /api/{kind}` with the bearer token when one is configured
    pub async fn create_document(
        &self,
        kind: DocumentKind,
        payload: &Value,
    ) -> Result<Value, ClientError> {
        let url = format!("{}/api/{}", self.base_url, kind.slug());
        let mut request = self.http.post(&url).json(payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(ClientError::Api { status, message })
    }
}

/// Put `number` into the kind's number field unless the payload already has one.
/// Returns whether the payload was changed.
pub fn fill_number(
    payload: &mut Value,
    kind: DocumentKind,
    number: &str,
) -> Result<bool, ClientError> {
    let Some(object) = payload.as_object_mut() else {
        return Err(ClientError::InvalidPayload(
            "expected a JSON object".to_string(),
        ));
    };
    let field = kind.number_field();
    let present = object
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|n| !n.trim().is_empty());
    if present {
        return Ok(false);
    }
    object.insert(field.to_string(), Value::String(number.to_string()));
    Ok(true)
}

/// Number already present in the payload, if any
pub fn payload_number(payload: &Value, kind: DocumentKind) -> Option<&str> {
    payload
        .get(kind.number_field())
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_fill_number_only_when_missing() {
        let mut payload = json!({ "warehouseId": 1, "customerName": "Globex" });
        assert!(fill_number(&mut payload, DocumentKind::Delivery, "DEL-2024-004").unwrap());
        assert_eq!(payload["deliveryNumber"], "DEL-2024-004");

        let mut payload = json!({ "receiptNumber": "REC-2024-010" });
        assert!(!fill_number(&mut payload, DocumentKind::Receipt, "REC-2024-011").unwrap());
        assert_eq!(payload_number(&payload, DocumentKind::Receipt), Some("REC-2024-010"));

        let mut payload = json!([1, 2]);
        assert!(fill_number(&mut payload, DocumentKind::Receipt, "REC-2024-011").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_falls_back() {
        let client = ApiClient::new("http://127.0.0.1:1/", None).unwrap();
        let now = Utc.timestamp_millis_opt(1_718_000_123_456).unwrap();
        let resolved = client
            .resolve_number(DocumentKind::Transfer, &PrefixTable::default(), now)
            .await;
        assert!(resolved.is_fallback());
        assert_eq!(resolved.number(), "TRF-2024-123456");
    }
}
