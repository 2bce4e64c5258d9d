use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use utils::document_number::DocumentKind;

use super::document_number::number_column;

/// Lifecycle status shared by every inventory document
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "document_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Waiting,
    Ready,
    Done,
    Cancelled,
}

impl DocumentStatus {
    /// Done and cancelled documents can no longer be validated or cancelled
    pub fn is_final(self) -> bool {
        matches!(self, DocumentStatus::Done | DocumentStatus::Cancelled)
    }
}

/// Current status of a document, `None` when it does not exist
pub async fn find_status(
    pool: &SqlitePool,
    kind: DocumentKind,
    id: i64,
) -> Result<Option<DocumentStatus>, sqlx::Error> {
    let (table, _) = number_column(kind);
    sqlx::query_scalar::<_, DocumentStatus>(&format!("SELECT status FROM {table} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Move a document that is not yet final to `status`. Returns false when the
/// document does not exist or is already done or cancelled, so two concurrent
/// validations cannot both succeed.
pub async fn transition_status(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    id: i64,
    status: DocumentStatus,
    validated_at: Option<DateTime<Utc>>,
) -> Result<bool, sqlx::Error> {
    let (table, _) = number_column(kind);
    let result = sqlx::query(&format!(
        r#"UPDATE {table}
           SET status = ?, validated_at = coalesce(?, validated_at)
           WHERE id = ? AND status NOT IN ('done', 'cancelled')"#
    ))
    .bind(status)
    .bind(validated_at)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Query parameters accepted by document list endpoints
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct DocumentFilter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<DocumentStatus>,
    /// Substring of the document number
    pub search: Option<String>,
}

impl DocumentFilter {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// `LIKE` pattern for the number search, `None` when no search was given
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_and_clamping() {
        let filter = DocumentFilter::default();
        assert_eq!(filter.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset(), 0);
        assert_eq!(filter.search_pattern(), None);

        let filter = DocumentFilter {
            limit: Some(5000),
            offset: Some(-3),
            status: None,
            search: Some("  2024 ".to_string()),
        };
        assert_eq!(filter.limit(), MAX_PAGE_SIZE);
        assert_eq!(filter.offset(), 0);
        assert_eq!(filter.search_pattern().as_deref(), Some("%2024%"));
    }

    #[test]
    fn test_final_statuses() {
        assert!(DocumentStatus::Done.is_final());
        assert!(DocumentStatus::Cancelled.is_final());
        assert!(!DocumentStatus::Draft.is_final());
        assert!(!DocumentStatus::Ready.is_final());
        assert_eq!(DocumentStatus::Waiting.to_string(), "waiting");
    }
}
