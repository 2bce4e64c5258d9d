//! Read projection over the number column of every document table.

use sqlx::SqlitePool;
use utils::document_number::DocumentKind;

/// Table and number column holding the numbers of one document kind
pub fn number_column(kind: DocumentKind) -> (&'static str, &'static str) {
    match kind {
        DocumentKind::Adjustment => ("adjustments", "adjustment_number"),
        DocumentKind::Delivery => ("deliveries", "delivery_number"),
        DocumentKind::Transfer => ("transfers", "transfer_number"),
        DocumentKind::Receipt => ("receipts", "receipt_number"),
    }
}

pub struct DocumentNumber;

impl DocumentNumber {
    /// Stored numbers of `kind` starting with `prefix`. The comparison is an
    /// exact, case-sensitive prefix match (SQLite `LIKE` would fold ASCII case).
    pub async fn list_by_prefix(
        pool: &SqlitePool,
        kind: DocumentKind,
        prefix: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        let (table, column) = number_column(kind);
        sqlx::query_scalar::<_, String>(&format!(
            "SELECT {column} FROM {table} WHERE substr({column}, 1, length(?)) = ?"
        ))
        .bind(prefix)
        .bind(prefix)
        .fetch_all(pool)
        .await
    }
}

/// True when `err` is the unique-constraint violation on the number column of `kind`
pub fn is_number_conflict(err: &sqlx::Error, kind: DocumentKind) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };
    let (table, column) = number_column(kind);
    db_err.is_unique_violation() && db_err.message().contains(&format!("{table}.{column}"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        DBService,
        models::{
            transfer::{CreateTransfer, Transfer},
            warehouse::{CreateWarehouse, Warehouse},
        },
    };

    async fn seed_transfer(db: &DBService, number: &str, from: i64, to: i64) {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        Transfer::create(
            &mut conn,
            &CreateTransfer {
                transfer_number: number.to_string(),
                from_warehouse_id: from,
                to_warehouse_id: to,
                notes: None,
                items: vec![],
            },
            now,
        )
        .await
        .unwrap();
    }

    async fn two_warehouses(db: &DBService) -> (i64, i64) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut ids = Vec::new();
        for name in ["Main", "Overflow"] {
            let warehouse = Warehouse::create(
                &db.pool,
                &CreateWarehouse {
                    name: name.to_string(),
                    location: None,
                },
                now,
            )
            .await
            .unwrap();
            ids.push(warehouse.id);
        }
        (ids[0], ids[1])
    }

    #[tokio::test]
    async fn test_list_by_prefix_is_exact_and_case_sensitive() {
        let db = DBService::new_in_memory().await.unwrap();
        let (from, to) = two_warehouses(&db).await;
        for number in ["TRF-2024-001", "TRF-2024-002", "trf-2024-009", "TRF-2023-050", "XTRF-2024-070"] {
            seed_transfer(&db, number, from, to).await;
        }

        let mut numbers = DocumentNumber::list_by_prefix(&db.pool, DocumentKind::Transfer, "TRF-2024-")
            .await
            .unwrap();
        numbers.sort();
        assert_eq!(numbers, vec!["TRF-2024-001", "TRF-2024-002"]);

        let other_kind = DocumentNumber::list_by_prefix(&db.pool, DocumentKind::Delivery, "TRF-2024-")
            .await
            .unwrap();
        assert!(other_kind.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_number_is_detected_as_conflict() {
        let db = DBService::new_in_memory().await.unwrap();
        let (from, to) = two_warehouses(&db).await;
        seed_transfer(&db, "TRF-2024-001", from, to).await;

        let mut conn = db.pool.acquire().await.unwrap();
        let err = Transfer::create(
            &mut conn,
            &CreateTransfer {
                transfer_number: "TRF-2024-001".to_string(),
                from_warehouse_id: from,
                to_warehouse_id: to,
                notes: None,
                items: vec![],
            },
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(is_number_conflict(&err, DocumentKind::Transfer));
        assert!(!is_number_conflict(&err, DocumentKind::Delivery));
    }
}
