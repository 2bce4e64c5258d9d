use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use ts_rs::TS;

use super::document::{DocumentFilter, DocumentStatus};

/// Incoming goods from a supplier
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: i64,
    pub receipt_number: String,
    pub warehouse_id: i64,
    pub supplier_name: String,
    pub status: DocumentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

/// Line item joined with its product for display
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    pub id: i64,
    pub receipt_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub quantity: i64,
    pub unit_price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ReceiptWithItems {
    #[serde(flatten)]
    #[ts(flatten)]
    pub receipt: Receipt,
    pub items: Vec<ReceiptItem>,
}

impl std::ops::Deref for ReceiptWithItems {
    type Target = Receipt;
    fn deref(&self) -> &Self::Target {
        &self.receipt
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Option<f64>,
}

/// Payload of `POST /api/receipts`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceipt {
    pub receipt_number: String,
    pub warehouse_id: i64,
    pub supplier_name: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<CreateReceiptItem>,
}

const RECEIPT_COLUMNS: &str =
    "id, receipt_number, warehouse_id, supplier_name, status, notes, created_at, validated_at";

impl Receipt {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Receipt>(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_with_items(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<ReceiptWithItems>, sqlx::Error> {
        let Some(receipt) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let items = Self::find_items(pool, id).await?;
        Ok(Some(ReceiptWithItems { receipt, items }))
    }

    pub async fn find_items<'e, E>(
        executor: E,
        receipt_id: i64,
    ) -> Result<Vec<ReceiptItem>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ReceiptItem>(
            r#"SELECT ri.id,
                      ri.receipt_id,
                      ri.product_id,
                      p.name AS product_name,
                      p.sku AS product_sku,
                      ri.quantity,
                      ri.unit_price,
                      ri.created_at
               FROM receipt_items ri
               JOIN products p ON p.id = ri.product_id
               WHERE ri.receipt_id = ?
               ORDER BY ri.id ASC"#,
        )
        .bind(receipt_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_all(
        pool: &SqlitePool,
        filter: &DocumentFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let search = filter.search_pattern();
        sqlx::query_as::<_, Receipt>(&format!(
            r#"SELECT {RECEIPT_COLUMNS}
               FROM receipts
               WHERE (? IS NULL OR status = ?)
                 AND (? IS NULL OR receipt_number LIKE ?)
               ORDER BY created_at DESC, id DESC
               LIMIT ? OFFSET ?"#
        ))
        .bind(filter.status)
        .bind(filter.status)
        .bind(search.as_deref())
        .bind(search.as_deref())
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(pool)
        .await
    }

    /// Insert the header and its items. Run inside a transaction so a rejected
    /// number leaves no orphan rows.
    pub async fn create(
        conn: &mut SqliteConnection,
        data: &CreateReceipt,
        now: DateTime<Utc>,
    ) -> Result<ReceiptWithItems, sqlx::Error> {
        let receipt = sqlx::query_as::<_, Receipt>(&format!(
            r#"INSERT INTO receipts
                   (receipt_number, warehouse_id, supplier_name, status, notes, created_at)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING {RECEIPT_COLUMNS}"#
        ))
        .bind(data.receipt_number.trim())
        .bind(data.warehouse_id)
        .bind(data.supplier_name.trim())
        .bind(DocumentStatus::Draft)
        .bind(data.notes.as_deref())
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        for item in &data.items {
            sqlx::query(
                r#"INSERT INTO receipt_items (receipt_id, product_id, quantity, unit_price, created_at)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(receipt.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price.unwrap_or(0.0))
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }

        let items = Self::find_items(&mut *conn, receipt.id).await?;
        Ok(ReceiptWithItems { receipt, items })
    }
}
