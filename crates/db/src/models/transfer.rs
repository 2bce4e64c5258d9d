use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use ts_rs::TS;

use super::document::{DocumentFilter, DocumentStatus};

/// Movement of stock between two warehouses
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: i64,
    pub transfer_number: String,
    pub from_warehouse_id: i64,
    pub to_warehouse_id: i64,
    pub status: DocumentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TransferItem {
    pub id: i64,
    pub transfer_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TransferWithItems {
    #[serde(flatten)]
    #[ts(flatten)]
    pub transfer: Transfer,
    pub items: Vec<TransferItem>,
}

impl std::ops::Deref for TransferWithItems {
    type Target = Transfer;
    fn deref(&self) -> &Self::Target {
        &self.transfer
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferItem {
    pub product_id: i64,
    pub quantity: i64,
}

/// Payload of `POST /api/transfers`. The transfer form sends no items; they
/// can be attached by API clients.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransfer {
    pub transfer_number: String,
    pub from_warehouse_id: i64,
    pub to_warehouse_id: i64,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<CreateTransferItem>,
}

const TRANSFER_COLUMNS: &str = "id, transfer_number, from_warehouse_id, to_warehouse_id, \
     status, notes, created_at, validated_at";

impl Transfer {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Transfer>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_with_items(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<TransferWithItems>, sqlx::Error> {
        let Some(transfer) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let items = Self::find_items(pool, id).await?;
        Ok(Some(TransferWithItems { transfer, items }))
    }

    pub async fn find_items<'e, E>(
        executor: E,
        transfer_id: i64,
    ) -> Result<Vec<TransferItem>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TransferItem>(
            r#"SELECT ti.id,
                      ti.transfer_id,
                      ti.product_id,
                      p.name AS product_name,
                      p.sku AS product_sku,
                      ti.quantity,
                      ti.created_at
               FROM transfer_items ti
               JOIN products p ON p.id = ti.product_id
               WHERE ti.transfer_id = ?
               ORDER BY ti.id ASC"#,
        )
        .bind(transfer_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_all(
        pool: &SqlitePool,
        filter: &DocumentFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let search = filter.search_pattern();
        sqlx::query_as::<_, Transfer>(&format!(
            r#"SELECT {TRANSFER_COLUMNS}
               FROM transfers
               WHERE (? IS NULL OR status = ?)
                 AND (? IS NULL OR transfer_number LIKE ?)
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

    pub async fn create(
        conn: &mut SqliteConnection,
        data: &CreateTransfer,
        now: DateTime<Utc>,
    ) -> Result<TransferWithItems, sqlx::Error> {
        let transfer = sqlx::query_as::<_, Transfer>(&format!(
            r#"INSERT INTO transfers
                   (transfer_number, from_warehouse_id, to_warehouse_id, status, notes, created_at)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING {TRANSFER_COLUMNS}"#
        ))
        .bind(data.transfer_number.trim())
        .bind(data.from_warehouse_id)
        .bind(data.to_warehouse_id)
        .bind(DocumentStatus::Draft)
        .bind(data.notes.as_deref())
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        for item in &data.items {
            sqlx::query(
                r#"INSERT INTO transfer_items (transfer_id, product_id, quantity, created_at)
                   VALUES (?, ?, ?, ?)"#,
            )
            .bind(transfer.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }

        let items = Self::find_items(&mut *conn, transfer.id).await?;
        Ok(TransferWithItems { transfer, items })
    }
}
