use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use ts_rs::TS;

use super::document::{DocumentFilter, DocumentStatus};

/// Outgoing shipment to a customer
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: i64,
    pub delivery_number: String,
    pub warehouse_id: i64,
    pub customer_name: String,
    pub status: DocumentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

/// Line item joined with its product for display
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItem {
    pub id: i64,
    pub delivery_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub quantity: i64,
    pub unit_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DeliveryWithItems {
    #[serde(flatten)]
    #[ts(flatten)]
    pub delivery: Delivery,
    pub items: Vec<DeliveryItem>,
}

impl std::ops::Deref for DeliveryWithItems {
    type Target = Delivery;
    fn deref(&self) -> &Self::Target {
        &self.delivery
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Option<f64>,
}

/// Payload of `POST /api/deliveries`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateDelivery {
    pub delivery_number: String,
    pub warehouse_id: i64,
    pub customer_name: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<CreateDeliveryItem>,
}

const DELIVERY_COLUMNS: &str =
    "id, delivery_number, warehouse_id, customer_name, status, notes, created_at, validated_at";

impl Delivery {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Delivery>(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_with_items(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<DeliveryWithItems>, sqlx::Error> {
        let Some(delivery) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let items = Self::find_items(pool, id).await?;
        Ok(Some(DeliveryWithItems { delivery, items }))
    }

    pub async fn find_items<'e, E>(
        executor: E,
        delivery_id: i64,
    ) -> Result<Vec<DeliveryItem>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DeliveryItem>(
            r#"SELECT di.id,
                      di.delivery_id,
                      di.product_id,
                      p.name AS product_name,
                      p.sku AS product_sku,
                      di.quantity,
                      di.unit_price,
                      di.created_at
               FROM delivery_items di
               JOIN products p ON p.id = di.product_id
               WHERE di.delivery_id = ?
               ORDER BY di.id ASC"#,
        )
        .bind(delivery_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_all(
        pool: &SqlitePool,
        filter: &DocumentFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let search = filter.search_pattern();
        sqlx::query_as::<_, Delivery>(&format!(
            r#"SELECT {DELIVERY_COLUMNS}
               FROM deliveries
               WHERE (? IS NULL OR status = ?)
                 AND (? IS NULL OR delivery_number LIKE ?)
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
        data: &CreateDelivery,
        now: DateTime<Utc>,
    ) -> Result<DeliveryWithItems, sqlx::Error> {
        let delivery = sqlx::query_as::<_, Delivery>(&format!(
            r#"INSERT INTO deliveries
                   (delivery_number, warehouse_id, customer_name, status, notes, created_at)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING {DELIVERY_COLUMNS}"#
        ))
        .bind(data.delivery_number.trim())
        .bind(data.warehouse_id)
        .bind(data.customer_name.trim())
        .bind(DocumentStatus::Draft)
        .bind(data.notes.as_deref())
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        for item in &data.items {
            sqlx::query(
                r#"INSERT INTO delivery_items (delivery_id, product_id, quantity, unit_price, created_at)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(delivery.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }

        let items = Self::find_items(&mut *conn, delivery.id).await?;
        Ok(DeliveryWithItems { delivery, items })
    }
}
