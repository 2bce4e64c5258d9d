use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

/// Stock of one product in one warehouse, with the warehouse name for display
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseStock {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub warehouse_name: String,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

impl StockLevel {
    /// Current quantity, 0 when the product was never stocked in the warehouse
    pub async fn quantity(
        conn: &mut SqliteConnection,
        product_id: i64,
        warehouse_id: i64,
    ) -> Result<i64, sqlx::Error> {
        let quantity = sqlx::query_scalar::<_, i64>(
            "SELECT quantity FROM stock_levels WHERE product_id = ? AND warehouse_id = ?",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(conn)
        .await?;
        Ok(quantity.unwrap_or(0))
    }

    pub async fn set_quantity(
        conn: &mut SqliteConnection,
        product_id: i64,
        warehouse_id: i64,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, StockLevel>(
            r#"INSERT INTO stock_levels (product_id, warehouse_id, quantity, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(product_id, warehouse_id) DO UPDATE SET
                   quantity = excluded.quantity,
                   updated_at = excluded.updated_at
               RETURNING product_id, warehouse_id, quantity, updated_at"#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(quantity)
        .bind(now)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_product_id(
        pool: &SqlitePool,
        product_id: i64,
    ) -> Result<Vec<WarehouseStock>, sqlx::Error> {
        sqlx::query_as::<_, WarehouseStock>(
            r#"SELECT sl.product_id,
                      sl.warehouse_id,
                      w.name AS warehouse_name,
                      sl.quantity,
                      sl.updated_at
               FROM stock_levels sl
               JOIN warehouses w ON w.id = sl.warehouse_id
               WHERE sl.product_id = ?
               ORDER BY sl.warehouse_id ASC"#,
        )
        .bind(product_id)
        .fetch_all(pool)
        .await
    }
}
