use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

use super::{
    document::{DocumentFilter, DocumentStatus},
    product::Product,
    warehouse::Warehouse,
};

/// Stock count correction for one product in one warehouse
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub id: i64,
    pub adjustment_number: String,
    pub warehouse_id: i64,
    pub product_id: i64,
    pub system_quantity: i64,
    pub counted_quantity: i64,
    pub difference: i64,
    pub reason: Option<String>,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AdjustmentDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub adjustment: Adjustment,
    pub product: Option<Product>,
    pub warehouse: Option<Warehouse>,
}

impl std::ops::Deref for AdjustmentDetail {
    type Target = Adjustment;
    fn deref(&self) -> &Self::Target {
        &self.adjustment
    }
}

/// Payload of `POST /api/adjustments`, as sent by the adjustment form
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdjustment {
    pub adjustment_number: String,
    pub warehouse_id: i64,
    /// `None` together with `new_product_name` creates the product first
    pub product_id: Option<i64>,
    #[serde(rename = "increase_by", alias = "increaseBy", default)]
    pub increase_by: i64,
    #[serde(rename = "decrease_by", alias = "decreaseBy", default)]
    pub decrease_by: i64,
    #[serde(alias = "reason")]
    pub notes: Option<String>,
    #[serde(rename = "new_product_name", alias = "newProductName")]
    pub new_product_name: Option<String>,
}

/// Row values computed by the document service before insertion
#[derive(Debug, Clone)]
pub struct NewAdjustment {
    pub adjustment_number: String,
    pub warehouse_id: i64,
    pub product_id: i64,
    pub system_quantity: i64,
    pub counted_quantity: i64,
    pub reason: Option<String>,
}

const ADJUSTMENT_COLUMNS: &str = "id, adjustment_number, warehouse_id, product_id, \
     system_quantity, counted_quantity, difference, reason, status, created_at, validated_at";

impl Adjustment {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Adjustment>(&format!(
            "SELECT {ADJUSTMENT_COLUMNS} FROM adjustments WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_detail(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<AdjustmentDetail>, sqlx::Error> {
        let Some(adjustment) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let product = Product::find_by_id(pool, adjustment.product_id).await?;
        let warehouse = Warehouse::find_by_id(pool, adjustment.warehouse_id).await?;
        Ok(Some(AdjustmentDetail {
            adjustment,
            product,
            warehouse,
        }))
    }

    pub async fn find_all(
        pool: &SqlitePool,
        filter: &DocumentFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let search = filter.search_pattern();
        sqlx::query_as::<_, Adjustment>(&format!(
            r#"SELECT {ADJUSTMENT_COLUMNS}
               FROM adjustments
               WHERE (? IS NULL OR status = ?)
                 AND (? IS NULL OR adjustment_number LIKE ?)
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

    pub async fn create<'e, E>(
        executor: E,
        data: &NewAdjustment,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Adjustment>(&format!(
            r#"INSERT INTO adjustments
                   (adjustment_number, warehouse_id, product_id, system_quantity,
                    counted_quantity, difference, reason, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING {ADJUSTMENT_COLUMNS}"#
        ))
        .bind(&data.adjustment_number)
        .bind(data.warehouse_id)
        .bind(data.product_id)
        .bind(data.system_quantity)
        .bind(data.counted_quantity)
        .bind(data.counted_quantity - data.system_quantity)
        .bind(data.reason.as_deref())
        .bind(DocumentStatus::Draft)
        .bind(now)
        .fetch_one(executor)
        .await
    }
}
