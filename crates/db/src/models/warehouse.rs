use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateWarehouse {
    pub name: String,
    pub location: Option<String>,
}

impl Warehouse {
    pub async fn find_all(
        pool: &SqlitePool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Warehouse>(
            r#"SELECT id, name, location, created_at
               FROM warehouses
               ORDER BY id ASC
               LIMIT ? OFFSET ?"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Warehouse>(
            "SELECT id, name, location, created_at FROM warehouses WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateWarehouse,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Warehouse>(
            r#"INSERT INTO warehouses (name, location, created_at)
               VALUES (?, ?, ?)
               RETURNING id, name, location, created_at"#,
        )
        .bind(data.name.trim())
        .bind(data.location.as_deref().map(str::trim))
        .bind(now)
        .fetch_one(pool)
        .await
    }
}
