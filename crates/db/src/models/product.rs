use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub unit_of_measure: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub name: String,
    pub sku: Option<String>,
    pub unit_of_measure: Option<String>,
}

impl CreateProduct {
    /// Product created on the fly from the adjustment form, no SKU yet
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sku: None,
            unit_of_measure: None,
        }
    }
}

impl Product {
    /// Products whose name or SKU contains `search`, case-insensitively
    pub async fn find_all(
        pool: &SqlitePool,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        sqlx::query_as::<_, Product>(
            r#"SELECT id, name, sku, unit_of_measure, created_at
               FROM products
               WHERE ? IS NULL
                  OR lower(name) LIKE ?
                  OR lower(coalesce(sku, '')) LIKE ?
               ORDER BY name ASC, id ASC
               LIMIT ? OFFSET ?"#,
        )
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            "SELECT id, name, sku, unit_of_measure, created_at FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Ids from `ids` that have no product row
    pub async fn find_missing_ids(
        pool: &SqlitePool,
        ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error> {
        let mut missing = Vec::new();
        for &id in ids {
            if Self::find_by_id(pool, id).await?.is_none() && !missing.contains(&id) {
                missing.push(id);
            }
        }
        Ok(missing)
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateProduct,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Product>(
            r#"INSERT INTO products (name, sku, unit_of_measure, created_at)
               VALUES (?, ?, ?, ?)
               RETURNING id, name, sku, unit_of_measure, created_at"#,
        )
        .bind(data.name.trim())
        .bind(data.sku.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .bind(data.unit_of_measure.as_deref())
        .bind(now)
        .fetch_one(executor)
        .await
    }
}
