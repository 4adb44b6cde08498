use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;

use buyline_core::domain::product::{Product, ProductId};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let minimum_budget_str: String = row.try_get("minimum_budget").map_err(decode)?;
    let cpm_str: String = row.try_get("cpm").map_err(decode)?;
    let active: i64 = row.try_get("active").map_err(decode)?;

    let minimum_budget = Decimal::from_str(&minimum_budget_str)
        .map_err(|e| RepositoryError::Decode(format!("minimum_budget: {e}")))?;
    let cpm =
        Decimal::from_str(&cpm_str).map_err(|e| RepositoryError::Decode(format!("cpm: {e}")))?;

    Ok(Product { id: ProductId(id), name, minimum_budget, cpm, active: active != 0 })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, name, minimum_budget, cpm, active FROM products WHERE id = ?")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_product(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO products (id, name, minimum_budget, cpm, active)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 minimum_budget = excluded.minimum_budget,
                 cpm = excluded.cpm,
                 active = excluded.active",
        )
        .bind(&product.id.0)
        .bind(&product.name)
        .bind(product.minimum_budget.to_string())
        .bind(product.cpm.to_string())
        .bind(i64::from(product.active))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
