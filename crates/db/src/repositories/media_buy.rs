use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use buyline_core::domain::order::{MediaBuy, MediaBuyId, OrderStatus};
use buyline_core::domain::principal::PrincipalId;

use super::{MediaBuyRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMediaBuyRepository {
    pool: DbPool,
}

impl SqlMediaBuyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_media_buy(row: &sqlx::sqlite::SqliteRow) -> Result<MediaBuy, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let media_buy_id: String = row.try_get("media_buy_id").map_err(decode)?;
    let campaign_name: String = row.try_get("campaign_name").map_err(decode)?;
    let principal_id: String = row.try_get("principal_id").map_err(decode)?;
    let tenant_id: String = row.try_get("tenant_id").map_err(decode)?;
    let total_budget_str: String = row.try_get("total_budget").map_err(decode)?;
    let currency: String = row.try_get("currency").map_err(decode)?;
    let flight_start_str: String = row.try_get("flight_start_date").map_err(decode)?;
    let flight_end_str: String = row.try_get("flight_end_date").map_err(decode)?;
    let status_str: String = row.try_get("status").map_err(decode)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode)?;
    let updated_at_str: String = row.try_get("updated_at").map_err(decode)?;

    let total_budget = Decimal::from_str(&total_budget_str)
        .map_err(|e| RepositoryError::Decode(format!("total_budget: {e}")))?;
    let flight_start_date = NaiveDate::parse_from_str(&flight_start_str, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("flight_start_date: {e}")))?;
    let flight_end_date = NaiveDate::parse_from_str(&flight_end_str, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("flight_end_date: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(MediaBuy {
        id,
        media_buy_id: MediaBuyId(media_buy_id),
        campaign_name,
        principal_id: PrincipalId(principal_id),
        tenant_id,
        total_budget,
        currency,
        flight_start_date,
        flight_end_date,
        status: OrderStatus::parse(&status_str),
        created_at,
        updated_at,
    })
}

#[async_trait::async_trait]
impl MediaBuyRepository for SqlMediaBuyRepository {
    async fn find_by_media_buy_id(
        &self,
        id: &MediaBuyId,
    ) -> Result<Option<MediaBuy>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, media_buy_id, campaign_name, principal_id, tenant_id, total_budget,
                    currency, flight_start_date, flight_end_date, status, created_at, updated_at
             FROM media_buys WHERE media_buy_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_media_buy(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, media_buy: MediaBuy) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO media_buys (id, media_buy_id, campaign_name, principal_id, tenant_id,
                                     total_budget, currency, flight_start_date, flight_end_date,
                                     status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(media_buy_id) DO UPDATE SET
                 campaign_name = excluded.campaign_name,
                 principal_id = excluded.principal_id,
                 tenant_id = excluded.tenant_id,
                 total_budget = excluded.total_budget,
                 currency = excluded.currency,
                 flight_start_date = excluded.flight_start_date,
                 flight_end_date = excluded.flight_end_date,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
        )
        .bind(&media_buy.id)
        .bind(&media_buy.media_buy_id.0)
        .bind(&media_buy.campaign_name)
        .bind(&media_buy.principal_id.0)
        .bind(&media_buy.tenant_id)
        .bind(media_buy.total_budget.to_string())
        .bind(&media_buy.currency)
        .bind(media_buy.flight_start_date.format("%Y-%m-%d").to_string())
        .bind(media_buy.flight_end_date.format("%Y-%m-%d").to_string())
        .bind(media_buy.status.as_str())
        .bind(media_buy.created_at.to_rfc3339())
        .bind(media_buy.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_status(
        &self,
        id: &MediaBuyId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE media_buys SET status = ?, updated_at = ? WHERE media_buy_id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<MediaBuy>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, media_buy_id, campaign_name, principal_id, tenant_id, total_budget,
                    currency, flight_start_date, flight_end_date, status, created_at, updated_at
             FROM media_buys WHERE status = ? ORDER BY created_at ASC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_media_buy).collect::<Result<Vec<_>, _>>()
    }
}
