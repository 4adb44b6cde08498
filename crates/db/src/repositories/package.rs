use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;

use buyline_core::domain::order::MediaBuyId;
use buyline_core::domain::package::Package;
use buyline_core::domain::product::ProductId;

use super::{PackageRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPackageRepository {
    pool: DbPool,
}

impl SqlPackageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PackageRepository for SqlPackageRepository {
    async fn list_for_media_buy(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> Result<Vec<Package>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, media_buy_id, product_id, budget, pricing_model, pacing
             FROM packages WHERE media_buy_id = ? ORDER BY id ASC",
        )
        .bind(&media_buy_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut packages = Vec::with_capacity(rows.len());
        for row in &rows {
            let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

            let id: String = row.try_get("id").map_err(decode)?;
            let media_buy_id: String = row.try_get("media_buy_id").map_err(decode)?;
            let product_id: String = row.try_get("product_id").map_err(decode)?;
            let budget_str: String = row.try_get("budget").map_err(decode)?;
            let pricing_model: String = row.try_get("pricing_model").map_err(decode)?;
            let pacing: String = row.try_get("pacing").map_err(decode)?;

            let budget = Decimal::from_str(&budget_str)
                .map_err(|e| RepositoryError::Decode(format!("budget: {e}")))?;

            let format_rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
                "SELECT format_id FROM package_formats WHERE package_id = ? ORDER BY format_id",
            )
            .bind(&id)
            .fetch_all(&self.pool)
            .await?;

            let format_ids = format_rows
                .iter()
                .map(|r| r.try_get::<String, _>("format_id").map_err(decode))
                .collect::<Result<Vec<_>, _>>()?;

            packages.push(Package {
                id,
                media_buy_id: MediaBuyId(media_buy_id),
                product_id: ProductId(product_id),
                budget,
                pricing_model,
                pacing,
                format_ids,
            });
        }

        Ok(packages)
    }

    async fn save(&self, package: Package) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO packages (id, media_buy_id, product_id, budget, pricing_model, pacing)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 product_id = excluded.product_id,
                 budget = excluded.budget,
                 pricing_model = excluded.pricing_model,
                 pacing = excluded.pacing",
        )
        .bind(&package.id)
        .bind(&package.media_buy_id.0)
        .bind(&package.product_id.0)
        .bind(package.budget.to_string())
        .bind(&package.pricing_model)
        .bind(&package.pacing)
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM package_formats WHERE package_id = ?")
            .bind(&package.id)
            .execute(&self.pool)
            .await?;

        for format_id in &package.format_ids {
            sqlx::query("INSERT INTO package_formats (package_id, format_id) VALUES (?, ?)")
                .bind(&package.id)
                .bind(format_id)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use buyline_core::domain::order::{MediaBuy, MediaBuyId, OrderStatus};
    use buyline_core::domain::package::Package;
    use buyline_core::domain::principal::PrincipalId;
    use buyline_core::domain::product::ProductId;

    use super::SqlPackageRepository;
    use crate::repositories::{MediaBuyRepository, PackageRepository, SqlMediaBuyRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    /// Insert a parent media buy so that FK constraints are satisfied.
    async fn insert_media_buy(pool: &sqlx::SqlitePool, media_buy_id: &str) {
        let repo = SqlMediaBuyRepository::new(pool.clone());
        let now = Utc::now();
        repo.save(MediaBuy {
            id: format!("row-{media_buy_id}"),
            media_buy_id: MediaBuyId(media_buy_id.to_string()),
            campaign_name: "Test Campaign".to_string(),
            principal_id: PrincipalId("nike".to_string()),
            tenant_id: "yahoo".to_string(),
            total_budget: Decimal::new(50_000, 0),
            currency: "USD".to_string(),
            flight_start_date: NaiveDate::from_ymd_opt(2027, 3, 1).unwrap(),
            flight_end_date: NaiveDate::from_ymd_opt(2027, 4, 30).unwrap(),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("insert parent media buy");
    }

    fn sample_package(id: &str, media_buy_id: &str) -> Package {
        Package {
            id: id.to_string(),
            media_buy_id: MediaBuyId(media_buy_id.to_string()),
            product_id: ProductId("yahoo_sports_ros".to_string()),
            budget: Decimal::new(25_000, 0),
            pricing_model: "cpm".to_string(),
            pacing: "even".to_string(),
            format_ids: vec!["display_300x250".to_string(), "display_728x90".to_string()],
        }
    }

    #[tokio::test]
    async fn save_and_list_round_trips_formats() {
        let pool = setup().await;
        insert_media_buy(&pool, "mb_pkg").await;

        let repo = SqlPackageRepository::new(pool);
        repo.save(sample_package("pkg-1", "mb_pkg")).await.expect("save");

        let packages =
            repo.list_for_media_buy(&MediaBuyId("mb_pkg".to_string())).await.expect("list");
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].budget, Decimal::new(25_000, 0));
        assert_eq!(
            packages[0].format_ids,
            vec!["display_300x250".to_string(), "display_728x90".to_string()]
        );
    }

    #[tokio::test]
    async fn save_replaces_format_set_on_upsert() {
        let pool = setup().await;
        insert_media_buy(&pool, "mb_pkg").await;

        let repo = SqlPackageRepository::new(pool);
        repo.save(sample_package("pkg-1", "mb_pkg")).await.expect("save");

        let mut updated = sample_package("pkg-1", "mb_pkg");
        updated.format_ids = vec!["video_16x9_15s".to_string()];
        repo.save(updated).await.expect("upsert");

        let packages =
            repo.list_for_media_buy(&MediaBuyId("mb_pkg".to_string())).await.expect("list");
        assert_eq!(packages[0].format_ids, vec!["video_16x9_15s".to_string()]);
    }

    #[tokio::test]
    async fn list_is_scoped_to_media_buy() {
        let pool = setup().await;
        insert_media_buy(&pool, "mb_a").await;
        insert_media_buy(&pool, "mb_b").await;

        let repo = SqlPackageRepository::new(pool);
        repo.save(sample_package("pkg-a", "mb_a")).await.expect("save a");
        repo.save(sample_package("pkg-b", "mb_b")).await.expect("save b");

        let packages =
            repo.list_for_media_buy(&MediaBuyId("mb_a".to_string())).await.expect("list");
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].id, "pkg-a");
    }
}
