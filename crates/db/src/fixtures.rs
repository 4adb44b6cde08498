use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use buyline_core::domain::order::{MediaBuy, MediaBuyId, OrderStatus};
use buyline_core::domain::package::Package;
use buyline_core::domain::principal::{AccessLevel, Principal, PrincipalId};
use buyline_core::domain::product::{Product, ProductId};

use crate::connection::DbPool;
use crate::repositories::{
    MediaBuyRepository, PackageRepository, PrincipalRepository, ProductRepository,
    RepositoryError, SqlMediaBuyRepository, SqlPackageRepository, SqlPrincipalRepository,
    SqlProductRepository,
};

const SEED_PRINCIPAL_IDS: &[&str] = &["nike", "acme_beverages"];
const SEED_PRODUCT_IDS: &[&str] =
    &["yahoo_homepage_takeover", "yahoo_sports_ros", "yahoo_finance_video"];
const SEED_MEDIA_BUY_IDS: &[&str] = &["nike_running_gear_q1", "acme_spring_refresh"];

pub struct SeedResult {
    pub principals: usize,
    pub products: usize,
    pub media_buys: usize,
}

pub struct VerificationResult {
    pub checks: Vec<(&'static str, bool)>,
}

impl VerificationResult {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|(_, ok)| *ok)
    }
}

/// Deterministic demo dataset: two advertisers at different access levels,
/// three products, and two pending orders ready for the approval workflow.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let principals = SqlPrincipalRepository::new(pool.clone());
        let products = SqlProductRepository::new(pool.clone());
        let media_buys = SqlMediaBuyRepository::new(pool.clone());
        let packages = SqlPackageRepository::new(pool.clone());

        principals
            .save(Principal {
                id: PrincipalId("nike".to_string()),
                tenant_id: "yahoo".to_string(),
                name: "Nike".to_string(),
                access_level: AccessLevel::Enterprise,
                active: true,
            })
            .await?;
        principals
            .save(Principal {
                id: PrincipalId("acme_beverages".to_string()),
                tenant_id: "yahoo".to_string(),
                name: "Acme Beverages".to_string(),
                access_level: AccessLevel::Standard,
                active: true,
            })
            .await?;

        products
            .save(Product {
                id: ProductId("yahoo_homepage_takeover".to_string()),
                name: "Yahoo Homepage Takeover".to_string(),
                minimum_budget: Decimal::new(50_000, 0),
                cpm: Decimal::new(2500, 2),
                active: true,
            })
            .await?;
        products
            .save(Product {
                id: ProductId("yahoo_sports_ros".to_string()),
                name: "Yahoo Sports Run of Site".to_string(),
                minimum_budget: Decimal::new(5_000, 0),
                cpm: Decimal::new(850, 2),
                active: true,
            })
            .await?;
        products
            .save(Product {
                id: ProductId("yahoo_finance_video".to_string()),
                name: "Yahoo Finance Video".to_string(),
                minimum_budget: Decimal::new(15_000, 0),
                cpm: Decimal::new(1800, 2),
                active: true,
            })
            .await?;

        let now = Utc::now();
        media_buys
            .save(MediaBuy {
                id: "row-nike_running_gear_q1".to_string(),
                media_buy_id: MediaBuyId("nike_running_gear_q1".to_string()),
                campaign_name: "Nike Running Gear Q1".to_string(),
                principal_id: PrincipalId("nike".to_string()),
                tenant_id: "yahoo".to_string(),
                total_budget: Decimal::new(250_000, 0),
                currency: "USD".to_string(),
                flight_start_date: NaiveDate::from_ymd_opt(2027, 3, 1).expect("valid date"),
                flight_end_date: NaiveDate::from_ymd_opt(2027, 4, 30).expect("valid date"),
                status: OrderStatus::Pending,
                created_at: now,
                updated_at: now,
            })
            .await?;
        media_buys
            .save(MediaBuy {
                id: "row-acme_spring_refresh".to_string(),
                media_buy_id: MediaBuyId("acme_spring_refresh".to_string()),
                campaign_name: "Acme Spring Refresh".to_string(),
                principal_id: PrincipalId("acme_beverages".to_string()),
                tenant_id: "yahoo".to_string(),
                total_budget: Decimal::new(45_000, 0),
                currency: "USD".to_string(),
                flight_start_date: NaiveDate::from_ymd_opt(2027, 4, 1).expect("valid date"),
                flight_end_date: NaiveDate::from_ymd_opt(2027, 5, 15).expect("valid date"),
                status: OrderStatus::Pending,
                created_at: now,
                updated_at: now,
            })
            .await?;

        packages
            .save(Package {
                id: "pkg-nike-001".to_string(),
                media_buy_id: MediaBuyId("nike_running_gear_q1".to_string()),
                product_id: ProductId("yahoo_homepage_takeover".to_string()),
                budget: Decimal::new(150_000, 0),
                pricing_model: "cpm".to_string(),
                pacing: "even".to_string(),
                format_ids: vec!["display_300x250".to_string(), "display_728x90".to_string()],
            })
            .await?;
        packages
            .save(Package {
                id: "pkg-nike-002".to_string(),
                media_buy_id: MediaBuyId("nike_running_gear_q1".to_string()),
                product_id: ProductId("yahoo_finance_video".to_string()),
                budget: Decimal::new(100_000, 0),
                pricing_model: "cpm".to_string(),
                pacing: "even".to_string(),
                format_ids: vec!["video_16x9_15s".to_string(), "video_16x9_30s".to_string()],
            })
            .await?;
        packages
            .save(Package {
                id: "pkg-acme-001".to_string(),
                media_buy_id: MediaBuyId("acme_spring_refresh".to_string()),
                product_id: ProductId("yahoo_sports_ros".to_string()),
                budget: Decimal::new(45_000, 0),
                pricing_model: "cpm".to_string(),
                pacing: "asap".to_string(),
                format_ids: vec!["display_300x250".to_string()],
            })
            .await?;

        Ok(SeedResult {
            principals: SEED_PRINCIPAL_IDS.len(),
            products: SEED_PRODUCT_IDS.len(),
            media_buys: SEED_MEDIA_BUY_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let principal_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM principals WHERE id IN ('nike', 'acme_beverages')")
                .fetch_one(pool)
                .await?;
        checks.push(("principals", principal_count == SEED_PRINCIPAL_IDS.len() as i64));

        let product_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM products
             WHERE id IN ('yahoo_homepage_takeover', 'yahoo_sports_ros', 'yahoo_finance_video')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("products", product_count == SEED_PRODUCT_IDS.len() as i64));

        let media_buy_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM media_buys
             WHERE media_buy_id IN ('nike_running_gear_q1', 'acme_spring_refresh')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("media-buys", media_buy_count == SEED_MEDIA_BUY_IDS.len() as i64));

        let package_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM packages").fetch_one(pool).await?;
        checks.push(("packages", package_count == 3));

        Ok(VerificationResult { checks })
    }
}
