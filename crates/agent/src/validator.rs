use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use buyline_core::domain::order::{MediaBuy, MediaBuyId};
use buyline_core::domain::package::Package;
use buyline_core::domain::principal::Principal;
use buyline_core::validation::{is_known_format, OrderValidation, ValidationResult};
use buyline_db::repositories::{
    MediaBuyRepository, PackageRepository, PrincipalRepository, ProductRepository,
};

/// A package joined with its product master data, ready for display.
#[derive(Clone, Debug)]
pub struct PackageDetail {
    pub package: Package,
    pub product_name: String,
    pub estimated_impressions: i64,
}

/// Everything the summarization oracle and the Slack card need about one order.
#[derive(Clone, Debug)]
pub struct OrderDetails {
    pub media_buy: MediaBuy,
    pub principal: Option<Principal>,
    pub packages: Vec<PackageDetail>,
}

/// Runs the six pre-approval checks. Each check reads the datastore directly;
/// a repository failure becomes a failed check, never an error, so a partial
/// outage still yields a complete report.
pub struct OrderValidator {
    media_buys: Arc<dyn MediaBuyRepository>,
    packages: Arc<dyn PackageRepository>,
    products: Arc<dyn ProductRepository>,
    principals: Arc<dyn PrincipalRepository>,
}

impl OrderValidator {
    pub fn new(
        media_buys: Arc<dyn MediaBuyRepository>,
        packages: Arc<dyn PackageRepository>,
        products: Arc<dyn ProductRepository>,
        principals: Arc<dyn PrincipalRepository>,
    ) -> Self {
        Self { media_buys, packages, products, principals }
    }

    pub async fn validate(&self, media_buy_id: &MediaBuyId) -> OrderValidation {
        let media_buy = match self.media_buys.find_by_media_buy_id(media_buy_id).await {
            Ok(found) => found,
            Err(_) => None,
        };
        let packages = self.packages.list_for_media_buy(media_buy_id).await.unwrap_or_default();

        let mut checks = Vec::with_capacity(6);
        checks.push(self.check_media_buy_exists(media_buy_id, media_buy.as_ref()));
        checks.push(self.check_products_exist(&packages).await);
        checks.push(self.check_formats_exist(&packages));
        checks.push(self.check_principal_authorized(media_buy.as_ref()).await);
        checks.push(self.check_budget_limits(media_buy.as_ref()).await);
        checks.push(self.check_flight_dates(media_buy.as_ref()));

        OrderValidation::from_checks(media_buy_id.clone(), checks)
    }

    /// Join the order with its packages, products, and principal for display.
    pub async fn load_order_details(&self, media_buy_id: &MediaBuyId) -> Option<OrderDetails> {
        let media_buy = self.media_buys.find_by_media_buy_id(media_buy_id).await.ok()??;
        let principal = self.principals.find_by_id(&media_buy.principal_id).await.ok().flatten();
        let packages = self.packages.list_for_media_buy(media_buy_id).await.unwrap_or_default();

        let mut details = Vec::with_capacity(packages.len());
        for package in packages {
            let product = self.products.find_by_id(&package.product_id).await.ok().flatten();
            let product_name = product
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| package.product_id.0.clone());
            let estimated_impressions = product
                .as_ref()
                .map(|p| package.estimated_impressions(p.cpm))
                .unwrap_or_default();
            details.push(PackageDetail { package, product_name, estimated_impressions });
        }

        Some(OrderDetails { media_buy, principal, packages: details })
    }

    fn check_media_buy_exists(
        &self,
        media_buy_id: &MediaBuyId,
        media_buy: Option<&MediaBuy>,
    ) -> ValidationResult {
        match media_buy {
            Some(buy) => ValidationResult::pass(
                "media_buy_exists",
                format!("Media buy '{media_buy_id}' found"),
            )
            .with_details(serde_json::json!({
                "campaign_name": buy.campaign_name,
                "status": buy.status.as_str(),
            })),
            None => ValidationResult::fail(
                "media_buy_exists",
                format!("Media buy '{media_buy_id}' not found"),
            ),
        }
    }

    async fn check_products_exist(&self, packages: &[Package]) -> ValidationResult {
        if packages.is_empty() {
            return ValidationResult::fail("products_exist", "Order has no packages");
        }

        let mut missing = Vec::new();
        for package in packages {
            match self.products.find_by_id(&package.product_id).await {
                Ok(Some(product)) if product.active => {}
                Ok(Some(_)) => missing.push(format!("{} (inactive)", package.product_id.0)),
                Ok(None) => missing.push(package.product_id.0.clone()),
                Err(error) => {
                    return ValidationResult::fail(
                        "products_exist",
                        format!("Product lookup failed: {error}"),
                    )
                }
            }
        }

        if missing.is_empty() {
            ValidationResult::pass(
                "products_exist",
                format!("All {} package product(s) exist and are active", packages.len()),
            )
        } else {
            ValidationResult::fail(
                "products_exist",
                format!("Unknown or inactive product(s): {}", missing.join(", ")),
            )
            .with_details(serde_json::json!({ "missing": missing }))
        }
    }

    // Formats are optional at this stage; only attached ids are checked.
    fn check_formats_exist(&self, packages: &[Package]) -> ValidationResult {
        let format_ids: Vec<&String> =
            packages.iter().flat_map(|package| package.format_ids.iter()).collect();
        if format_ids.is_empty() {
            return ValidationResult::pass(
                "formats_exist",
                "No package formats to validate (optional)",
            );
        }

        let unknown: Vec<String> = format_ids
            .into_iter()
            .filter(|format_id| !is_known_format(format_id))
            .cloned()
            .collect();

        if unknown.is_empty() {
            ValidationResult::pass("formats_exist", "All creative formats are recognized")
        } else {
            ValidationResult::fail(
                "formats_exist",
                format!("Unknown creative format(s): {}", unknown.join(", ")),
            )
            .with_details(serde_json::json!({ "unknown": unknown }))
        }
    }

    async fn check_principal_authorized(&self, media_buy: Option<&MediaBuy>) -> ValidationResult {
        let Some(buy) = media_buy else {
            return ValidationResult::fail(
                "principal_authorized",
                "Cannot verify principal: media buy not found",
            );
        };

        match self.principals.find_by_id(&buy.principal_id).await {
            Ok(Some(principal)) if !principal.active => ValidationResult::fail(
                "principal_authorized",
                format!("Principal '{}' is deactivated", buy.principal_id.0),
            ),
            Ok(Some(principal)) if principal.tenant_id != buy.tenant_id => {
                ValidationResult::fail(
                    "principal_authorized",
                    format!(
                        "Principal '{}' belongs to tenant '{}', order is for tenant '{}'",
                        buy.principal_id.0, principal.tenant_id, buy.tenant_id
                    ),
                )
            }
            Ok(Some(principal)) => ValidationResult::pass(
                "principal_authorized",
                format!(
                    "Principal '{}' is authorized ({} access)",
                    principal.name,
                    principal.access_level.as_str()
                ),
            ),
            Ok(None) => ValidationResult::fail(
                "principal_authorized",
                format!("Principal '{}' not found", buy.principal_id.0),
            ),
            Err(error) => ValidationResult::fail(
                "principal_authorized",
                format!("Principal lookup failed: {error}"),
            ),
        }
    }

    async fn check_budget_limits(&self, media_buy: Option<&MediaBuy>) -> ValidationResult {
        let Some(buy) = media_buy else {
            return ValidationResult::fail(
                "budget_limits",
                "Cannot verify budget: media buy not found",
            );
        };

        if buy.total_budget < Decimal::ZERO {
            return ValidationResult::fail(
                "budget_limits",
                format!("Total budget {} must be non-negative", buy.total_budget),
            );
        }

        let ceiling = match self.principals.find_by_id(&buy.principal_id).await {
            Ok(Some(principal)) => principal.access_level.budget_ceiling(),
            Ok(None) => {
                return ValidationResult::fail(
                    "budget_limits",
                    format!(
                        "Cannot determine budget ceiling: principal '{}' not found",
                        buy.principal_id.0
                    ),
                )
            }
            Err(error) => {
                return ValidationResult::fail(
                    "budget_limits",
                    format!("Principal lookup failed: {error}"),
                )
            }
        };

        if buy.total_budget > ceiling {
            ValidationResult::fail(
                "budget_limits",
                format!(
                    "Total budget ${} exceeds the ${} ceiling for this principal",
                    buy.total_budget, ceiling
                ),
            )
            .with_details(serde_json::json!({
                "total_budget": buy.total_budget.to_string(),
                "ceiling": ceiling.to_string(),
            }))
        } else {
            ValidationResult::pass(
                "budget_limits",
                format!("Total budget ${} is within the ${} ceiling", buy.total_budget, ceiling),
            )
        }
    }

    fn check_flight_dates(&self, media_buy: Option<&MediaBuy>) -> ValidationResult {
        let Some(buy) = media_buy else {
            return ValidationResult::fail(
                "flight_dates",
                "Cannot verify flight dates: media buy not found",
            );
        };

        if buy.flight_start_date >= buy.flight_end_date {
            return ValidationResult::fail(
                "flight_dates",
                format!(
                    "Flight start {} must precede flight end {}",
                    buy.flight_start_date, buy.flight_end_date
                ),
            );
        }

        let today = Utc::now().date_naive();
        if buy.flight_start_date < today {
            return ValidationResult::fail(
                "flight_dates",
                format!("Flight start {} is in the past", buy.flight_start_date),
            );
        }

        ValidationResult::pass(
            "flight_dates",
            format!("Flight window {} to {} is valid", buy.flight_start_date, buy.flight_end_date),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use buyline_core::domain::order::{MediaBuy, MediaBuyId, OrderStatus};
    use buyline_core::domain::package::Package;
    use buyline_core::domain::principal::{AccessLevel, Principal, PrincipalId};
    use buyline_core::domain::product::{Product, ProductId};
    use buyline_db::repositories::{
        InMemoryMediaBuyRepository, InMemoryPackageRepository, InMemoryPrincipalRepository,
        InMemoryProductRepository, MediaBuyRepository, PackageRepository, PrincipalRepository,
        ProductRepository,
    };

    use super::OrderValidator;

    struct Fixture {
        media_buys: Arc<InMemoryMediaBuyRepository>,
        packages: Arc<InMemoryPackageRepository>,
        products: Arc<InMemoryProductRepository>,
        principals: Arc<InMemoryPrincipalRepository>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                media_buys: Arc::new(InMemoryMediaBuyRepository::default()),
                packages: Arc::new(InMemoryPackageRepository::default()),
                products: Arc::new(InMemoryProductRepository::default()),
                principals: Arc::new(InMemoryPrincipalRepository::default()),
            }
        }

        fn validator(&self) -> OrderValidator {
            OrderValidator::new(
                self.media_buys.clone(),
                self.packages.clone(),
                self.products.clone(),
                self.principals.clone(),
            )
        }

        async fn seed_valid_order(&self, media_buy_id: &str, budget: Decimal, level: AccessLevel) {
            self.seed_order_without_packages(media_buy_id, budget, level).await;
            self.packages
                .save(Package {
                    id: format!("pkg-{media_buy_id}"),
                    media_buy_id: MediaBuyId(media_buy_id.to_string()),
                    product_id: ProductId("yahoo_sports_ros".to_string()),
                    budget,
                    pricing_model: "cpm".to_string(),
                    pacing: "even".to_string(),
                    format_ids: vec!["display_300x250".to_string()],
                })
                .await
                .expect("seed package");
        }

        async fn seed_order_without_packages(
            &self,
            media_buy_id: &str,
            budget: Decimal,
            level: AccessLevel,
        ) {
            let now = Utc::now();
            self.principals
                .save(Principal {
                    id: PrincipalId("nike".to_string()),
                    tenant_id: "yahoo".to_string(),
                    name: "Nike".to_string(),
                    access_level: level,
                    active: true,
                })
                .await
                .expect("seed principal");
            self.products
                .save(Product {
                    id: ProductId("yahoo_sports_ros".to_string()),
                    name: "Yahoo Sports Run of Site".to_string(),
                    minimum_budget: Decimal::new(1_000, 0),
                    cpm: Decimal::new(850, 2),
                    active: true,
                })
                .await
                .expect("seed product");
            self.media_buys
                .save(MediaBuy {
                    id: format!("row-{media_buy_id}"),
                    media_buy_id: MediaBuyId(media_buy_id.to_string()),
                    campaign_name: "Nike Running Gear".to_string(),
                    principal_id: PrincipalId("nike".to_string()),
                    tenant_id: "yahoo".to_string(),
                    total_budget: budget,
                    currency: "USD".to_string(),
                    flight_start_date: (now + Duration::days(30)).date_naive(),
                    flight_end_date: (now + Duration::days(90)).date_naive(),
                    status: OrderStatus::Pending,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .expect("seed media buy");
        }
    }

    #[tokio::test]
    async fn clean_order_passes_all_six_checks() {
        let fixture = Fixture::new();
        fixture.seed_valid_order("mb_clean", Decimal::new(5_000, 0), AccessLevel::Enterprise).await;

        let validation =
            fixture.validator().validate(&MediaBuyId("mb_clean".to_string())).await;

        assert!(validation.all_passed, "failures: {:?}", validation.failed_checks());
        assert_eq!(validation.checks.len(), 6);
        assert_eq!(validation.summary, "✅ ALL VALIDATIONS PASSED (6/6)");
    }

    #[tokio::test]
    async fn missing_media_buy_fails_dependent_checks_without_erroring() {
        let fixture = Fixture::new();

        let validation =
            fixture.validator().validate(&MediaBuyId("ghost".to_string())).await;

        assert!(!validation.all_passed);
        assert_eq!(validation.checks.len(), 6);
        let failed = validation.failed_checks();
        assert!(failed.contains(&"media_buy_exists"));
        assert!(failed.contains(&"principal_authorized"));
        assert!(failed.contains(&"flight_dates"));
    }

    #[tokio::test]
    async fn standard_principal_over_ceiling_fails_budget_limits_only() {
        let fixture = Fixture::new();
        fixture
            .seed_valid_order("mb_over", Decimal::new(120_000, 0), AccessLevel::Standard)
            .await;

        let validation = fixture.validator().validate(&MediaBuyId("mb_over".to_string())).await;

        assert!(!validation.all_passed);
        assert_eq!(validation.failed_checks(), vec!["budget_limits"]);
        assert!(validation.summary.contains("budget_limits"));
    }

    #[tokio::test]
    async fn enterprise_principal_clears_the_same_budget() {
        let fixture = Fixture::new();
        fixture
            .seed_valid_order("mb_ent", Decimal::new(120_000, 0), AccessLevel::Enterprise)
            .await;

        let validation = fixture.validator().validate(&MediaBuyId("mb_ent".to_string())).await;
        assert!(validation.all_passed);
    }

    #[tokio::test]
    async fn order_without_packages_passes_the_optional_formats_check() {
        let fixture = Fixture::new();
        fixture
            .seed_order_without_packages("mb_bare", Decimal::new(5_000, 0), AccessLevel::Standard)
            .await;

        let validation = fixture.validator().validate(&MediaBuyId("mb_bare".to_string())).await;

        let formats =
            validation.checks.iter().find(|c| c.check_name == "formats_exist").expect("check");
        assert!(formats.passed, "absence of formats is optional, got: {}", formats.message);
        // Missing packages still fail the product check.
        assert_eq!(validation.failed_checks(), vec!["products_exist"]);
    }

    #[tokio::test]
    async fn package_without_format_ids_passes_the_formats_check() {
        let fixture = Fixture::new();
        fixture
            .seed_order_without_packages("mb_nofmt", Decimal::new(5_000, 0), AccessLevel::Standard)
            .await;
        fixture
            .packages
            .save(Package {
                id: "pkg-plain".to_string(),
                media_buy_id: MediaBuyId("mb_nofmt".to_string()),
                product_id: ProductId("yahoo_sports_ros".to_string()),
                budget: Decimal::new(1_000, 0),
                pricing_model: "cpm".to_string(),
                pacing: "even".to_string(),
                format_ids: Vec::new(),
            })
            .await
            .expect("seed package");

        let validation = fixture.validator().validate(&MediaBuyId("mb_nofmt".to_string())).await;
        assert!(validation.all_passed, "failures: {:?}", validation.failed_checks());
    }

    #[tokio::test]
    async fn budget_exactly_at_the_ceiling_passes() {
        let fixture = Fixture::new();
        fixture
            .seed_valid_order("mb_edge", Decimal::new(100_000, 0), AccessLevel::Standard)
            .await;

        let validation = fixture.validator().validate(&MediaBuyId("mb_edge".to_string())).await;
        assert!(validation.all_passed, "failures: {:?}", validation.failed_checks());
    }

    #[tokio::test]
    async fn one_cent_over_the_ceiling_fails_budget_limits() {
        let fixture = Fixture::new();
        // 100,000.01 for a standard principal with a 100,000 ceiling.
        fixture
            .seed_valid_order("mb_cent", Decimal::new(10_000_001, 2), AccessLevel::Standard)
            .await;

        let validation = fixture.validator().validate(&MediaBuyId("mb_cent".to_string())).await;
        assert_eq!(validation.failed_checks(), vec!["budget_limits"]);
    }

    #[tokio::test]
    async fn zero_budget_is_allowed_but_negative_is_not() {
        let fixture = Fixture::new();
        fixture.seed_valid_order("mb_zero", Decimal::ZERO, AccessLevel::Standard).await;

        let validation = fixture.validator().validate(&MediaBuyId("mb_zero".to_string())).await;
        assert!(validation.all_passed, "failures: {:?}", validation.failed_checks());

        fixture
            .seed_valid_order("mb_neg", Decimal::new(-1, 0), AccessLevel::Standard)
            .await;
        let validation = fixture.validator().validate(&MediaBuyId("mb_neg".to_string())).await;
        assert_eq!(validation.failed_checks(), vec!["budget_limits"]);
    }

    #[tokio::test]
    async fn unknown_format_is_reported_by_name() {
        let fixture = Fixture::new();
        fixture.seed_valid_order("mb_fmt", Decimal::new(5_000, 0), AccessLevel::Standard).await;
        fixture
            .packages
            .save(Package {
                id: "pkg-weird".to_string(),
                media_buy_id: MediaBuyId("mb_fmt".to_string()),
                product_id: ProductId("yahoo_sports_ros".to_string()),
                budget: Decimal::new(1_000, 0),
                pricing_model: "cpm".to_string(),
                pacing: "even".to_string(),
                format_ids: vec!["display_999x999".to_string()],
            })
            .await
            .expect("seed package");

        let validation = fixture.validator().validate(&MediaBuyId("mb_fmt".to_string())).await;

        assert_eq!(validation.failed_checks(), vec!["formats_exist"]);
        let format_check =
            validation.checks.iter().find(|c| c.check_name == "formats_exist").expect("check");
        assert!(format_check.message.contains("display_999x999"));
    }

    #[tokio::test]
    async fn past_flight_start_is_a_hard_failure() {
        let fixture = Fixture::new();
        fixture.seed_valid_order("mb_past", Decimal::new(5_000, 0), AccessLevel::Standard).await;

        let now = Utc::now();
        let buy = fixture
            .media_buys
            .find_by_media_buy_id(&MediaBuyId("mb_past".to_string()))
            .await
            .expect("find")
            .expect("exists");
        let mut stale = buy;
        stale.flight_start_date = (now - chrono::Duration::days(10)).date_naive();
        fixture.media_buys.save(stale).await.expect("resave");

        let validation = fixture.validator().validate(&MediaBuyId("mb_past".to_string())).await;
        assert_eq!(validation.failed_checks(), vec!["flight_dates"]);
    }

    #[tokio::test]
    async fn tenant_mismatch_fails_principal_authorization() {
        let fixture = Fixture::new();
        fixture.seed_valid_order("mb_tenant", Decimal::new(5_000, 0), AccessLevel::Standard).await;
        fixture
            .principals
            .save(Principal {
                id: PrincipalId("nike".to_string()),
                tenant_id: "aol".to_string(),
                name: "Nike".to_string(),
                access_level: AccessLevel::Standard,
                active: true,
            })
            .await
            .expect("reseed principal");

        let validation =
            fixture.validator().validate(&MediaBuyId("mb_tenant".to_string())).await;
        assert!(validation.failed_checks().contains(&"principal_authorized"));
    }

    #[tokio::test]
    async fn load_order_details_joins_products_and_impressions() {
        let fixture = Fixture::new();
        fixture.seed_valid_order("mb_detail", Decimal::new(8_500, 0), AccessLevel::Standard).await;

        let details = fixture
            .validator()
            .load_order_details(&MediaBuyId("mb_detail".to_string()))
            .await
            .expect("details");

        assert_eq!(details.packages.len(), 1);
        assert_eq!(details.packages[0].product_name, "Yahoo Sports Run of Site");
        // 8500 / (8.50 / 1000) = 1,000,000 impressions
        assert_eq!(details.packages[0].estimated_impressions, 1_000_000);
        assert!(details.principal.is_some());
    }
}
