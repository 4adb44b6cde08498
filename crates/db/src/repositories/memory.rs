use std::collections::HashMap;

use tokio::sync::RwLock;

use buyline_core::domain::audit::{AuditEntry, AuditOperation};
use buyline_core::domain::order::{MediaBuy, MediaBuyId, OrderStatus};
use buyline_core::domain::package::Package;
use buyline_core::domain::principal::{Principal, PrincipalId};
use buyline_core::domain::product::{Product, ProductId};

use super::{
    AuditLogRepository, MediaBuyRepository, PackageRepository, PrincipalRepository,
    ProductRepository, RepositoryError,
};

#[derive(Default)]
pub struct InMemoryMediaBuyRepository {
    media_buys: RwLock<HashMap<String, MediaBuy>>,
}

#[async_trait::async_trait]
impl MediaBuyRepository for InMemoryMediaBuyRepository {
    async fn find_by_media_buy_id(
        &self,
        id: &MediaBuyId,
    ) -> Result<Option<MediaBuy>, RepositoryError> {
        let media_buys = self.media_buys.read().await;
        Ok(media_buys.get(&id.0).cloned())
    }

    async fn save(&self, media_buy: MediaBuy) -> Result<(), RepositoryError> {
        let mut media_buys = self.media_buys.write().await;
        media_buys.insert(media_buy.media_buy_id.0.clone(), media_buy);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &MediaBuyId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut media_buys = self.media_buys.write().await;
        if let Some(buy) = media_buys.get_mut(&id.0) {
            buy.status = status;
            buy.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<MediaBuy>, RepositoryError> {
        let media_buys = self.media_buys.read().await;
        let mut matches: Vec<MediaBuy> =
            media_buys.values().filter(|buy| buy.status == status).cloned().collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }
}

#[derive(Default)]
pub struct InMemoryPackageRepository {
    packages: RwLock<HashMap<String, Package>>,
}

#[async_trait::async_trait]
impl PackageRepository for InMemoryPackageRepository {
    async fn list_for_media_buy(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> Result<Vec<Package>, RepositoryError> {
        let packages = self.packages.read().await;
        let mut matches: Vec<Package> = packages
            .values()
            .filter(|package| package.media_buy_id == *media_buy_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    async fn save(&self, package: Package) -> Result<(), RepositoryError> {
        let mut packages = self.packages.write().await;
        packages.insert(package.id.clone(), package);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).cloned())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.0.clone(), product);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPrincipalRepository {
    principals: RwLock<HashMap<String, Principal>>,
}

#[async_trait::async_trait]
impl PrincipalRepository for InMemoryPrincipalRepository {
    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<Principal>, RepositoryError> {
        let principals = self.principals.read().await;
        Ok(principals.get(&id.0).cloned())
    }

    async fn save(&self, principal: Principal) -> Result<(), RepositoryError> {
        let mut principals = self.principals.write().await;
        principals.insert(principal.id.0.clone(), principal);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAuditLogRepository {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLogRepository {
    pub async fn all(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait::async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: AuditEntry) -> Result<String, RepositoryError> {
        let id = entry.id.clone();
        self.entries.write().await.push(entry);
        Ok(id)
    }

    async fn list_for_media_buy(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| e.media_buy_id == *media_buy_id).cloned().collect())
    }

    async fn count_by_operation(
        &self,
        media_buy_id: &MediaBuyId,
        operation: AuditOperation,
    ) -> Result<i64, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.media_buy_id == *media_buy_id && e.operation == operation)
            .count() as i64)
    }
}

/// Audit sink that refuses every write. Exercises the degraded-log path.
#[derive(Default)]
pub struct FailingAuditLogRepository;

#[async_trait::async_trait]
impl AuditLogRepository for FailingAuditLogRepository {
    async fn append(&self, _entry: AuditEntry) -> Result<String, RepositoryError> {
        Err(RepositoryError::Decode("audit sink unavailable".to_string()))
    }

    async fn list_for_media_buy(
        &self,
        _media_buy_id: &MediaBuyId,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        Err(RepositoryError::Decode("audit sink unavailable".to_string()))
    }

    async fn count_by_operation(
        &self,
        _media_buy_id: &MediaBuyId,
        _operation: AuditOperation,
    ) -> Result<i64, RepositoryError> {
        Err(RepositoryError::Decode("audit sink unavailable".to_string()))
    }
}
