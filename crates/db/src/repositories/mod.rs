use async_trait::async_trait;
use thiserror::Error;

use buyline_core::domain::audit::{AuditEntry, AuditOperation};
use buyline_core::domain::order::{MediaBuy, MediaBuyId, OrderStatus};
use buyline_core::domain::package::Package;
use buyline_core::domain::principal::{Principal, PrincipalId};
use buyline_core::domain::product::{Product, ProductId};

pub mod audit_log;
pub mod media_buy;
pub mod memory;
pub mod package;
pub mod principal;
pub mod product;

pub use audit_log::SqlAuditLogRepository;
pub use media_buy::SqlMediaBuyRepository;
pub use memory::{
    FailingAuditLogRepository, InMemoryAuditLogRepository, InMemoryMediaBuyRepository,
    InMemoryPackageRepository, InMemoryPrincipalRepository, InMemoryProductRepository,
};
pub use package::SqlPackageRepository;
pub use principal::SqlPrincipalRepository;
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait MediaBuyRepository: Send + Sync {
    async fn find_by_media_buy_id(
        &self,
        id: &MediaBuyId,
    ) -> Result<Option<MediaBuy>, RepositoryError>;

    async fn save(&self, media_buy: MediaBuy) -> Result<(), RepositoryError>;

    async fn update_status(
        &self,
        id: &MediaBuyId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError>;

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<MediaBuy>, RepositoryError>;
}

#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn list_for_media_buy(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> Result<Vec<Package>, RepositoryError>;

    async fn save(&self, package: Package) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<Principal>, RepositoryError>;
    async fn save(&self, principal: Principal) -> Result<(), RepositoryError>;
}

/// Append-only log. There is deliberately no update or delete surface.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<String, RepositoryError>;

    async fn list_for_media_buy(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> Result<Vec<AuditEntry>, RepositoryError>;

    async fn count_by_operation(
        &self,
        media_buy_id: &MediaBuyId,
        operation: AuditOperation,
    ) -> Result<i64, RepositoryError>;
}
