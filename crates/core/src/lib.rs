pub mod cem;
pub mod config;
pub mod domain;
pub mod errors;
pub mod validation;

pub use cem::{CemAction, CemConfidence, CemRecommendation, CemRiskLevel, CemSummary};
pub use domain::audit::{AuditEntry, AuditOperation, AuditStatus};
pub use domain::order::{MediaBuy, MediaBuyId, OrderStatus};
pub use domain::package::Package;
pub use domain::principal::{AccessLevel, Principal, PrincipalId};
pub use domain::product::{Product, ProductId};
pub use errors::DomainError;
pub use validation::{OrderValidation, ValidationResult, KNOWN_FORMAT_IDS, VALIDATION_CHECKS};
