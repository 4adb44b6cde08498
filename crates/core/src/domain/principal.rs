use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Standard,
    Preferred,
    Enterprise,
}

impl AccessLevel {
    /// Fixed three-tier budget ceiling. Unknown levels fall back to standard.
    pub fn budget_ceiling(&self) -> Decimal {
        match self {
            Self::Enterprise => Decimal::new(1_000_000, 0),
            Self::Preferred => Decimal::new(500_000, 0),
            Self::Standard => Decimal::new(100_000, 0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Preferred => "preferred",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "enterprise" => Self::Enterprise,
            "preferred" => Self::Preferred,
            _ => Self::Standard,
        }
    }
}

/// The advertiser identity that owns a media buy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub tenant_id: String,
    pub name: String,
    pub access_level: AccessLevel,
    pub active: bool,
}
