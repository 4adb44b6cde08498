use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::principal::PrincipalId;
use crate::errors::DomainError;

/// External-facing order identifier (e.g. `nike_air_max_spring_q1`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaBuyId(pub String);

impl std::fmt::Display for MediaBuyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    PendingCemApproval,
    Active,
    Rejected,
    PendingChanges,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingCemApproval => "pending_cem_approval",
            Self::Active => "active",
            Self::Rejected => "rejected",
            Self::PendingChanges => "pending_changes",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending_cem_approval" => Self::PendingCemApproval,
            "active" => Self::Active,
            "rejected" => Self::Rejected,
            "pending_changes" => Self::PendingChanges,
            _ => Self::Pending,
        }
    }

    /// A settled order no longer accepts CEM decisions.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Active | Self::Rejected)
    }
}

/// A purchased advertising campaign spanning one or more packages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaBuy {
    pub id: String,
    pub media_buy_id: MediaBuyId,
    pub campaign_name: String,
    pub principal_id: PrincipalId,
    pub tenant_id: String,
    pub total_budget: Decimal,
    pub currency: String,
    pub flight_start_date: NaiveDate,
    pub flight_end_date: NaiveDate,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaBuy {
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::{Active, Pending, PendingCemApproval, PendingChanges, Rejected};
        matches!(
            (self.status, next),
            (Pending, PendingCemApproval)
                | (PendingCemApproval, Active)
                | (PendingCemApproval, Rejected)
                | (PendingCemApproval, PendingChanges)
                | (PendingChanges, PendingCemApproval)
        )
    }

    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidOrderTransition { from: self.status, to: next })
    }

    pub fn check_invariants(&self) -> Result<(), DomainError> {
        if self.total_budget < Decimal::ZERO {
            return Err(DomainError::InvariantViolation(format!(
                "total_budget {} must be non-negative",
                self.total_budget
            )));
        }
        if self.flight_start_date >= self.flight_end_date {
            return Err(DomainError::InvariantViolation(format!(
                "flight_start_date {} must precede flight_end_date {}",
                self.flight_start_date, self.flight_end_date
            )));
        }
        Ok(())
    }
}
