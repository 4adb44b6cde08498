use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::MediaBuyId;
use crate::domain::product::ProductId;

/// A budget-and-format allocation within an order, tied to one product.
///
/// Package budgets are not reconciled against the order total; the sum may
/// legitimately differ while a buy is being reshaped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub media_buy_id: MediaBuyId,
    pub product_id: ProductId,
    pub budget: Decimal,
    pub pricing_model: String,
    pub pacing: String,
    pub format_ids: Vec<String>,
}

impl Package {
    /// Estimated impressions at the product's CPM; zero when no CPM is known.
    pub fn estimated_impressions(&self, cpm: Decimal) -> i64 {
        if cpm <= Decimal::ZERO {
            return 0;
        }
        let per_impression = cpm / Decimal::new(1000, 0);
        (self.budget / per_impression).trunc().try_into().unwrap_or(0)
    }
}
