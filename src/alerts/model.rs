use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Price alert trigger condition: at-or-above / at-or-below target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Gte,
    Lte,
}

impl AlertCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gte => "gte",
            Self::Lte => "lte",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gte" | ">=" => Some(Self::Gte),
            "lte" | "<=" => Some(Self::Lte),
            _ => None,
        }
    }

    /// True when `price` satisfies the condition against `target`.
    pub fn is_met(&self, price: f64, target: f64) -> bool {
        match self {
            Self::Gte => price >= target,
            Self::Lte => price <= target,
        }
    }
}

/// Active price alert as stored by the alert repository.
#[derive(Clone, Debug)]
pub struct UserAlert {
    pub id: Uuid,
    /// Bare asset symbol as the user entered it, e.g. `BTC`.
    pub asset: String,
    pub target_price: f64,
    pub condition: AlertCondition,
    pub is_active: bool,
}

impl UserAlert {
    /// Exchange-qualified market code for this alert's asset.
    ///
    /// Users enter bare symbols; the ticker stream is keyed by KRW pairs.
    pub fn market_code(&self) -> String {
        if self.asset.contains('-') {
            self.asset.clone()
        } else {
            format!("KRW-{}", self.asset.to_uppercase())
        }
    }
}
