//! Cash register sessions: bounded open/close periods reconciling cash sales
//! against a starting float.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// One open/close bracket over the drawer. At most one session is open at a
/// time; the engine enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSession {
    pub opened_at: DateTime<Utc>,
    pub starting_cash: Money,
    pub sales_total: Money,
    pub transaction_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_cash: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<Money>,
}

impl RegisterSession {
    pub fn open(starting_cash: Money, opened_at: DateTime<Utc>) -> Self {
        Self {
            opened_at,
            starting_cash,
            sales_total: Money::ZERO,
            transaction_count: 0,
            closed_at: None,
            ending_cash: None,
            variance: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    /// Tracks a cash sale. The pool's cash balance moves by the same amount in
    /// the same call, so the two can diverge only through external tampering,
    /// which close() surfaces as variance.
    pub fn record_cash_sale(&mut self, amount: Money) {
        self.sales_total += amount;
        self.transaction_count += 1;
    }

    /// Expected drawer contents if every cash movement went through the session.
    pub fn expected_cash(&self) -> Money {
        self.starting_cash + self.sales_total
    }

    /// Finalizes the session against the actual drawer count.
    pub fn close(mut self, ending_cash: Money, closed_at: DateTime<Utc>) -> Self {
        self.variance = Some(ending_cash - self.expected_cash());
        self.ending_cash = Some(ending_cash);
        self.closed_at = Some(closed_at);
        self
    }
}
