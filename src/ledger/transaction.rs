//! The append-only transaction log, source of truth for all reporting.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{FinanceError, FinanceResult};
use crate::ledger::calendar::DateWindow;
use crate::ledger::debt::DebtId;
use crate::ledger::expense::ExpenseId;
use crate::money::{FundSource, Money, MoneyPool, PaymentMethod};

/// Metadata key marking a posting that never moved pool money (interest
/// accrual). Replay skips these.
pub const META_NON_CASH: &str = "non_cash";
/// Metadata keys recording how a split payment was funded, in cents.
pub const META_LEG_BANK: &str = "leg.bank";
pub const META_LEG_CASH: &str = "leg.cash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransactionKind {
    Sale,
    Expense,
    Payment,
    Refund,
    Transfer,
}

impl TransactionKind {
    pub fn label(self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Expense => "expense",
            TransactionKind::Payment => "payment",
            TransactionKind::Refund => "refund",
            TransactionKind::Transfer => "transfer",
        }
    }
}

/// Optional link from a transaction back to the registry entry it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerRef {
    Debt(DebtId),
    Expense(ExpenseId),
}

/// Immutable monetary event. Created once through [`TransactionLog::record`],
/// never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Monotonically increasing position in the log.
    pub seq: u64,
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: String,
    pub category: String,
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<LedgerRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Transaction {
    pub fn is_non_cash(&self) -> bool {
        self.metadata.get(META_NON_CASH).map(String::as_str) == Some("true")
    }

    /// Funding legs for replay: explicit split metadata when present,
    /// otherwise the single balance implied by the payment method.
    fn outgoing_legs(&self) -> Vec<(FundSource, Money)> {
        let bank = self
            .metadata
            .get(META_LEG_BANK)
            .and_then(|v| v.parse::<i64>().ok());
        let cash = self
            .metadata
            .get(META_LEG_CASH)
            .and_then(|v| v.parse::<i64>().ok());
        if bank.is_some() || cash.is_some() {
            let mut legs = Vec::new();
            if let Some(cents) = bank {
                legs.push((FundSource::Bank, Money::from_cents(cents)));
            }
            if let Some(cents) = cash {
                legs.push((FundSource::Cash, Money::from_cents(cents)));
            }
            legs
        } else {
            vec![(self.method.settles_to(), self.amount)]
        }
    }
}

/// Filter for log queries. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub window: Option<DateWindow>,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub method: Option<PaymentMethod>,
}

impl TransactionFilter {
    pub fn in_window(window: DateWindow) -> Self {
        Self {
            window: Some(window),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        if let Some(window) = &self.window {
            if !window.contains(txn.timestamp.date_naive()) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if txn.kind != kind {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &txn.category != category {
                return false;
            }
        }
        if let Some(method) = self.method {
            if txn.method != method {
                return false;
            }
        }
        true
    }
}

/// Append-only sequence of recorded monetary events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
    next_seq: u64,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The only way transactions enter the system. Validates the amount,
    /// assigns seq, id, and timestamp, appends, and returns the record.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        kind: TransactionKind,
        amount: Money,
        description: impl Into<String>,
        category: impl Into<String>,
        method: PaymentMethod,
        reference: Option<LedgerRef>,
        metadata: BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
    ) -> FinanceResult<Transaction> {
        if !amount.is_positive() {
            return Err(FinanceError::InvalidAmount);
        }
        let txn = Transaction {
            seq: self.next_seq,
            id: Uuid::new_v4(),
            timestamp,
            kind,
            amount,
            description: description.into(),
            category: category.into(),
            method,
            reference,
            metadata,
        };
        tracing::debug!(seq = txn.seq, kind = kind.label(), amount = %amount, "recorded transaction");
        self.next_seq += 1;
        self.entries.push(txn.clone());
        Ok(txn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter()
    }

    /// Lazy, restartable, filtered view over the log.
    pub fn query<'a>(
        &'a self,
        filter: &'a TransactionFilter,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.entries.iter().filter(move |txn| filter.matches(txn))
    }

    /// Replays every cash-moving entry, accumulating signed deltas per
    /// balance. Starting from an empty pool the result equals the live pool
    /// whenever pool and log were mutated only through the engine; tests lean
    /// on this agreement. Intermediate deltas may dip negative when opening
    /// balances funded a movement, so accumulation is signed.
    pub fn replay_pool(&self) -> MoneyPool {
        let mut cash = Money::ZERO;
        let mut bank = Money::ZERO;
        let mut apply = |source: FundSource, delta: Money| match source {
            FundSource::Cash => cash += delta,
            FundSource::Bank => bank += delta,
        };
        for txn in &self.entries {
            if txn.is_non_cash() {
                continue;
            }
            match txn.kind {
                TransactionKind::Sale => apply(txn.method.settles_to(), txn.amount),
                TransactionKind::Expense | TransactionKind::Payment | TransactionKind::Refund => {
                    for (source, amount) in txn.outgoing_legs() {
                        apply(source, Money::ZERO - amount);
                    }
                }
                TransactionKind::Transfer => {
                    let from = match txn.metadata.get("transfer_from").map(String::as_str) {
                        Some("cash") => FundSource::Cash,
                        _ => FundSource::Bank,
                    };
                    let to = match from {
                        FundSource::Cash => FundSource::Bank,
                        FundSource::Bank => FundSource::Cash,
                    };
                    apply(from, Money::ZERO - txn.amount);
                    apply(to, txn.amount);
                }
            }
        }
        MoneyPool::new(cash, bank)
    }
}
