//! Forward projection of debt and expense obligations.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ledger::calendar::shift_month;
use crate::ledger::debt::{DebtRegistry, RiskTier};
use crate::ledger::expense::{ExpenseClass, ExpenseRegistry};
use crate::ledger::transaction::LedgerRef;
use crate::money::Money;

const MAX_PROJECTED_OCCURRENCES: usize = 512;

/// Tie-break rank for same-day obligations, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaymentPriority {
    /// High-risk debt.
    Urgent,
    /// Essential expense.
    High,
    /// Debt at normal risk.
    Normal,
    /// Non-essential expense.
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleKind {
    Debt,
    Expense,
}

/// A projected future obligation. Derived view only; rebuilt on demand and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledPayment {
    pub date: NaiveDate,
    pub kind: ScheduleKind,
    pub reference: LedgerRef,
    pub amount: Money,
    pub priority: PaymentPriority,
}

/// Enumerates every due date for every active debt and expense within
/// `[today, today + horizon_days]`, sorted by date then priority.
///
/// Obligations already past due surface at `today`. Pure function: calling it
/// twice with no intervening mutation yields identical output.
pub fn project(
    debts: &DebtRegistry,
    expenses: &ExpenseRegistry,
    today: NaiveDate,
    horizon_days: u32,
) -> Vec<ScheduledPayment> {
    let end = today + Duration::days(horizon_days as i64);
    let mut entries = Vec::new();

    for debt in debts.active() {
        let priority = match debt.risk_tier {
            RiskTier::High => PaymentPriority::Urgent,
            RiskTier::Normal => PaymentPriority::Normal,
        };
        let mut due = debt.next_due_date;
        let mut guard = 0usize;
        while due <= end && guard < MAX_PROJECTED_OCCURRENCES {
            entries.push(ScheduledPayment {
                date: due.max(today),
                kind: ScheduleKind::Debt,
                reference: LedgerRef::Debt(debt.id),
                amount: debt.minimum_payment,
                priority,
            });
            due = shift_month(due, 1);
            guard += 1;
        }
    }

    for expense in expenses.iter() {
        if matches!(expense.class, ExpenseClass::PercentOfSales { .. }) {
            continue;
        }
        let priority = if expense.is_essential {
            PaymentPriority::High
        } else {
            PaymentPriority::Low
        };
        let mut due = expense.next_due;
        let mut guard = 0usize;
        while due <= end && guard < MAX_PROJECTED_OCCURRENCES {
            entries.push(ScheduledPayment {
                date: due.max(today),
                kind: ScheduleKind::Expense,
                reference: LedgerRef::Expense(expense.id),
                amount: expense.amount,
                priority,
            });
            due = expense.frequency.advance(due);
            guard += 1;
        }
    }

    entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.priority.cmp(&b.priority)));
    entries
}
