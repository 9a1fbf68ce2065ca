//! Recurring and variable expense definitions.

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::calendar::{days_in_month, shift_month};
use crate::ledger::debt::OverdueTier;
use crate::money::Money;

use super::debt::PaymentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(pub Uuid);

impl ExpenseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExpenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExpenseClass {
    Fixed,
    Variable,
    /// Assessed eagerly at sale time as `rate` of the sale total; never
    /// scheduled and never enumerated by the payment scheduler.
    PercentOfSales { rate: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Monthly { due_day: u32 },
}

impl Frequency {
    /// Next due date after `from`, clamping monthly due days to the length of
    /// the target month.
    pub fn advance(&self, from: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => from + Duration::days(1),
            Frequency::Monthly { due_day } => {
                use chrono::Datelike;
                let shifted = shift_month(from, 1);
                let day = (*due_day).min(days_in_month(shifted.year(), shifted.month()));
                shifted.with_day(day.max(1)).unwrap_or(shifted)
            }
        }
    }
}

/// A recurring or variable cost definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub name: String,
    pub class: ExpenseClass,
    pub amount: Money,
    pub frequency: Frequency,
    pub category: String,
    pub is_essential: bool,
    pub next_due: NaiveDate,
    #[serde(default)]
    pub payment_history: Vec<PaymentRecord>,
    /// Mirrors debt escalation for expenses that stayed unpaid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_overdue_tier: Option<OverdueTier>,
}

impl Expense {
    pub fn new(
        name: impl Into<String>,
        class: ExpenseClass,
        amount: Money,
        frequency: Frequency,
        category: impl Into<String>,
        first_due: NaiveDate,
    ) -> Self {
        Self {
            id: ExpenseId::new(),
            name: name.into(),
            class,
            amount,
            frequency,
            category: category.into(),
            is_essential: false,
            next_due: first_due,
            payment_history: Vec::new(),
            last_overdue_tier: None,
        }
    }

    pub fn essential(mut self) -> Self {
        self.is_essential = true;
        self
    }

    /// Whether this expense should be settled on or before `date`.
    /// Percentage-of-sales expenses are assessed at sale time, never here.
    pub fn is_due(&self, date: NaiveDate) -> bool {
        !matches!(self.class, ExpenseClass::PercentOfSales { .. }) && self.next_due <= date
    }

    /// Marks a successful payment: history grows and the schedule advances.
    pub fn mark_paid(&mut self, amount: Money, date: NaiveDate) {
        self.payment_history.push(PaymentRecord { date, amount });
        self.next_due = self.frequency.advance(self.next_due);
        if self.next_due > date {
            self.last_overdue_tier = None;
        }
    }
}

/// Insertion-ordered expense collection with id lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseRegistry {
    expenses: Vec<Expense>,
}

impl ExpenseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, expense: Expense) -> ExpenseId {
        let id = expense.id;
        self.expenses.push(expense);
        id
    }

    pub fn get(&self, id: ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|expense| expense.id == id)
    }

    pub fn get_mut(&mut self, id: ExpenseId) -> Option<&mut Expense> {
        self.expenses.iter_mut().find(|expense| expense.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expense> {
        self.expenses.iter()
    }

    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }

    /// Ids of expenses due on or before `date`, in registry order. Collected
    /// up front so the caller can settle them one at a time.
    pub fn due_ids(&self, date: NaiveDate) -> Vec<ExpenseId> {
        self.expenses
            .iter()
            .filter(|expense| expense.is_due(date))
            .map(|expense| expense.id)
            .collect()
    }

    /// Same tier ladder as debts, applied to expenses left unpaid.
    pub fn scan_overdue(&mut self, today: NaiveDate) -> Vec<(ExpenseId, OverdueTier)> {
        let mut crossings = Vec::new();
        for expense in self
            .expenses
            .iter_mut()
            .filter(|e| !matches!(e.class, ExpenseClass::PercentOfSales { .. }))
        {
            let days = (today - expense.next_due).num_days();
            let tier = match OverdueTier::for_days_past_due(days) {
                Some(tier) => tier,
                None => continue,
            };
            if expense.last_overdue_tier.map_or(true, |seen| tier > seen) {
                expense.last_overdue_tier = Some(tier);
                tracing::warn!(expense = %expense.id, name = %expense.name, tier = tier.label(), "expense overdue");
                crossings.push((expense.id, tier));
            }
        }
        crossings
    }
}
