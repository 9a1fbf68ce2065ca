//! Debt accounts: balances, interest accrual, and overdue escalation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::calendar::shift_month;
use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebtId(pub Uuid);

impl DebtId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DebtId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DebtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebtClass {
    StructuredLoan,
    InformalDebt,
    TradeCredit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Normal,
    High,
}

/// Opaque consequence tags the host maps to gameplay effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsequencePolicy {
    pub on_first_miss: String,
    pub on_repeated_miss: String,
    pub on_default: String,
}

/// Overdue severity, keyed by days past due. Ordered mild to severe so tier
/// progression can compare ranks directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverdueTier {
    Warning,
    FirstMiss,
    RepeatedMiss,
}

impl OverdueTier {
    /// Tier boundaries: day 1 warning, day 7 first miss, day 30 repeated miss.
    pub fn for_days_past_due(days: i64) -> Option<OverdueTier> {
        if days >= 30 {
            Some(OverdueTier::RepeatedMiss)
        } else if days >= 7 {
            Some(OverdueTier::FirstMiss)
        } else if days >= 1 {
            Some(OverdueTier::Warning)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OverdueTier::Warning => "warning",
            OverdueTier::FirstMiss => "first-miss",
            OverdueTier::RepeatedMiss => "repeated-miss",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub date: NaiveDate,
    pub amount: Money,
}

/// A single debt account. Balance only falls through [`Debt::apply_payment`]
/// and only rises through [`Debt::accrue`]; it never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    pub creditor: String,
    pub class: DebtClass,
    pub original_amount: Money,
    pub current_balance: Money,
    /// Interest rate per payment period (monthly for structured loans).
    pub interest_rate_per_period: f64,
    pub minimum_payment: Money,
    pub next_due_date: NaiveDate,
    #[serde(default)]
    pub payment_history: Vec<PaymentRecord>,
    #[serde(default)]
    pub consequence_policy: ConsequencePolicy,
    pub risk_tier: RiskTier,
    pub is_active: bool,
    /// Highest tier already announced for the current delinquency episode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_overdue_tier: Option<OverdueTier>,
}

impl Debt {
    pub fn new(
        creditor: impl Into<String>,
        class: DebtClass,
        amount: Money,
        interest_rate_per_period: f64,
        minimum_payment: Money,
        first_due: NaiveDate,
    ) -> Self {
        Self {
            id: DebtId::new(),
            creditor: creditor.into(),
            class,
            original_amount: amount,
            current_balance: amount,
            interest_rate_per_period,
            minimum_payment,
            next_due_date: first_due,
            payment_history: Vec::new(),
            consequence_policy: ConsequencePolicy::default(),
            risk_tier: RiskTier::Normal,
            is_active: true,
            last_overdue_tier: None,
        }
    }

    pub fn with_risk_tier(mut self, tier: RiskTier) -> Self {
        self.risk_tier = tier;
        self
    }

    pub fn with_consequences(mut self, policy: ConsequencePolicy) -> Self {
        self.consequence_policy = policy;
        self
    }

    pub fn days_past_due(&self, today: NaiveDate) -> i64 {
        (today - self.next_due_date).num_days()
    }

    /// Per-tick accrued interest, rounded to cents at the point of posting.
    /// Intermediate math carries f64 precision.
    pub fn accrued_interest(&self, periods_per_cycle: u32) -> Money {
        if !self.is_active || self.interest_rate_per_period <= 0.0 {
            return Money::ZERO;
        }
        let rate = self.interest_rate_per_period / periods_per_cycle.max(1) as f64;
        self.current_balance.scaled(rate)
    }

    /// Adds accrued interest to the balance. Never flips `is_active`.
    pub fn accrue(&mut self, interest: Money) {
        if interest.is_positive() {
            self.current_balance += interest;
        }
    }

    /// Applies a payment: balance floors at zero, history grows, and the due
    /// date advances one period only when the payment meets the minimum.
    /// Returns true when the debt just reached zero and became inactive.
    pub fn apply_payment(&mut self, amount: Money, date: NaiveDate) -> bool {
        self.current_balance = self.current_balance.saturating_sub(amount);
        self.payment_history.push(PaymentRecord { date, amount });
        if amount >= self.minimum_payment {
            self.next_due_date = shift_month(self.next_due_date, 1);
            if self.next_due_date > date {
                self.last_overdue_tier = None;
            }
        }
        if self.current_balance == Money::ZERO && self.is_active {
            self.is_active = false;
            true
        } else {
            false
        }
    }

    /// The consequence tag attached to a tier crossing, if the policy names one.
    pub fn consequence_for(&self, tier: OverdueTier) -> Option<String> {
        let tag = match tier {
            OverdueTier::Warning => return None,
            OverdueTier::FirstMiss => &self.consequence_policy.on_first_miss,
            OverdueTier::RepeatedMiss => &self.consequence_policy.on_repeated_miss,
        };
        if tag.is_empty() {
            None
        } else {
            Some(tag.clone())
        }
    }
}

/// Insertion-ordered collection of debts; iteration order is stable so reports
/// stay reproducible. Debts are never hard-deleted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebtRegistry {
    debts: Vec<Debt>,
}

impl DebtRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, debt: Debt) -> DebtId {
        let id = debt.id;
        self.debts.push(debt);
        id
    }

    pub fn get(&self, id: DebtId) -> Option<&Debt> {
        self.debts.iter().find(|debt| debt.id == id)
    }

    pub fn get_mut(&mut self, id: DebtId) -> Option<&mut Debt> {
        self.debts.iter_mut().find(|debt| debt.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Debt> {
        self.debts.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Debt> {
        self.debts.iter_mut()
    }

    pub fn active(&self) -> impl Iterator<Item = &Debt> {
        self.debts.iter().filter(|debt| debt.is_active)
    }

    pub fn len(&self) -> usize {
        self.debts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.debts.is_empty()
    }

    /// Day-end scan: returns each active debt that crossed into a new overdue
    /// tier today. A tier fires once per delinquency episode; a qualifying
    /// payment that pushes the due date into the future resets the episode.
    pub fn scan_overdue(&mut self, today: NaiveDate) -> Vec<(DebtId, OverdueTier)> {
        let mut crossings = Vec::new();
        for debt in self.debts.iter_mut().filter(|d| d.is_active) {
            let tier = match OverdueTier::for_days_past_due(debt.days_past_due(today)) {
                Some(tier) => tier,
                None => continue,
            };
            if debt.last_overdue_tier.map_or(true, |seen| tier > seen) {
                debt.last_overdue_tier = Some(tier);
                tracing::warn!(debt = %debt.id, creditor = %debt.creditor, tier = tier.label(), "debt overdue");
                crossings.push((debt.id, tier));
            }
        }
        crossings
    }
}
