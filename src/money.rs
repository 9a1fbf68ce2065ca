//! Fixed-point money, the two-balance pool, and payment routing.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{FinanceError, FinanceResult};

/// Monetary amount in integer minor units (cents).
///
/// All ledger math happens in cents; fractional intermediates (interest,
/// percentage fees) are rounded to cents exactly once, at the point the
/// resulting transaction is recorded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Money(dollars * 100)
    }

    /// Rounds half away from zero to the nearest cent.
    pub fn from_f64_dollars(dollars: f64) -> Self {
        Money((dollars * 100.0).round() as i64)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_f64_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiplies by a rate, rounding the result to the nearest cent.
    pub fn scaled(self, rate: f64) -> Money {
        Money((self.0 as f64 * rate).round() as i64)
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }

    /// Subtraction floored at zero, used when paying down balances.
    pub fn saturating_sub(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// How a customer or vendor settles a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    CreditCard,
    DebitCard,
    Check,
}

impl PaymentMethod {
    /// Card-network methods carry the processing fee.
    pub fn is_card(self) -> bool {
        matches!(self, PaymentMethod::CreditCard | PaymentMethod::DebitCard)
    }

    /// Which pool balance this method settles into or out of.
    pub fn settles_to(self) -> FundSource {
        match self {
            PaymentMethod::Cash => FundSource::Cash,
            _ => FundSource::Bank,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank-transfer",
            PaymentMethod::CreditCard => "credit-card",
            PaymentMethod::DebitCard => "debit-card",
            PaymentMethod::Check => "check",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = FinanceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "bank-transfer" | "bank_transfer" | "bank" => Ok(PaymentMethod::BankTransfer),
            "credit-card" | "credit_card" | "credit" => Ok(PaymentMethod::CreditCard),
            "debit-card" | "debit_card" | "debit" => Ok(PaymentMethod::DebitCard),
            "check" | "cheque" => Ok(PaymentMethod::Check),
            other => Err(FinanceError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

/// One of the two balances owned by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundSource {
    Cash,
    Bank,
}

impl fmt::Display for FundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundSource::Cash => write!(f, "cash"),
            FundSource::Bank => write!(f, "bank"),
        }
    }
}

/// On-hand cash plus bank balance, each invariantly non-negative.
///
/// The pool is mutated only through [`MoneyPool::deposit`] and
/// [`MoneyPool::withdraw`]; both validate before touching a balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyPool {
    cash_on_hand: Money,
    bank_balance: Money,
}

impl MoneyPool {
    pub fn new(cash_on_hand: Money, bank_balance: Money) -> Self {
        Self {
            cash_on_hand,
            bank_balance,
        }
    }

    pub fn empty() -> Self {
        Self::new(Money::ZERO, Money::ZERO)
    }

    pub fn cash_on_hand(&self) -> Money {
        self.cash_on_hand
    }

    pub fn bank_balance(&self) -> Money {
        self.bank_balance
    }

    pub fn total(&self) -> Money {
        self.cash_on_hand + self.bank_balance
    }

    pub fn balance(&self, source: FundSource) -> Money {
        match source {
            FundSource::Cash => self.cash_on_hand,
            FundSource::Bank => self.bank_balance,
        }
    }

    pub fn deposit(&mut self, amount: Money, destination: FundSource) -> FinanceResult<()> {
        if !amount.is_positive() {
            return Err(FinanceError::InvalidAmount);
        }
        match destination {
            FundSource::Cash => self.cash_on_hand += amount,
            FundSource::Bank => self.bank_balance += amount,
        }
        Ok(())
    }

    pub fn withdraw(&mut self, amount: Money, source: FundSource) -> FinanceResult<()> {
        if !amount.is_positive() {
            return Err(FinanceError::InvalidAmount);
        }
        let available = self.balance(source);
        if amount > available {
            return Err(FinanceError::InsufficientFunds {
                fund: source,
                requested: amount,
                available,
            });
        }
        match source {
            FundSource::Cash => self.cash_on_hand -= amount,
            FundSource::Bank => self.bank_balance -= amount,
        }
        Ok(())
    }
}

impl Default for MoneyPool {
    fn default() -> Self {
        Self::empty()
    }
}

/// Named routing policy for outgoing payments.
///
/// Bank-first with cash fallback is a business choice, not a derived
/// necessity, so it lives behind its own type where it can be swapped or
/// tested on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundingPolicy {
    #[default]
    BankFirst,
}

impl FundingPolicy {
    /// Plans which balances cover `amount` without mutating the pool.
    ///
    /// Returns the withdrawal legs to execute, or `InsufficientFunds` when the
    /// combined balances cannot cover the amount.
    pub fn plan(
        &self,
        pool: &MoneyPool,
        amount: Money,
    ) -> FinanceResult<Vec<(FundSource, Money)>> {
        if !amount.is_positive() {
            return Err(FinanceError::InvalidAmount);
        }
        match self {
            FundingPolicy::BankFirst => {
                let from_bank = amount.min(pool.bank_balance());
                let remainder = amount - from_bank;
                if remainder > pool.cash_on_hand() {
                    return Err(FinanceError::InsufficientFunds {
                        fund: FundSource::Cash,
                        requested: remainder,
                        available: pool.cash_on_hand(),
                    });
                }
                let mut legs = Vec::new();
                if from_bank.is_positive() {
                    legs.push((FundSource::Bank, from_bank));
                }
                if remainder.is_positive() {
                    legs.push((FundSource::Cash, remainder));
                }
                Ok(legs)
            }
        }
    }
}
