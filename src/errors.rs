use thiserror::Error;

use crate::ledger::debt::DebtId;
use crate::ledger::expense::ExpenseId;
use crate::money::{FundSource, Money};

pub type FinanceResult<T> = Result<T, FinanceError>;

/// Error type covering every failure the engine can report.
///
/// Every variant is detected before any state is mutated, so a returned error
/// guarantees the pool, the log, and the registries are unchanged.
#[derive(Debug, Error)]
pub enum FinanceError {
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("insufficient {fund} funds: requested {requested}, available {available}")]
    InsufficientFunds {
        fund: FundSource,
        requested: Money,
        available: Money,
    },
    #[error("debt {0} not found")]
    DebtNotFound(DebtId),
    #[error("expense {0} not found")]
    ExpenseNotFound(ExpenseId),
    #[error("cash register session already open")]
    RegisterAlreadyOpen,
    #[error("no cash register session open")]
    RegisterNotOpen,
    #[error("unknown payment method `{0}`")]
    UnknownPaymentMethod(String),
    #[error("payment failed: {0}")]
    PaymentFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
