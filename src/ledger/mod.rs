//! Ledger domain models: transactions, debts, expenses, schedules, sessions.

pub mod calendar;
pub mod debt;
pub mod expense;
pub mod register;
pub mod schedule;
pub mod transaction;

pub use calendar::DateWindow;
pub use debt::{
    ConsequencePolicy, Debt, DebtClass, DebtId, DebtRegistry, OverdueTier, PaymentRecord, RiskTier,
};
pub use expense::{Expense, ExpenseClass, ExpenseId, ExpenseRegistry, Frequency};
pub use register::RegisterSession;
pub use schedule::{PaymentPriority, ScheduleKind, ScheduledPayment};
pub use transaction::{
    LedgerRef, Transaction, TransactionFilter, TransactionKind, TransactionLog,
};
