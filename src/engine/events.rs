//! Outbound domain events.
//!
//! The engine queues events instead of publishing through a global bus; the
//! host drains them after each call, which keeps fan-out explicit and tests
//! deterministic.

use uuid::Uuid;

use crate::ledger::debt::{DebtId, OverdueTier};
use crate::ledger::expense::ExpenseId;
use crate::ledger::register::RegisterSession;
use crate::ledger::transaction::TransactionKind;
use crate::money::Money;
use crate::report::{ReportId, ReportKind};

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    TransactionRecorded {
        seq: u64,
        id: Uuid,
        kind: TransactionKind,
        amount: Money,
    },
    DebtOverdue {
        debt_id: DebtId,
        tier: OverdueTier,
        /// Consequence tag from the debt's policy, absent for plain warnings.
        consequence: Option<String>,
    },
    DebtPaidOff {
        debt_id: DebtId,
    },
    ExpenseOverdue {
        expense_id: ExpenseId,
        tier: OverdueTier,
    },
    RegisterOpened {
        starting_cash: Money,
    },
    RegisterClosed {
        session: RegisterSession,
    },
    ReportGenerated {
        report_id: ReportId,
        kind: ReportKind,
    },
}
