//! Report generation: pure aggregations over the transaction log and the
//! registries. Reports never mutate engine state.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::calendar::DateWindow;
use crate::ledger::debt::DebtRegistry;
use crate::ledger::transaction::{TransactionFilter, TransactionKind, TransactionLog};
use crate::money::Money;

/// Category the engine assigns to interest accrual postings. Profit-and-loss
/// reporting splits these out of operating expenses.
pub const INTEREST_CATEGORY: &str = "interest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

impl ReportId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    Daily,
    Weekly,
    Monthly,
    DebtSummary,
    CashFlow,
    ProfitLoss,
}

impl ReportKind {
    pub fn label(self) -> &'static str {
        match self {
            ReportKind::Daily => "daily",
            ReportKind::Weekly => "weekly",
            ReportKind::Monthly => "monthly",
            ReportKind::DebtSummary => "debt-summary",
            ReportKind::CashFlow => "cash-flow",
            ReportKind::ProfitLoss => "profit-loss",
        }
    }
}

/// Totals every report carries regardless of kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub revenue: Money,
    pub expenses: Money,
    pub debt_payments: Money,
    pub refunds: Money,
    pub net: Money,
    pub transaction_count: usize,
    pub by_method: BTreeMap<String, Money>,
    pub by_category: BTreeMap<String, Money>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSummaryDetail {
    pub total_outstanding: Money,
    pub active_count: usize,
    pub paid_off_count: usize,
    pub overdue_count: usize,
    pub minimum_due_total: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowDetail {
    pub inflow: Money,
    pub outflow: Money,
    pub net: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitLossDetail {
    pub revenue: Money,
    pub operating_expenses: Money,
    pub interest_expense: Money,
    pub net_profit: Money,
}

/// Forward estimates attached to monthly reports only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projections {
    /// Next-period revenue, extrapolated from the trailing average.
    pub next_period_revenue: Money,
    /// Months until all debts clear at the current minimum-payment velocity.
    pub debt_payoff_months: Option<u32>,
    /// Revenue needed to cover period expenses plus minimum debt service.
    pub break_even_revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportDetails {
    None,
    Debt(DebtSummaryDetail),
    CashFlow(CashFlowDetail),
    ProfitLoss(ProfitLossDetail),
    Monthly { projections: Projections },
}

/// Immutable once generated; appended to a bounded history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    pub id: ReportId,
    pub kind: ReportKind,
    pub window: DateWindow,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub details: ReportDetails,
}

/// Most-recent-N retention over generated reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportHistory {
    reports: Vec<FinancialReport>,
    retention: usize,
}

impl ReportHistory {
    pub fn new(retention: usize) -> Self {
        Self {
            reports: Vec::new(),
            retention: retention.max(1),
        }
    }

    pub fn push(&mut self, report: FinancialReport) {
        self.reports.push(report);
        while self.reports.len() > self.retention {
            self.reports.remove(0);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FinancialReport> {
        self.reports.iter()
    }

    pub fn latest(&self) -> Option<&FinancialReport> {
        self.reports.last()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

fn summarize(log: &TransactionLog, window: DateWindow) -> ReportSummary {
    let filter = TransactionFilter::in_window(window);
    let mut summary = ReportSummary::default();
    for txn in log.query(&filter) {
        summary.transaction_count += 1;
        match txn.kind {
            TransactionKind::Sale => summary.revenue += txn.amount,
            TransactionKind::Expense => summary.expenses += txn.amount,
            TransactionKind::Payment => summary.debt_payments += txn.amount,
            TransactionKind::Refund => summary.refunds += txn.amount,
            TransactionKind::Transfer => {}
        }
        *summary
            .by_method
            .entry(txn.method.label().to_string())
            .or_insert(Money::ZERO) += txn.amount;
        *summary
            .by_category
            .entry(txn.category.clone())
            .or_insert(Money::ZERO) += txn.amount;
    }
    summary.net = summary.revenue - summary.expenses - summary.debt_payments - summary.refunds;
    summary
}

fn debt_detail(debts: &DebtRegistry, as_of: NaiveDate) -> DebtSummaryDetail {
    let mut detail = DebtSummaryDetail::default();
    for debt in debts.iter() {
        if debt.is_active {
            detail.active_count += 1;
            detail.total_outstanding += debt.current_balance;
            detail.minimum_due_total += debt.minimum_payment;
            if debt.days_past_due(as_of) >= 1 {
                detail.overdue_count += 1;
            }
        } else {
            detail.paid_off_count += 1;
        }
    }
    detail
}

fn cash_flow_detail(log: &TransactionLog, window: DateWindow) -> CashFlowDetail {
    let filter = TransactionFilter::in_window(window);
    let mut detail = CashFlowDetail::default();
    for txn in log.query(&filter) {
        if txn.is_non_cash() {
            continue;
        }
        match txn.kind {
            TransactionKind::Sale => detail.inflow += txn.amount,
            TransactionKind::Expense | TransactionKind::Payment | TransactionKind::Refund => {
                detail.outflow += txn.amount
            }
            TransactionKind::Transfer => {}
        }
    }
    detail.net = detail.inflow - detail.outflow;
    detail
}

fn profit_loss_detail(summary: &ReportSummary) -> ProfitLossDetail {
    let interest = summary
        .by_category
        .get(INTEREST_CATEGORY)
        .copied()
        .unwrap_or(Money::ZERO);
    let operating = summary.expenses - interest;
    ProfitLossDetail {
        revenue: summary.revenue,
        operating_expenses: operating,
        interest_expense: interest,
        net_profit: summary.revenue - operating - interest - summary.refunds,
    }
}

fn projections(summary: &ReportSummary, debts: &DebtRegistry, window: DateWindow) -> Projections {
    let daily_average = Money::from_cents(summary.revenue.cents() / window.days().max(1));
    let next_period_revenue = Money::from_cents(daily_average.cents() * window.days());

    let outstanding: Money = debts.active().map(|d| d.current_balance).sum();
    let velocity: Money = debts.active().map(|d| d.minimum_payment).sum();
    let debt_payoff_months = if outstanding.is_positive() && velocity.is_positive() {
        let months = (outstanding.cents() + velocity.cents() - 1) / velocity.cents();
        Some(months as u32)
    } else {
        None
    };

    Projections {
        next_period_revenue,
        debt_payoff_months,
        break_even_revenue: summary.expenses + velocity,
    }
}

/// Builds one report. Pure over its inputs; the caller owns appending the
/// result to history and announcing it.
pub fn generate(
    kind: ReportKind,
    window: DateWindow,
    log: &TransactionLog,
    debts: &DebtRegistry,
    as_of: NaiveDate,
    generated_at: DateTime<Utc>,
) -> FinancialReport {
    let summary = summarize(log, window);
    let details = match kind {
        ReportKind::Daily | ReportKind::Weekly => ReportDetails::None,
        ReportKind::Monthly => ReportDetails::Monthly {
            projections: projections(&summary, debts, window),
        },
        ReportKind::DebtSummary => ReportDetails::Debt(debt_detail(debts, as_of)),
        ReportKind::CashFlow => ReportDetails::CashFlow(cash_flow_detail(log, window)),
        ReportKind::ProfitLoss => ReportDetails::ProfitLoss(profit_loss_detail(&summary)),
    };
    FinancialReport {
        id: ReportId::new(),
        kind,
        window,
        generated_at,
        summary,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::debt::{Debt, DebtClass};
    use crate::ledger::transaction::META_NON_CASH;
    use crate::money::PaymentMethod;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn ts(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, 12, 0, 0).unwrap()
    }

    fn seeded_log() -> TransactionLog {
        let mut log = TransactionLog::new();
        log.record(
            TransactionKind::Sale,
            Money::from_dollars(300),
            "daily sales",
            "sales",
            PaymentMethod::Cash,
            None,
            BTreeMap::new(),
            ts(2),
        )
        .unwrap();
        log.record(
            TransactionKind::Expense,
            Money::from_dollars(100),
            "rent",
            "rent",
            PaymentMethod::BankTransfer,
            None,
            BTreeMap::new(),
            ts(3),
        )
        .unwrap();
        let mut meta = BTreeMap::new();
        meta.insert(META_NON_CASH.to_string(), "true".to_string());
        log.record(
            TransactionKind::Expense,
            Money::from_dollars(20),
            "interest accrued",
            INTEREST_CATEGORY,
            PaymentMethod::BankTransfer,
            None,
            meta,
            ts(3),
        )
        .unwrap();
        log
    }

    #[test]
    fn summary_breaks_down_by_method_and_category() {
        let log = seeded_log();
        let window = DateWindow::new(date(1), date(30));
        let summary = summarize(&log, window);
        assert_eq!(summary.revenue, Money::from_dollars(300));
        assert_eq!(summary.expenses, Money::from_dollars(120));
        assert_eq!(summary.net, Money::from_dollars(180));
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(summary.by_method["cash"], Money::from_dollars(300));
        assert_eq!(summary.by_category["rent"], Money::from_dollars(100));
    }

    #[test]
    fn cash_flow_excludes_non_cash_accruals() {
        let log = seeded_log();
        let window = DateWindow::new(date(1), date(30));
        let detail = cash_flow_detail(&log, window);
        assert_eq!(detail.inflow, Money::from_dollars(300));
        assert_eq!(detail.outflow, Money::from_dollars(100));
        assert_eq!(detail.net, Money::from_dollars(200));
    }

    #[test]
    fn profit_loss_splits_interest_from_operating() {
        let log = seeded_log();
        let window = DateWindow::new(date(1), date(30));
        let report = generate(
            ReportKind::ProfitLoss,
            window,
            &log,
            &DebtRegistry::new(),
            date(30),
            ts(30),
        );
        match report.details {
            ReportDetails::ProfitLoss(detail) => {
                assert_eq!(detail.operating_expenses, Money::from_dollars(100));
                assert_eq!(detail.interest_expense, Money::from_dollars(20));
                assert_eq!(detail.net_profit, Money::from_dollars(180));
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn monthly_projection_estimates_payoff_velocity() {
        let log = seeded_log();
        let mut debts = DebtRegistry::new();
        debts.insert(Debt::new(
            "Bank",
            DebtClass::StructuredLoan,
            Money::from_dollars(10_000),
            0.02,
            Money::from_dollars(2_500),
            date(15),
        ));
        let window = DateWindow::new(date(1), date(30));
        let report = generate(ReportKind::Monthly, window, &log, &debts, date(30), ts(30));
        match report.details {
            ReportDetails::Monthly { projections } => {
                assert_eq!(projections.debt_payoff_months, Some(4));
                assert_eq!(
                    projections.break_even_revenue,
                    Money::from_dollars(120 + 2_500)
                );
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn history_retains_most_recent_reports() {
        let log = TransactionLog::new();
        let debts = DebtRegistry::new();
        let window = DateWindow::single_day(date(1));
        let mut history = ReportHistory::new(2);
        for day in 1..=4 {
            history.push(generate(
                ReportKind::Daily,
                window,
                &log,
                &debts,
                date(day),
                ts(day),
            ));
        }
        assert_eq!(history.len(), 2);
        let newest = history.latest().unwrap();
        assert_eq!(newest.generated_at, ts(4));
    }
}
