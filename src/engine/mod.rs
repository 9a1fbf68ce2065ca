//! The engine: single owner of the pool, the log, and the registries.
//!
//! All mutation is synchronous and happens either through an inbound request
//! (sale, expense, debt payment, register open/close) or a boundary tick
//! (`on_day_end` / `on_week_end` / `on_month_end`). Failures are detected
//! before any state moves, so an error leaves the engine exactly as it was.

pub mod events;
pub mod policy;

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::errors::{FinanceError, FinanceResult};
use crate::ledger::calendar::DateWindow;
use crate::ledger::debt::{Debt, DebtId, DebtRegistry};
use crate::ledger::expense::{Expense, ExpenseClass, ExpenseId, ExpenseRegistry, Frequency};
use crate::ledger::register::RegisterSession;
use crate::ledger::schedule::{self, ScheduledPayment};
use crate::ledger::transaction::{
    LedgerRef, Transaction, TransactionKind, TransactionLog, META_LEG_BANK, META_LEG_CASH,
    META_NON_CASH,
};
use crate::money::{FundSource, FundingPolicy, Money, MoneyPool, PaymentMethod};
use crate::report::{self, FinancialReport, ReportHistory, ReportKind, INTEREST_CATEGORY};

use events::DomainEvent;
use policy::{AlwaysApprove, CardOutcome};

/// One line of an itemized sale, carried into transaction metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub label: String,
    pub amount: Money,
}

/// Everything the host persists for save/load. Round-trips losslessly
/// through JSON; the card-outcome policy and queued events are transient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    pub today: NaiveDate,
    pub pool: MoneyPool,
    pub log: TransactionLog,
    pub debts: DebtRegistry,
    pub expenses: ExpenseRegistry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<RegisterSession>,
    pub reports: ReportHistory,
    pub card_fee_expense: ExpenseId,
}

pub struct FinanceEngine {
    config: EngineConfig,
    today: NaiveDate,
    pool: MoneyPool,
    log: TransactionLog,
    debts: DebtRegistry,
    expenses: ExpenseRegistry,
    session: Option<RegisterSession>,
    reports: ReportHistory,
    funding: FundingPolicy,
    card_policy: Box<dyn CardOutcome>,
    card_fee_expense: ExpenseId,
    events: VecDeque<DomainEvent>,
}

impl FinanceEngine {
    pub fn new(config: EngineConfig, start_date: NaiveDate, opening: MoneyPool) -> Self {
        let mut expenses = ExpenseRegistry::new();
        // Built-in sink for card processing fees; percent-of-sales, so it is
        // never scheduled. The fee itself is assessed on the card path only.
        let card_fee_expense = expenses.insert(Expense::new(
            "Card processing",
            ExpenseClass::PercentOfSales {
                rate: config.card_fee_rate,
            },
            Money::ZERO,
            Frequency::Daily,
            "fees",
            start_date,
        ));
        let retention = config.report_retention;
        Self {
            config,
            today: start_date,
            pool: opening,
            log: TransactionLog::new(),
            debts: DebtRegistry::new(),
            expenses,
            session: None,
            reports: ReportHistory::new(retention),
            funding: FundingPolicy::default(),
            card_policy: Box::new(AlwaysApprove),
            card_fee_expense,
            events: VecDeque::new(),
        }
    }

    /// Rebuilds an engine from a host-persisted snapshot.
    pub fn from_state(config: EngineConfig, state: EngineState) -> Self {
        Self {
            config,
            today: state.today,
            pool: state.pool,
            log: state.log,
            debts: state.debts,
            expenses: state.expenses,
            session: state.session,
            reports: state.reports,
            funding: FundingPolicy::default(),
            card_policy: Box::new(AlwaysApprove),
            card_fee_expense: state.card_fee_expense,
            events: VecDeque::new(),
        }
    }

    pub fn snapshot(&self) -> EngineState {
        EngineState {
            today: self.today,
            pool: self.pool.clone(),
            log: self.log.clone(),
            debts: self.debts.clone(),
            expenses: self.expenses.clone(),
            session: self.session.clone(),
            reports: self.reports.clone(),
            card_fee_expense: self.card_fee_expense,
        }
    }

    pub fn set_card_policy(&mut self, policy: Box<dyn CardOutcome>) {
        self.card_policy = policy;
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn pool(&self) -> &MoneyPool {
        &self.pool
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    pub fn debts(&self) -> &DebtRegistry {
        &self.debts
    }

    pub fn expenses(&self) -> &ExpenseRegistry {
        &self.expenses
    }

    pub fn session(&self) -> Option<&RegisterSession> {
        self.session.as_ref()
    }

    pub fn reports(&self) -> &ReportHistory {
        &self.reports
    }

    pub fn add_debt(&mut self, debt: Debt) -> DebtId {
        self.debts.insert(debt)
    }

    pub fn add_expense(&mut self, expense: Expense) -> ExpenseId {
        self.expenses.insert(expense)
    }

    /// Queued outbound events since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        self.events.drain(..).collect()
    }

    /// Game-clock timestamp: all postings on a given day share it, and the
    /// log's `seq` keeps them ordered within the day.
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(
            self.today.and_hms_opt(12, 0, 0).expect("valid time"),
            Utc,
        )
    }

    fn announce(&mut self, txn: &Transaction) {
        self.events.push_back(DomainEvent::TransactionRecorded {
            seq: txn.seq,
            id: txn.id,
            kind: txn.kind,
            amount: txn.amount,
        });
    }

    /// Executes planned withdrawal legs and stamps them into metadata so log
    /// replay reproduces the exact split.
    fn execute_legs(
        &mut self,
        legs: &[(FundSource, Money)],
        metadata: &mut BTreeMap<String, String>,
    ) -> FinanceResult<()> {
        for (source, amount) in legs {
            self.pool.withdraw(*amount, *source)?;
            let key = match source {
                FundSource::Bank => META_LEG_BANK,
                FundSource::Cash => META_LEG_CASH,
            };
            metadata.insert(key.to_string(), amount.cents().to_string());
        }
        Ok(())
    }

    /// Processes a checkout sale. Card methods pass through the authorization
    /// policy and carry the processing fee; both the gross deposit and the fee
    /// leg post together or not at all.
    pub fn process_sale(
        &mut self,
        items: &[SaleItem],
        total: Money,
        method: PaymentMethod,
        customer: Option<&str>,
        discounts: &[Discount],
    ) -> FinanceResult<Transaction> {
        if !total.is_positive() {
            return Err(FinanceError::InvalidAmount);
        }
        if method.is_card() && !self.card_policy.authorize(total) {
            tracing::info!(amount = %total, method = method.label(), "card declined");
            return Err(FinanceError::PaymentFailed("card declined".into()));
        }

        let mut metadata = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            metadata.insert(
                format!("item.{index}"),
                format!("{} x{} @ {}", item.name, item.quantity, item.unit_price),
            );
        }
        for (index, discount) in discounts.iter().enumerate() {
            metadata.insert(
                format!("discount.{index}"),
                format!("{} {}", discount.label, discount.amount),
            );
        }
        if let Some(customer) = customer {
            metadata.insert("customer".to_string(), customer.to_string());
        }
        if self.config.sales_tax_rate > 0.0 {
            let tax = total.scaled(self.config.sales_tax_rate);
            metadata.insert("tax".to_string(), tax.cents().to_string());
        }

        let destination = method.settles_to();
        self.pool.deposit(total, destination)?;
        if method == PaymentMethod::Cash {
            if let Some(session) = self.session.as_mut().filter(|s| s.is_open()) {
                session.record_cash_sale(total);
            }
        }
        let now = self.now();
        let txn = self.log.record(
            TransactionKind::Sale,
            total,
            "sale",
            "sales",
            method,
            None,
            metadata,
            now,
        )?;
        self.announce(&txn);

        if method.is_card() {
            let fee = total.scaled(self.config.card_fee_rate);
            if fee.is_positive() {
                // The gross deposit above covers the fee, so this cannot fail.
                self.pool.withdraw(fee, FundSource::Bank)?;
                let fee_txn = self.log.record(
                    TransactionKind::Expense,
                    fee,
                    "card processing fee",
                    "fees",
                    PaymentMethod::BankTransfer,
                    Some(LedgerRef::Expense(self.card_fee_expense)),
                    BTreeMap::new(),
                    now,
                )?;
                self.announce(&fee_txn);
            }
        }

        self.assess_percent_of_sales(total)?;
        Ok(txn)
    }

    /// Percentage-of-sales expenses (royalties and the like) assess eagerly on
    /// every sale; the built-in card-fee sink is handled on the card path.
    fn assess_percent_of_sales(&mut self, sale_total: Money) -> FinanceResult<()> {
        let assessments: Vec<(ExpenseId, String, String, Money)> = self
            .expenses
            .iter()
            .filter(|e| e.id != self.card_fee_expense)
            .filter_map(|e| match e.class {
                ExpenseClass::PercentOfSales { rate } => {
                    let amount = sale_total.scaled(rate);
                    amount
                        .is_positive()
                        .then(|| (e.id, e.name.clone(), e.category.clone(), amount))
                }
                _ => None,
            })
            .collect();
        for (id, name, category, amount) in assessments {
            let legs = self.funding.plan(&self.pool, amount)?;
            let mut metadata = BTreeMap::new();
            self.execute_legs(&legs, &mut metadata)?;
            let now = self.now();
            let txn = self.log.record(
                TransactionKind::Expense,
                amount,
                format!("{name} on sale"),
                category,
                PaymentMethod::BankTransfer,
                Some(LedgerRef::Expense(id)),
                metadata,
                now,
            )?;
            self.announce(&txn);
            let today = self.today;
            if let Some(expense) = self.expenses.get_mut(id) {
                expense
                    .payment_history
                    .push(crate::ledger::debt::PaymentRecord {
                        date: today,
                        amount,
                    });
            }
        }
        Ok(())
    }

    /// Records an ad-hoc outgoing expense, routed bank-first.
    pub fn process_expense(
        &mut self,
        amount: Money,
        description: &str,
        category: &str,
        vendor: Option<&str>,
        reference: Option<LedgerRef>,
    ) -> FinanceResult<Transaction> {
        let legs = self.funding.plan(&self.pool, amount)?;
        let mut metadata = BTreeMap::new();
        if let Some(vendor) = vendor {
            metadata.insert("vendor".to_string(), vendor.to_string());
        }
        self.execute_legs(&legs, &mut metadata)?;
        let now = self.now();
        let txn = self.log.record(
            TransactionKind::Expense,
            amount,
            description,
            category,
            PaymentMethod::BankTransfer,
            reference,
            metadata,
            now,
        )?;
        self.announce(&txn);
        Ok(txn)
    }

    /// Settles a scheduled expense on demand, ahead of or after its due date.
    pub fn pay_expense(&mut self, expense_id: ExpenseId) -> FinanceResult<Transaction> {
        let expense = self
            .expenses
            .get(expense_id)
            .ok_or(FinanceError::ExpenseNotFound(expense_id))?;
        if matches!(expense.class, ExpenseClass::PercentOfSales { .. }) {
            return Err(FinanceError::PaymentFailed(
                "percentage expenses are assessed at sale time".into(),
            ));
        }
        if !expense.amount.is_positive() {
            return Err(FinanceError::InvalidAmount);
        }
        let (name, category, amount) = (
            expense.name.clone(),
            expense.category.clone(),
            expense.amount,
        );
        let legs = self.funding.plan(&self.pool, amount)?;
        let mut metadata = BTreeMap::new();
        self.execute_legs(&legs, &mut metadata)?;
        let now = self.now();
        let txn = self.log.record(
            TransactionKind::Expense,
            amount,
            name,
            category,
            PaymentMethod::BankTransfer,
            Some(LedgerRef::Expense(expense_id)),
            metadata,
            now,
        )?;
        self.announce(&txn);
        let today = self.today;
        if let Some(expense) = self.expenses.get_mut(expense_id) {
            expense.mark_paid(amount, today);
        }
        Ok(txn)
    }

    /// Pays down a debt. The due date advances only when the payment meets
    /// the minimum; reaching zero emits `DebtPaidOff`.
    pub fn make_debt_payment(
        &mut self,
        debt_id: DebtId,
        amount: Money,
    ) -> FinanceResult<Transaction> {
        if !amount.is_positive() {
            return Err(FinanceError::InvalidAmount);
        }
        let debt = self
            .debts
            .get(debt_id)
            .ok_or(FinanceError::DebtNotFound(debt_id))?;
        if !debt.is_active {
            return Err(FinanceError::PaymentFailed("debt already paid off".into()));
        }
        let creditor = debt.creditor.clone();
        let legs = self.funding.plan(&self.pool, amount)?;
        let mut metadata = BTreeMap::new();
        self.execute_legs(&legs, &mut metadata)?;

        let today = self.today;
        let paid_off = self
            .debts
            .get_mut(debt_id)
            .map(|debt| debt.apply_payment(amount, today))
            .unwrap_or(false);

        let now = self.now();
        let txn = self.log.record(
            TransactionKind::Payment,
            amount,
            format!("payment to {creditor}"),
            "debt-service",
            PaymentMethod::BankTransfer,
            Some(LedgerRef::Debt(debt_id)),
            metadata,
            now,
        )?;
        self.announce(&txn);
        if paid_off {
            tracing::info!(debt = %debt_id, "debt paid off");
            self.events.push_back(DomainEvent::DebtPaidOff { debt_id });
        }
        Ok(txn)
    }

    /// Refunds a customer out of the balance their method settles against.
    pub fn process_refund(
        &mut self,
        amount: Money,
        method: PaymentMethod,
        description: &str,
    ) -> FinanceResult<Transaction> {
        self.pool.withdraw(amount, method.settles_to())?;
        let now = self.now();
        let txn = self.log.record(
            TransactionKind::Refund,
            amount,
            description,
            "refunds",
            method,
            None,
            BTreeMap::new(),
            now,
        )?;
        self.announce(&txn);
        Ok(txn)
    }

    /// Moves money between the drawer and the bank.
    pub fn transfer_funds(&mut self, amount: Money, from: FundSource) -> FinanceResult<Transaction> {
        let to = match from {
            FundSource::Cash => FundSource::Bank,
            FundSource::Bank => FundSource::Cash,
        };
        self.pool.withdraw(amount, from)?;
        self.pool.deposit(amount, to)?;
        let mut metadata = BTreeMap::new();
        metadata.insert("transfer_from".to_string(), from.to_string());
        let method = match from {
            FundSource::Cash => PaymentMethod::Cash,
            FundSource::Bank => PaymentMethod::BankTransfer,
        };
        let now = self.now();
        let txn = self.log.record(
            TransactionKind::Transfer,
            amount,
            format!("transfer {from} to {to}"),
            "transfers",
            method,
            None,
            metadata,
            now,
        )?;
        self.announce(&txn);
        Ok(txn)
    }

    pub fn open_cash_register(&mut self, starting_cash: Money) -> FinanceResult<()> {
        if self.session.as_ref().is_some_and(|s| s.is_open()) {
            return Err(FinanceError::RegisterAlreadyOpen);
        }
        let session = RegisterSession::open(starting_cash, self.now());
        tracing::info!(starting_cash = %starting_cash, "register opened");
        self.session = Some(session);
        self.events
            .push_back(DomainEvent::RegisterOpened { starting_cash });
        Ok(())
    }

    /// Closes the open session against the pool's actual cash balance. A
    /// positive variance is found money and stays in the drawer.
    pub fn close_cash_register(&mut self) -> FinanceResult<RegisterSession> {
        let session = self
            .session
            .take()
            .filter(|s| s.is_open())
            .ok_or(FinanceError::RegisterNotOpen)?;
        let closed = session.close(self.pool.cash_on_hand(), self.now());
        tracing::info!(
            variance = %closed.variance.unwrap_or(Money::ZERO),
            sales = %closed.sales_total,
            "register closed"
        );
        self.events.push_back(DomainEvent::RegisterClosed {
            session: closed.clone(),
        });
        Ok(closed)
    }

    /// Day boundary: advance the clock, accrue interest, escalate overdue
    /// debts and expenses, settle scheduled expenses, and file the daily
    /// report for the day that just ended.
    pub fn on_day_end(&mut self) -> FinanceResult<()> {
        let closing_day = self.today;
        self.today += Duration::days(1);
        tracing::info!(day = %self.today, "day advanced");

        self.accrue_interest()?;

        let crossings = self.debts.scan_overdue(self.today);
        for (debt_id, tier) in crossings {
            let consequence = self
                .debts
                .get(debt_id)
                .and_then(|debt| debt.consequence_for(tier));
            self.events.push_back(DomainEvent::DebtOverdue {
                debt_id,
                tier,
                consequence,
            });
        }

        self.process_due_expenses()?;
        let crossings = self.expenses.scan_overdue(self.today);
        for (expense_id, tier) in crossings {
            self.events
                .push_back(DomainEvent::ExpenseOverdue { expense_id, tier });
        }

        self.file_report(ReportKind::Daily, DateWindow::single_day(closing_day));
        Ok(())
    }

    /// Week boundary: file the trailing-week report.
    pub fn on_week_end(&mut self) -> FinanceResult<()> {
        self.file_report(ReportKind::Weekly, DateWindow::trailing(self.today, 7));
        Ok(())
    }

    /// Month boundary: file the trailing-month report with projections.
    pub fn on_month_end(&mut self) -> FinanceResult<()> {
        self.file_report(ReportKind::Monthly, DateWindow::trailing(self.today, 30));
        Ok(())
    }

    /// Once per day-advance: every active debt with a rate accrues interest,
    /// posted as a non-cash interest expense referencing the debt.
    fn accrue_interest(&mut self) -> FinanceResult<()> {
        let periods = self.config.accrual_periods_per_cycle;
        let accruals: Vec<(DebtId, String, Money)> = self
            .debts
            .active()
            .filter_map(|debt| {
                let interest = debt.accrued_interest(periods);
                interest
                    .is_positive()
                    .then(|| (debt.id, debt.creditor.clone(), interest))
            })
            .collect();
        for (debt_id, creditor, interest) in accruals {
            if let Some(debt) = self.debts.get_mut(debt_id) {
                debt.accrue(interest);
            }
            let mut metadata = BTreeMap::new();
            metadata.insert(META_NON_CASH.to_string(), "true".to_string());
            let now = self.now();
            let txn = self.log.record(
                TransactionKind::Expense,
                interest,
                format!("interest accrued on {creditor}"),
                INTEREST_CATEGORY,
                PaymentMethod::BankTransfer,
                Some(LedgerRef::Debt(debt_id)),
                metadata,
                now,
            )?;
            self.announce(&txn);
        }
        Ok(())
    }

    /// Settles every scheduled expense due by today. An expense the pool
    /// cannot cover stays due and retries on the next tick.
    fn process_due_expenses(&mut self) -> FinanceResult<()> {
        for id in self.expenses.due_ids(self.today) {
            let (name, category, amount) = match self.expenses.get(id) {
                Some(expense) => (
                    expense.name.clone(),
                    expense.category.clone(),
                    expense.amount,
                ),
                None => continue,
            };
            // A zero-amount definition has nothing to settle; it must not
            // abort the tick for the expenses behind it.
            if !amount.is_positive() {
                continue;
            }
            let legs = match self.funding.plan(&self.pool, amount) {
                Ok(legs) => legs,
                Err(FinanceError::InsufficientFunds { .. }) => {
                    tracing::warn!(expense = %id, name = %name, "expense unpaid, will retry");
                    continue;
                }
                Err(err) => return Err(err),
            };
            let mut metadata = BTreeMap::new();
            self.execute_legs(&legs, &mut metadata)?;
            let now = self.now();
            let txn = self.log.record(
                TransactionKind::Expense,
                amount,
                name,
                category,
                PaymentMethod::BankTransfer,
                Some(LedgerRef::Expense(id)),
                metadata,
                now,
            )?;
            self.announce(&txn);
            let today = self.today;
            if let Some(expense) = self.expenses.get_mut(id) {
                expense.mark_paid(amount, today);
            }
        }
        Ok(())
    }

    /// Builds a report on demand, files it in the bounded history, and
    /// announces it.
    pub fn generate_report(&mut self, kind: ReportKind, window: DateWindow) -> FinancialReport {
        self.file_report(kind, window)
    }

    fn file_report(&mut self, kind: ReportKind, window: DateWindow) -> FinancialReport {
        let report = report::generate(kind, window, &self.log, &self.debts, self.today, self.now());
        tracing::info!(kind = kind.label(), id = %report.id, "report generated");
        self.events.push_back(DomainEvent::ReportGenerated {
            report_id: report.id,
            kind,
        });
        self.reports.push(report.clone());
        report
    }

    /// Projects upcoming obligations. Pure view; safe to call at any time.
    pub fn project_schedule(&self, horizon_days: Option<u32>) -> Vec<ScheduledPayment> {
        schedule::project(
            &self.debts,
            &self.expenses,
            self.today,
            horizon_days.unwrap_or(self.config.default_horizon_days),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::debt::DebtClass;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine_with(cash: i64, bank: i64) -> FinanceEngine {
        FinanceEngine::new(
            EngineConfig::default(),
            date(2025, 6, 1),
            MoneyPool::new(Money::from_dollars(cash), Money::from_dollars(bank)),
        )
    }

    #[test]
    fn cash_sale_lands_in_the_drawer() {
        let mut engine = engine_with(200, 0);
        let txn = engine
            .process_sale(&[], Money::from_dollars(150), PaymentMethod::Cash, None, &[])
            .expect("sale");
        assert_eq!(txn.amount, Money::from_dollars(150));
        assert_eq!(engine.pool().cash_on_hand(), Money::from_dollars(350));
        assert_eq!(engine.pool().bank_balance(), Money::ZERO);
    }

    #[test]
    fn card_sale_nets_out_the_processing_fee() {
        let mut engine = engine_with(0, 0);
        engine
            .process_sale(
                &[],
                Money::from_dollars(100),
                PaymentMethod::CreditCard,
                None,
                &[],
            )
            .expect("sale");
        // $100.00 gross minus the 2.9% fee.
        assert_eq!(engine.pool().bank_balance(), Money::from_cents(10_000 - 290));
        assert_eq!(engine.log().len(), 2);
        // Both legs replay to the same balances.
        assert_eq!(engine.log().replay_pool(), *engine.pool());
    }

    #[test]
    fn declined_card_leaves_state_untouched() {
        struct Decline;
        impl CardOutcome for Decline {
            fn authorize(&mut self, _amount: Money) -> bool {
                false
            }
        }
        let mut engine = engine_with(50, 50);
        engine.set_card_policy(Box::new(Decline));
        let err = engine
            .process_sale(
                &[],
                Money::from_dollars(25),
                PaymentMethod::DebitCard,
                None,
                &[],
            )
            .expect_err("declined");
        assert!(matches!(err, FinanceError::PaymentFailed(_)));
        assert_eq!(engine.pool().total(), Money::from_dollars(100));
        assert!(engine.log().is_empty());
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn debt_payment_prefers_bank_then_cash() {
        let mut engine = engine_with(2_000, 1_000);
        let debt_id = engine.add_debt(Debt::new(
            "Bank",
            DebtClass::StructuredLoan,
            Money::from_dollars(10_000),
            0.0,
            Money::from_dollars(500),
            date(2025, 7, 1),
        ));
        engine
            .make_debt_payment(debt_id, Money::from_dollars(1_500))
            .expect("payment");
        assert_eq!(engine.pool().bank_balance(), Money::ZERO);
        assert_eq!(engine.pool().cash_on_hand(), Money::from_dollars(1_500));
        // Replay yields the deltas; adding the opening balances reproduces the pool.
        let replayed = engine.log().replay_pool();
        assert_eq!(
            replayed.cash_on_hand() + Money::from_dollars(2_000),
            engine.pool().cash_on_hand()
        );
        assert_eq!(
            replayed.bank_balance() + Money::from_dollars(1_000),
            engine.pool().bank_balance()
        );
        let debt = engine.debts().get(debt_id).unwrap();
        assert_eq!(debt.current_balance, Money::from_dollars(8_500));
    }

    #[test]
    fn pay_expense_settles_ahead_of_schedule() {
        let mut engine = engine_with(0, 2_000);
        let expense_id = engine.add_expense(
            Expense::new(
                "Rent",
                ExpenseClass::Fixed,
                Money::from_dollars(1_200),
                Frequency::Monthly { due_day: 5 },
                "rent",
                date(2025, 6, 5),
            )
            .essential(),
        );
        engine.pay_expense(expense_id).expect("early payment");
        assert_eq!(engine.pool().bank_balance(), Money::from_dollars(800));
        let expense = engine.expenses().get(expense_id).unwrap();
        assert_eq!(expense.next_due, date(2025, 7, 5));
        assert_eq!(expense.payment_history.len(), 1);
        assert_eq!(engine.log().len(), 1);
    }

    #[test]
    fn unknown_expense_is_reported() {
        let mut engine = engine_with(100, 100);
        let err = engine
            .pay_expense(ExpenseId::new())
            .expect_err("unknown expense");
        assert!(matches!(err, FinanceError::ExpenseNotFound(_)));
        assert!(engine.log().is_empty());
    }

    #[test]
    fn zero_amount_expense_does_not_block_the_tick() {
        let mut engine = engine_with(0, 2_000);
        engine.add_expense(Expense::new(
            "Placeholder",
            ExpenseClass::Fixed,
            Money::ZERO,
            Frequency::Monthly { due_day: 1 },
            "misc",
            date(2025, 6, 1),
        ));
        let rent_id = engine.add_expense(
            Expense::new(
                "Rent",
                ExpenseClass::Fixed,
                Money::from_dollars(1_200),
                Frequency::Monthly { due_day: 1 },
                "rent",
                date(2025, 6, 1),
            )
            .essential(),
        );
        engine.on_day_end().expect("tick");
        // The real expense behind the placeholder still settled.
        assert_eq!(engine.pool().bank_balance(), Money::from_dollars(800));
        let rent = engine.expenses().get(rent_id).unwrap();
        assert_eq!(rent.next_due, date(2025, 7, 1));
    }

    #[test]
    fn unknown_debt_is_reported() {
        let mut engine = engine_with(100, 100);
        let err = engine
            .make_debt_payment(DebtId::new(), Money::from_dollars(10))
            .expect_err("unknown debt");
        assert!(matches!(err, FinanceError::DebtNotFound(_)));
    }

    #[test]
    fn register_round_trip_has_zero_variance() {
        let mut engine = engine_with(200, 0);
        engine
            .open_cash_register(Money::from_dollars(200))
            .expect("open");
        assert!(matches!(
            engine.open_cash_register(Money::from_dollars(10)),
            Err(FinanceError::RegisterAlreadyOpen)
        ));
        engine
            .process_sale(&[], Money::from_dollars(50), PaymentMethod::Cash, None, &[])
            .expect("sale");
        let closed = engine.close_cash_register().expect("close");
        assert_eq!(closed.variance, Some(Money::ZERO));
        assert_eq!(closed.ending_cash, Some(Money::from_dollars(250)));
        assert!(matches!(
            engine.close_cash_register(),
            Err(FinanceError::RegisterNotOpen)
        ));
    }

    #[test]
    fn day_end_accrues_interest_as_non_cash() {
        let mut engine = engine_with(0, 0);
        let debt_id = engine.add_debt(Debt::new(
            "Bank",
            DebtClass::StructuredLoan,
            Money::from_cents(4_875_000),
            0.03,
            Money::from_dollars(2_500),
            date(2025, 7, 1),
        ));
        engine.on_day_end().expect("tick");
        let debt = engine.debts().get(debt_id).unwrap();
        assert_eq!(debt.current_balance, Money::from_cents(4_879_875));
        // The accrual posting moved no pool money.
        assert_eq!(engine.pool().total(), Money::ZERO);
        assert_eq!(engine.log().replay_pool(), *engine.pool());
    }

    #[test]
    fn transfer_moves_between_balances() {
        let mut engine = engine_with(500, 0);
        engine
            .transfer_funds(Money::from_dollars(300), FundSource::Cash)
            .expect("transfer");
        assert_eq!(engine.pool().cash_on_hand(), Money::from_dollars(200));
        assert_eq!(engine.pool().bank_balance(), Money::from_dollars(300));
        let replayed = engine.log().replay_pool();
        assert_eq!(
            replayed.cash_on_hand() + Money::from_dollars(500),
            engine.pool().cash_on_hand()
        );
        assert_eq!(
            replayed.bank_balance(),
            engine.pool().bank_balance()
        );
    }
}
