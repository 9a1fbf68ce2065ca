use chrono::NaiveDate;
use till_core::config::EngineConfig;
use till_core::engine::events::DomainEvent;
use till_core::engine::FinanceEngine;
use till_core::errors::FinanceError;
use till_core::ledger::calendar::DateWindow;
use till_core::ledger::debt::{Debt, DebtClass};
use till_core::money::{FundSource, Money, MoneyPool, PaymentMethod};
use till_core::report::{ReportDetails, ReportKind};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn engine(cash: i64, bank: i64) -> FinanceEngine {
    FinanceEngine::new(
        EngineConfig::default(),
        date(2025, 6, 1),
        MoneyPool::new(Money::from_dollars(cash), Money::from_dollars(bank)),
    )
}

#[test]
fn balance_conservation_across_mixed_operations() {
    let mut engine = engine(200, 500);
    let initial = engine.pool().total();

    engine
        .process_sale(&[], Money::from_dollars(150), PaymentMethod::Cash, None, &[])
        .expect("cash sale");
    engine
        .process_sale(
            &[],
            Money::from_dollars(100),
            PaymentMethod::CreditCard,
            None,
            &[],
        )
        .expect("card sale");
    engine
        .process_expense(Money::from_dollars(50), "stock", "inventory", None, None)
        .expect("expense");
    let debt_id = engine.add_debt(Debt::new(
        "Supplier",
        DebtClass::TradeCredit,
        Money::from_dollars(1_000),
        0.0,
        Money::from_dollars(75),
        date(2025, 7, 1),
    ));
    engine
        .make_debt_payment(debt_id, Money::from_dollars(75))
        .expect("payment");

    // +150 cash sale, +100 card gross, -2.90 fee, -50 expense, -75 payment.
    let expected = initial + Money::from_cents(15_000 + 10_000 - 290 - 5_000 - 7_500);
    assert_eq!(engine.pool().total(), expected);
    // Replaying the log from an empty pool reproduces the delta exactly.
    let replayed = engine.log().replay_pool();
    assert_eq!(replayed.total() + initial, engine.pool().total());
}

#[test]
fn failed_withdrawal_leaves_no_trace() {
    let mut engine = engine(50, 0);
    let err = engine
        .process_expense(Money::from_dollars(100), "rent", "rent", None, None)
        .expect_err("cannot cover");
    assert!(matches!(err, FinanceError::InsufficientFunds { .. }));
    assert_eq!(engine.pool().cash_on_hand(), Money::from_dollars(50));
    assert!(engine.log().is_empty());
    assert!(engine.drain_events().is_empty());
}

#[test]
fn debt_scenario_from_accrual_to_payment() {
    let mut engine = engine(0, 10_000);
    let mut debt = Debt::new(
        "First Provincial Bank",
        DebtClass::StructuredLoan,
        Money::from_dollars(50_000),
        0.03,
        Money::from_dollars(2_500),
        date(2025, 7, 1),
    );
    debt.current_balance = Money::from_cents(4_875_000); // $48,750.00
    let debt_id = engine.add_debt(debt);

    engine.on_day_end().expect("tick");
    let after_accrual = engine.debts().get(debt_id).unwrap();
    assert_eq!(after_accrual.current_balance, Money::from_cents(4_879_875));

    engine
        .make_debt_payment(debt_id, Money::from_dollars(2_500))
        .expect("payment");
    let after_payment = engine.debts().get(debt_id).unwrap();
    assert_eq!(after_payment.current_balance, Money::from_cents(4_629_875));
    assert_eq!(after_payment.next_due_date, date(2025, 8, 1));
    assert!(after_payment.is_active);
}

#[test]
fn paying_a_debt_to_zero_emits_paid_off() {
    let mut engine = engine(0, 2_000);
    let debt_id = engine.add_debt(Debt::new(
        "Cousin Vinnie",
        DebtClass::InformalDebt,
        Money::from_dollars(600),
        0.0,
        Money::from_dollars(100),
        date(2025, 6, 15),
    ));
    engine
        .make_debt_payment(debt_id, Money::from_dollars(600))
        .expect("payoff");

    let debt = engine.debts().get(debt_id).unwrap();
    assert!(!debt.is_active);
    assert_eq!(debt.current_balance, Money::ZERO);
    let events = engine.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::DebtPaidOff { debt_id: id } if *id == debt_id)));

    // A second payment against a settled debt is rejected.
    let err = engine
        .make_debt_payment(debt_id, Money::from_dollars(10))
        .expect_err("already settled");
    assert!(matches!(err, FinanceError::PaymentFailed(_)));
}

#[test]
fn register_session_reconciles_cash_sales() {
    let mut engine = engine(200, 0);
    engine
        .open_cash_register(Money::from_dollars(200))
        .expect("open");
    engine
        .process_sale(&[], Money::from_dollars(50), PaymentMethod::Cash, None, &[])
        .expect("sale");
    let closed = engine.close_cash_register().expect("close");
    assert_eq!(closed.starting_cash, Money::from_dollars(200));
    assert_eq!(closed.sales_total, Money::from_dollars(50));
    assert_eq!(closed.ending_cash, Some(Money::from_dollars(250)));
    assert_eq!(closed.variance, Some(Money::ZERO));
    assert_eq!(closed.transaction_count, 1);

    let events = engine.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::RegisterClosed { .. })));
}

#[test]
fn refunds_and_transfers_stay_replay_consistent() {
    let mut engine = engine(300, 100);
    engine
        .process_sale(&[], Money::from_dollars(80), PaymentMethod::Cash, None, &[])
        .expect("sale");
    engine
        .process_refund(Money::from_dollars(30), PaymentMethod::Cash, "returned lamp")
        .expect("refund");
    engine
        .transfer_funds(Money::from_dollars(200), FundSource::Cash)
        .expect("bank the drawer");

    assert_eq!(engine.pool().cash_on_hand(), Money::from_dollars(150));
    assert_eq!(engine.pool().bank_balance(), Money::from_dollars(300));
    let replayed = engine.log().replay_pool();
    // Replay starts from empty, so compare deltas against the opening pool.
    assert_eq!(
        replayed.total(),
        engine.pool().total() - Money::from_dollars(400)
    );
}

#[test]
fn debt_summary_report_splits_active_overdue_and_settled() {
    let mut engine = engine(0, 10_000);
    engine.add_debt(Debt::new(
        "Bank loan",
        DebtClass::StructuredLoan,
        Money::from_dollars(20_000),
        0.0,
        Money::from_dollars(800),
        date(2025, 7, 1),
    ));
    engine.add_debt(Debt::new(
        "Supplier",
        DebtClass::TradeCredit,
        Money::from_dollars(3_000),
        0.0,
        Money::from_dollars(300),
        date(2025, 5, 20),
    ));
    let settled = engine.add_debt(Debt::new(
        "Cousin Vinnie",
        DebtClass::InformalDebt,
        Money::from_dollars(500),
        0.0,
        Money::from_dollars(100),
        date(2025, 6, 15),
    ));
    engine
        .make_debt_payment(settled, Money::from_dollars(500))
        .expect("payoff");

    let report = engine.generate_report(
        ReportKind::DebtSummary,
        DateWindow::trailing(date(2025, 6, 1), 30),
    );
    match report.details {
        ReportDetails::Debt(detail) => {
            assert_eq!(detail.active_count, 2);
            assert_eq!(detail.paid_off_count, 1);
            // Only the supplier credit is past due as of June 1.
            assert_eq!(detail.overdue_count, 1);
            assert_eq!(detail.total_outstanding, Money::from_dollars(23_000));
            assert_eq!(detail.minimum_due_total, Money::from_dollars(1_100));
        }
        other => panic!("unexpected details: {other:?}"),
    }
    // Generated reports are filed in the bounded history.
    assert_eq!(engine.reports().latest().unwrap().id, report.id);
}

#[test]
fn cash_flow_report_tracks_pool_movements() {
    let mut engine = engine(100, 0);
    engine
        .process_sale(&[], Money::from_dollars(200), PaymentMethod::Cash, None, &[])
        .expect("sale");
    engine
        .process_expense(Money::from_dollars(50), "stock", "inventory", None, None)
        .expect("expense");

    let report = engine.generate_report(
        ReportKind::CashFlow,
        DateWindow::trailing(engine.today(), 7),
    );
    match report.details {
        ReportDetails::CashFlow(detail) => {
            assert_eq!(detail.inflow, Money::from_dollars(200));
            assert_eq!(detail.outflow, Money::from_dollars(50));
            assert_eq!(detail.net, Money::from_dollars(150));
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[test]
fn invalid_amounts_are_rejected_up_front() {
    let mut engine = engine(100, 100);
    assert!(matches!(
        engine.process_sale(&[], Money::ZERO, PaymentMethod::Cash, None, &[]),
        Err(FinanceError::InvalidAmount)
    ));
    assert!(matches!(
        engine.process_expense(Money::from_cents(-5), "x", "y", None, None),
        Err(FinanceError::InvalidAmount)
    ));
    assert!(engine.log().is_empty());
}
