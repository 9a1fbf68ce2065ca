#![doc(test(attr(deny(warnings))))]

//! Till Core owns all money movement for a retail-management simulation:
//! the cash/bank pool, the append-only transaction log, debt amortization and
//! overdue escalation, expense scheduling, cash-register reconciliation, and
//! period reporting. The host delivers day/week/month ticks and sale or
//! payment requests; the engine answers with typed results and queued domain
//! events.

pub mod config;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod money;
pub mod report;
pub mod storage;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::from_default_env().add_directive("till_core=info".parse().unwrap());
        fmt().with_env_filter(filter).init();
        tracing::info!("Till Core tracing initialized.");
    });
}
