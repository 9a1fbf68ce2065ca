use serde::{Deserialize, Serialize};

/// Tunable knobs for the engine, all with gameplay-reasonable defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fee rate applied to incoming card payments (e.g. 0.029 = 2.9%).
    pub card_fee_rate: f64,
    /// Divisor that converts a per-period interest rate into a per-tick one.
    /// A monthly rate with the default of 30 accrues daily.
    pub accrual_periods_per_cycle: u32,
    /// Default horizon for schedule projection, in days.
    pub default_horizon_days: u32,
    /// How many generated reports the history retains.
    pub report_retention: usize,
    /// Flat sales-tax rate recorded in sale metadata; 0 disables it.
    pub sales_tax_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            card_fee_rate: 0.029,
            accrual_periods_per_cycle: 30,
            default_horizon_days: 90,
            report_retention: 50,
            sales_tax_rate: 0.0,
        }
    }
}
