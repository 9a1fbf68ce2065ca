//! Injectable card-authorization outcomes.
//!
//! Decline probability is gameplay flavor, not a systems requirement, so it
//! lives behind a trait: the default approves everything, and the seeded
//! policy reproduces the same decline sequence for a given seed.

use crate::money::Money;

pub trait CardOutcome: Send {
    /// Whether the network authorizes a charge of `amount`.
    fn authorize(&mut self, amount: Money) -> bool;
}

/// Default policy: every charge goes through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApprove;

impl CardOutcome for AlwaysApprove {
    fn authorize(&mut self, _amount: Money) -> bool {
        true
    }
}

/// Declines a fixed fraction of charges, deterministically per seed.
#[derive(Debug, Clone)]
pub struct SeededDeclineRate {
    state: u64,
    decline_rate: f64,
}

impl SeededDeclineRate {
    pub fn new(seed: u64, decline_rate: f64) -> Self {
        Self {
            state: seed.max(1),
            decline_rate: decline_rate.clamp(0.0, 1.0),
        }
    }

    /// xorshift64* step mapped onto [0, 1).
    fn next_unit(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        let bits = x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }
}

impl CardOutcome for SeededDeclineRate {
    fn authorize(&mut self, _amount: Money) -> bool {
        self.next_unit() >= self.decline_rate
    }
}
