use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectorError, Result};

/// Best fit of the Decred mainnet emission curve, fitted with a zero intercept
/// and the premine added afterwards.
pub static DECRED_MAINNET_EMISSION: Lazy<EmissionSchedule> = Lazy::new(|| EmissionSchedule {
    quartic: -9e-19,
    cubic: 7e-12,
    quadratic: -2e-5,
    linear: 29.757,
    intercept: 76_963.0,
    premine: 1_680_000.0,
});

/// Quartic model of total theoretical coin emission as a function of height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionSchedule {
    pub quartic: f64,
    pub cubic: f64,
    pub quadratic: f64,
    pub linear: f64,
    pub intercept: f64,
    pub premine: f64,
}

impl Default for EmissionSchedule {
    fn default() -> Self {
        DECRED_MAINNET_EMISSION.clone()
    }
}

impl EmissionSchedule {
    /// Maximum coin supply the schedule allows at `height`, in coin units
    pub fn max_coin_supply_at(&self, height: f64) -> f64 {
        self.quartic * height.powi(4)
            + self.cubic * height.powi(3)
            + self.quadratic * height.powi(2)
            + self.linear * height
            + self.intercept
            + self.premine
    }
}

/// Network parameters captured once at session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub reward_period_days: i64,      // Minimum stake duration allowed
    pub target_seconds_per_block: f64,
    pub ticket_expiry_blocks: u64,
    pub ticket_maturity_blocks: u64,
    pub coinbase_maturity_blocks: u64,
    pub tickets_per_block: u64,
    pub actual_ticket_price: f64,     // Current market ticket price, coin units
    pub pool_size: u64,               // Current live ticket pool size
    pub pool_value: f64,              // Total value locked in the pool, coin units
    pub current_block_height: u64,
    pub current_coin_supply: f64,     // Coin units, not atomic units
    pub as_of: NaiveDate,             // UTC day current_block_height was observed
}

impl SimulationParameters {
    /// Reject parameter sets that would turn the projection into NaN or infinity
    pub fn validate(&self) -> Result<()> {
        if self.pool_size <= 1 {
            return Err(ProjectorError::Parameters(format!(
                "Ticket pool size must be greater than 1, got {}",
                self.pool_size
            )));
        }

        if !(self.target_seconds_per_block.is_finite() && self.target_seconds_per_block > 0.0) {
            return Err(ProjectorError::Parameters(format!(
                "Target block time must be positive, got {}",
                self.target_seconds_per_block
            )));
        }

        if self.tickets_per_block == 0 {
            return Err(ProjectorError::Parameters(
                "Tickets per block must be greater than zero".to_string(),
            ));
        }

        for (name, value) in [
            ("ticket price", self.actual_ticket_price),
            ("coin supply", self.current_coin_supply),
            ("pool value", self.pool_value),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ProjectorError::Parameters(format!(
                    "Current {} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.reward_period_days < 0 {
            return Err(ProjectorError::Parameters(format!(
                "Reward period must not be negative, got {}",
                self.reward_period_days
            )));
        }

        Ok(())
    }

    pub fn blocks_per_day(&self) -> f64 {
        86_400.0 / self.target_seconds_per_block
    }

    /// Share of the circulating supply locked in the ticket pool
    pub fn stake_percent(&self) -> f64 {
        self.pool_value / self.current_coin_supply
    }
}

#[cfg(test)]
pub(crate) fn mainnet_params() -> SimulationParameters {
    SimulationParameters {
        reward_period_days: 30,
        target_seconds_per_block: 300.0,
        ticket_expiry_blocks: 40_960,
        ticket_maturity_blocks: 256,
        coinbase_maturity_blocks: 256,
        tickets_per_block: 5,
        actual_ticket_price: 250.0,
        pool_size: 41_000,
        pool_value: 10_250_000.0,
        current_block_height: 900_000,
        current_coin_supply: 16_500_000.0,
        as_of: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
    }
}
