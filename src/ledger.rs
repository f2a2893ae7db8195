use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One staking scenario: how much to stake and over which UTC days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub stake_amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SimulationRequest {
    pub fn new(stake_amount: f64, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        SimulationRequest {
            stake_amount,
            start_date,
            end_date,
        }
    }

    /// Build a request from timestamps, truncating both ends to their UTC day
    pub fn from_timestamps(stake_amount: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        SimulationRequest::new(stake_amount, start.date_naive(), end.date_naive())
    }

    pub fn requested_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    /// Check the request against the network's minimum stake duration.
    /// A zero-day window is always too short.
    pub fn validate(&self, reward_period_days: i64) -> Result<(), ValidationError> {
        // Written so that NaN is rejected too
        if !(self.stake_amount > 0.0) {
            return Err(ValidationError::NonPositiveAmount);
        }

        if self.start_date > self.end_date {
            return Err(ValidationError::StartAfterEnd);
        }

        let days = self.requested_days();
        let minimum = reward_period_days.max(1);
        if days < minimum {
            return Err(ValidationError::DurationTooShort { days, minimum });
        }

        Ok(())
    }
}

/// A single row of the projected ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStep {
    pub simulated_block: u64,
    pub simulated_day: f64,
    pub balance: f64,
    pub ticket_price: f64,
    pub reward: f64,
    pub returned_fund: Option<f64>, // None on the seed row
    pub tickets_purchased: u64,
}

impl SimulationStep {
    pub fn seed(block: u64, balance: f64, ticket_price: f64) -> Self {
        SimulationStep {
            simulated_block: block,
            simulated_day: 0.0,
            balance,
            ticket_price,
            reward: 0.0,
            returned_fund: None,
            tickets_purchased: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub ledger: Vec<SimulationStep>,
    pub roi_percent: f64,
    pub roi_amount: f64,
}

impl SimulationResult {
    pub fn new(ledger: Vec<SimulationStep>, roi_percent: f64, stake_amount: f64) -> Self {
        SimulationResult {
            ledger,
            roi_percent,
            roi_amount: roi_percent * stake_amount / 100.0,
        }
    }

    pub fn final_balance(&self) -> Option<f64> {
        self.ledger.last().map(|step| step.balance)
    }

    pub fn total_reward(&self) -> f64 {
        self.ledger.iter().map(|step| step.reward).sum()
    }
}

/// Pull the overshoot of the last purchase cycle out of the final row so the
/// ledger ends exactly on the requested day. Returns the normalized ROI.
///
/// `simulation_reward` is the raw ROI percentage over `excess_blocks`.
pub fn normalize_to_window(
    ledger: &mut [SimulationStep],
    stake_amount: f64,
    simulation_reward: f64,
    number_of_blocks: f64,
    excess_blocks: f64,
    requested_days: i64,
) -> f64 {
    let normalized_roi = (number_of_blocks / excess_blocks) * simulation_reward;
    let overflow = stake_amount * (simulation_reward - normalized_roi) / 100.0;

    if let Some(last) = ledger.last_mut() {
        last.balance -= overflow;
        last.reward -= overflow;
        last.simulated_day = requested_days as f64;
    }

    normalized_roi
}

/// Fold negative rewards into the preceding row, walking back from the end
/// until a non-negative reward is found. Whatever is left negative on the
/// seed row is clamped to zero.
pub fn propagate_negative_rewards(ledger: &mut [SimulationStep]) {
    for index in (1..ledger.len()).rev() {
        let reward = ledger[index].reward;
        if reward >= 0.0 {
            break;
        }
        ledger[index - 1].reward += reward;
        ledger[index].reward = 0.0;
    }

    if let Some(seed) = ledger.first_mut() {
        if seed.reward < 0.0 {
            warn!(
                "Overshoot correction left {:.8} unabsorbed at the seed row, clamping to zero",
                seed.reward
            );
            seed.reward = 0.0;
        }
    }
}
