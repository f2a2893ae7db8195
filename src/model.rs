//! Closed-form pieces of the staking projection: block height estimation,
//! expected voting delay and the theoretical ticket price model.

use chrono::NaiveDate;
use log::debug;

use crate::error::{ProjectorError, Result};
use crate::params::{EmissionSchedule, SimulationParameters};

/// Estimate the block height mined on `start_date` by walking from the
/// observed height at the target block interval.
///
/// The interval is counted in whole minutes. Sub-minute block times are
/// treated as one minute so the walk never divides by zero.
pub fn compute_starting_height(start_date: NaiveDate, params: &SimulationParameters) -> u64 {
    let today = params.as_of;
    if start_date == today {
        return params.current_block_height;
    }

    let delta_minutes = (start_date - today).num_minutes().unsigned_abs();
    let block_interval_minutes = ((params.target_seconds_per_block / 60.0).floor() as u64).max(1);
    let block_delta = delta_minutes / block_interval_minutes;

    if start_date < today {
        params.current_block_height.saturating_sub(block_delta)
    } else {
        params.current_block_height + block_delta
    }
}

/// Expected number of blocks a live ticket waits before it is called to vote.
///
/// Sums `i * (n-1)^(i-1) / n^i` over `i = 0..=expiry` in log space. The
/// `i = 0` term contributes nothing.
pub fn mean_voting_blocks(pool_size: u64, ticket_expiry_blocks: u64) -> f64 {
    let n = pool_size as f64;
    let ln_pool = n.ln();
    let ln_pool_less_one = (n - 1.0).ln();

    (1..=ticket_expiry_blocks)
        .map(|i| {
            let i = i as f64;
            (i.ln() + (i - 1.0) * ln_pool_less_one - i * ln_pool).exp()
        })
        .sum()
}

/// Ticket price implied by the emission model at `block_height`
pub fn theoretical_ticket_price(
    emission: &EmissionSchedule,
    params: &SimulationParameters,
    block_height: u64,
    coin_adjustment_factor: f64,
    stake_percent: f64,
    mean_voting_blocks: f64,
) -> f64 {
    let projected_circulating =
        emission.max_coin_supply_at(block_height as f64) * coin_adjustment_factor * stake_percent;
    let pool_size_blocks = (mean_voting_blocks
        + params.ticket_maturity_blocks as f64
        + params.coinbase_maturity_blocks as f64)
        * params.tickets_per_block as f64;

    projected_circulating / pool_size_blocks
}

/// Block heights at which a ticket bought at the cursor resolves, for every
/// purchase cycle that starts inside the window.
pub fn maturity_checkpoints(
    starting_height: u64,
    number_of_blocks: f64,
    params: &SimulationParameters,
    mean_voting_blocks: f64,
) -> Vec<u64> {
    let window_end = starting_height as f64 + number_of_blocks;
    let vote_hop = params.ticket_maturity_blocks + mean_voting_blocks.floor() as u64;
    let coinbase_hop = params.coinbase_maturity_blocks + 1;

    let mut checkpoints = Vec::new();
    let mut cursor = starting_height;
    while (cursor as f64) < window_end {
        cursor += vote_hop;
        checkpoints.push(cursor);
        cursor += coinbase_hop;
    }
    checkpoints
}

/// Theoretical price model anchored to the observed supply and ticket price.
///
/// Both adjustment factors are fixed at calibration and held for the whole run.
#[derive(Debug, Clone)]
pub struct TicketPriceModel<'a> {
    emission: &'a EmissionSchedule,
    params: &'a SimulationParameters,
    pub coin_adjustment_factor: f64,
    pub stake_percent: f64,
    pub mean_voting_blocks: f64,
    pub ticket_adjustment_factor: f64,
}

impl<'a> TicketPriceModel<'a> {
    pub fn calibrate(
        emission: &'a EmissionSchedule,
        params: &'a SimulationParameters,
        starting_height: u64,
    ) -> Result<Self> {
        let max_supply_at_start = emission.max_coin_supply_at(starting_height as f64);
        let coin_adjustment_factor = params.current_coin_supply / max_supply_at_start;
        if !(coin_adjustment_factor.is_finite() && coin_adjustment_factor > 0.0) {
            return Err(ProjectorError::Parameters(format!(
                "Emission model gives unusable supply {} at height {}",
                max_supply_at_start, starting_height
            )));
        }

        let stake_percent = params.stake_percent();
        let mean_voting_blocks = mean_voting_blocks(params.pool_size, params.ticket_expiry_blocks);

        let theoretical_now = theoretical_ticket_price(
            emission,
            params,
            params.current_block_height,
            coin_adjustment_factor,
            stake_percent,
            mean_voting_blocks,
        );
        let ticket_adjustment_factor = params.actual_ticket_price / theoretical_now;
        if !(ticket_adjustment_factor.is_finite() && ticket_adjustment_factor > 0.0) {
            return Err(ProjectorError::Parameters(format!(
                "Theoretical ticket price {} cannot be anchored to observed price {}",
                theoretical_now, params.actual_ticket_price
            )));
        }

        debug!(
            "Calibrated price model: coin factor {:.6}, ticket factor {:.6}, mean voting blocks {:.2}",
            coin_adjustment_factor, ticket_adjustment_factor, mean_voting_blocks
        );

        Ok(TicketPriceModel {
            emission,
            params,
            coin_adjustment_factor,
            stake_percent,
            mean_voting_blocks,
            ticket_adjustment_factor,
        })
    }

    pub fn theoretical_price(&self, block_height: u64) -> f64 {
        theoretical_ticket_price(
            self.emission,
            self.params,
            block_height,
            self.coin_adjustment_factor,
            self.stake_percent,
            self.mean_voting_blocks,
        )
    }

    /// Simulated market price at `block_height`
    pub fn adjusted_price(&self, block_height: u64) -> f64 {
        self.theoretical_price(block_height) * self.ticket_adjustment_factor
    }

    /// Adjusted price at `block_height`, or an error once the emission
    /// polynomial has left the range where it yields a positive supply.
    pub fn checked_price(&self, block_height: u64) -> Result<f64> {
        let supply = self.emission.max_coin_supply_at(block_height as f64);
        let price = self.adjusted_price(block_height);
        if !(supply.is_finite() && supply > 0.0 && price.is_finite() && price > 0.0) {
            return Err(ProjectorError::Parameters(format!(
                "Emission model gives unusable ticket price {} (supply {}) at height {}",
                price, supply, block_height
            )));
        }
        Ok(price)
    }
}
