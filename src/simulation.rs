//! The projection loop itself. Everything here is synchronous; the only
//! external input is the reward map fetched ahead of time.

use log::{debug, warn};

use crate::error::Result;
use crate::ledger::{
    normalize_to_window, propagate_negative_rewards, SimulationRequest, SimulationResult,
    SimulationStep,
};
use crate::model::{compute_starting_height, maturity_checkpoints, TicketPriceModel};
use crate::oracle::RewardMap;
use crate::params::{EmissionSchedule, SimulationParameters};

/// A validated request with everything the loop needs except rewards
#[derive(Debug, Clone)]
pub struct SimulationPlan<'a> {
    pub request: SimulationRequest,
    pub params: &'a SimulationParameters,
    pub model: TicketPriceModel<'a>,
    pub starting_height: u64,
    pub requested_days: i64,
    pub blocks_per_day: f64,
    pub number_of_blocks: f64,
}

impl<'a> SimulationPlan<'a> {
    pub fn prepare(
        request: &SimulationRequest,
        params: &'a SimulationParameters,
        emission: &'a EmissionSchedule,
    ) -> Result<Self> {
        request.validate(params.reward_period_days)?;
        params.validate()?;

        let requested_days = request.requested_days();
        let blocks_per_day = params.blocks_per_day();
        let number_of_blocks = requested_days as f64 * blocks_per_day;
        let starting_height = compute_starting_height(request.start_date, params);
        let model = TicketPriceModel::calibrate(emission, params, starting_height)?;

        debug!(
            "Prepared {} day projection from height {} over {} blocks",
            requested_days, starting_height, number_of_blocks
        );

        let plan = SimulationPlan {
            request: request.clone(),
            params,
            model,
            starting_height,
            requested_days,
            blocks_per_day,
            number_of_blocks,
        };
        plan.check_prices_in_window()?;
        Ok(plan)
    }

    /// Every height the loop prices must sit where the emission model still
    /// gives a positive supply.
    fn check_prices_in_window(&self) -> Result<()> {
        let window_end = self.starting_height as f64 + self.number_of_blocks;
        let coinbase_hop = self.params.coinbase_maturity_blocks + 1;

        self.model.checked_price(self.starting_height)?;
        for checkpoint in self.checkpoints() {
            self.model.checked_price(checkpoint)?;
            let next_purchase = checkpoint + coinbase_hop;
            if (next_purchase as f64) < window_end {
                self.model.checked_price(next_purchase)?;
            }
        }
        Ok(())
    }

    /// Heights whose per-vote reward the run will look up
    pub fn checkpoints(&self) -> Vec<u64> {
        maturity_checkpoints(
            self.starting_height,
            self.number_of_blocks,
            self.params,
            self.model.mean_voting_blocks,
        )
    }

    /// Buy as many tickets as the balance allows, reinvest every reward, and
    /// repeat until the window is covered.
    pub fn run(&self, rewards: &RewardMap) -> SimulationResult {
        let stake_amount = self.request.stake_amount;
        let window_end = self.starting_height as f64 + self.number_of_blocks;
        let vote_hop = self.params.ticket_maturity_blocks + self.model.mean_voting_blocks.floor() as u64;
        let coinbase_hop = self.params.coinbase_maturity_blocks + 1;

        let mut cursor = self.starting_height;
        let mut balance = stake_amount;
        let mut ledger = vec![SimulationStep::seed(
            cursor,
            balance,
            self.model.adjusted_price(cursor),
        )];
        let mut last_cycle_credited = true;
        let mut last_checkpoint = cursor;
        let mut last_purchase = 0.0;

        while (cursor as f64) < window_end {
            let ticket_price = self.model.adjusted_price(cursor);
            let tickets_purchased = (balance / ticket_price).floor() as u64;
            last_purchase = ticket_price * tickets_purchased as f64;

            // The purchase belongs to the row whose balance paid for it
            if let Some(previous) = ledger.last_mut() {
                previous.ticket_price = ticket_price;
                previous.tickets_purchased = tickets_purchased;
            }

            cursor += vote_hop;
            last_checkpoint = cursor;

            let reward_per_vote = match rewards.get(&cursor) {
                Some(reward) => *reward,
                None => {
                    warn!("No reward data at checkpoint {}, skipping credit", cursor);
                    last_cycle_credited = false;
                    cursor += coinbase_hop;
                    continue;
                }
            };

            let reward = reward_per_vote * tickets_purchased as f64;
            balance += reward;
            ledger.push(self.next_step(&ledger, cursor, balance, ticket_price, reward, last_purchase));
            last_cycle_credited = true;

            cursor += coinbase_hop;
        }

        if !last_cycle_credited {
            let ticket_price = self.model.adjusted_price(last_checkpoint);
            ledger.push(self.next_step(&ledger, last_checkpoint, balance, ticket_price, 0.0, last_purchase));
        }

        let simulation_reward = (balance - stake_amount) / stake_amount * 100.0;
        let excess_blocks = (cursor - self.starting_height) as f64;
        let roi_percent = normalize_to_window(
            &mut ledger,
            stake_amount,
            simulation_reward,
            self.number_of_blocks,
            excess_blocks,
            self.requested_days,
        );
        propagate_negative_rewards(&mut ledger);

        debug!(
            "Raw return {:.4}% over {} blocks, normalized to {:.4}%",
            simulation_reward, excess_blocks, roi_percent
        );

        SimulationResult::new(ledger, roi_percent, stake_amount)
    }

    fn next_step(
        &self,
        ledger: &[SimulationStep],
        block: u64,
        balance: f64,
        ticket_price: f64,
        reward: f64,
        returned_fund: f64,
    ) -> SimulationStep {
        let (previous_block, previous_day) = ledger
            .last()
            .map(|step| (step.simulated_block, step.simulated_day))
            .unwrap_or((self.starting_height, 0.0));
        let blocks_passed = block.saturating_sub(previous_block) as f64;

        SimulationStep {
            simulated_block: block,
            simulated_day: previous_day + (blocks_passed / self.blocks_per_day).floor(),
            balance,
            ticket_price,
            reward,
            returned_fund: Some(returned_fund),
            tickets_purchased: 0,
        }
    }
}
