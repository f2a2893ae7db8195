use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Utc};
use log::{debug, info};

use crate::cache::ResponseCache;
use crate::error::Result;
use crate::ledger::{SimulationRequest, SimulationResult};
use crate::oracle::{RewardMap, RewardOracle};
use crate::params::{EmissionSchedule, SimulationParameters};
use crate::simulation::SimulationPlan;

/// What became of a simulation run
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationOutcome {
    Completed(SimulationResult),
    /// A newer run was dispatched while this one waited on the oracle
    Superseded { request_id: u64, latest_id: u64 },
}

impl SimulationOutcome {
    pub fn into_result(self) -> Option<SimulationResult> {
        match self {
            SimulationOutcome::Completed(result) => Some(result),
            SimulationOutcome::Superseded { .. } => None,
        }
    }
}

/// Projects staking returns for one session's network parameters.
///
/// Each `simulate` call recomputes the whole ledger. Runs share only the
/// oracle response cache and the dispatch counter used to drop stale results.
pub struct StakeRewardProjector<O> {
    params: SimulationParameters,
    emission: EmissionSchedule,
    oracle: O,
    cache: Mutex<ResponseCache<RewardMap>>,
    request_counter: AtomicU64,
}

impl<O: RewardOracle> StakeRewardProjector<O> {
    pub fn new(
        params: SimulationParameters,
        emission: EmissionSchedule,
        oracle: O,
        cache_ttl: Duration,
    ) -> Result<Self> {
        params.validate()?;
        info!(
            "Projector ready at height {} (pool size {}, ticket price {:.4})",
            params.current_block_height, params.pool_size, params.actual_ticket_price
        );

        Ok(StakeRewardProjector {
            params,
            emission,
            oracle,
            cache: Mutex::new(ResponseCache::new(cache_ttl)),
            request_counter: AtomicU64::new(0),
        })
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Validate `request`, fetch the rewards it needs and run the projection.
    ///
    /// Invalid requests fail before anything is dispatched. If another run is
    /// dispatched while this one awaits the oracle, this one reports
    /// `Superseded`, whether its fetch succeeded or not.
    pub async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationOutcome> {
        let plan = SimulationPlan::prepare(request, &self.params, &self.emission)?;

        let request_id = self.request_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let checkpoints = plan.checkpoints();
        debug!(
            "Run {} needs rewards at {} checkpoint(s) from height {}",
            request_id,
            checkpoints.len(),
            plan.starting_height
        );

        let fetched = self.rewards_for(&checkpoints).await;

        let latest_id = self.request_counter.load(Ordering::SeqCst);
        if latest_id != request_id {
            info!("Discarding run {}, superseded by run {}", request_id, latest_id);
            return Ok(SimulationOutcome::Superseded {
                request_id,
                latest_id,
            });
        }

        let rewards = fetched?;
        let result = plan.run(&rewards);
        info!(
            "Run {}: {:.4}% ROI ({:.8} coins) over {} days",
            request_id, result.roi_percent, result.roi_amount, plan.requested_days
        );

        Ok(SimulationOutcome::Completed(result))
    }

    async fn rewards_for(&self, heights: &[u64]) -> Result<RewardMap> {
        let key = self.oracle.query_key(heights);

        if let Some(rewards) = self.lock_cache().get(&key, Utc::now()) {
            debug!("Reward cache hit for {} checkpoint(s)", heights.len());
            return Ok(rewards);
        }

        let rewards = self.oracle.fetch_rewards(heights).await?;
        self.lock_cache().insert(key, rewards.clone(), Utc::now());
        Ok(rewards)
    }

    fn lock_cache(&self) -> MutexGuard<'_, ResponseCache<RewardMap>> {
        // Entries are immutable once stored, so a poisoned guard is still usable
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
