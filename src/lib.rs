//! Staking reward projection for ticket-based proof-of-stake networks.
//!
//! A [`StakeRewardProjector`] takes network parameters captured once per
//! session and, for each [`SimulationRequest`], simulates buying the maximum
//! number of tickets at every opportunity and reinvesting every vote reward.
//! Per-vote subsidies come from a [`RewardOracle`] in a single batch lookup.

pub mod cache;
pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod oracle;
pub mod params;
pub mod projector;
pub mod simulation;

pub use cache::ResponseCache;
pub use config::ProjectorConfig;
pub use error::{ProjectorError, Result, ValidationError};
pub use ledger::{SimulationRequest, SimulationResult, SimulationStep};
pub use model::{compute_starting_height, mean_voting_blocks, theoretical_ticket_price, TicketPriceModel};
pub use oracle::{HttpRewardOracle, OracleConfig, RewardMap, RewardOracle};
pub use params::{EmissionSchedule, SimulationParameters, DECRED_MAINNET_EMISSION};
pub use projector::{SimulationOutcome, StakeRewardProjector};
pub use simulation::SimulationPlan;
