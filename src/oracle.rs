//! Reward-per-vote lookups for future block heights.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{ProjectorError, Result};

/// Reward payable per vote, keyed by block height
pub type RewardMap = BTreeMap<u64, f64>;

/// Comma-separated height list used as the oracle query
pub fn join_heights(heights: &[u64]) -> String {
    heights
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Batch source of per-vote subsidies. Heights the source cannot price are
/// left out of the returned map.
#[allow(async_fn_in_trait)]
pub trait RewardOracle {
    /// Key identifying the query for `heights`, used for response caching
    fn query_key(&self, heights: &[u64]) -> String {
        join_heights(heights)
    }

    async fn fetch_rewards(&self, heights: &[u64]) -> Result<RewardMap>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub base_url: String,
    pub reward_path: String,  // Appended to base_url, followed by the height list
    pub timeout_secs: u64,
    pub cache_ttl_secs: i64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            base_url: "https://explorer.dcrdata.org".to_string(),
            reward_path: "/api/block/rewards/".to_string(),
            timeout_secs: 30,
            cache_ttl_secs: 300,
        }
    }
}

/// Parse an oracle body of the form `{"<height>": <reward>, ...}`, keeping
/// only the heights that were asked for.
pub fn parse_reward_response(body: &str, requested: &[u64]) -> Result<RewardMap> {
    let raw: HashMap<String, f64> = serde_json::from_str(body)
        .map_err(|e| ProjectorError::OracleFetch(format!("Malformed reward response: {}", e)))?;

    let mut rewards = RewardMap::new();
    for (key, reward) in raw {
        let height = key.trim().parse::<u64>().map_err(|_| {
            ProjectorError::OracleFetch(format!("Non-numeric height in reward response: {:?}", key))
        })?;

        if requested.binary_search(&height).is_ok() {
            rewards.insert(height, reward);
        } else {
            debug!("Ignoring unrequested height {} in reward response", height);
        }
    }

    Ok(rewards)
}

/// Reward oracle backed by the explorer's HTTP API
#[derive(Clone)]
pub struct HttpRewardOracle {
    http: reqwest::Client,
    config: OracleConfig,
}

impl HttpRewardOracle {
    pub fn new(config: OracleConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProjectorError::OracleFetch(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpRewardOracle { http, config })
    }

    pub fn url_for(&self, heights: &[u64]) -> String {
        format!(
            "{}{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.reward_path,
            join_heights(heights)
        )
    }
}

impl RewardOracle for HttpRewardOracle {
    fn query_key(&self, heights: &[u64]) -> String {
        self.url_for(heights)
    }

    async fn fetch_rewards(&self, heights: &[u64]) -> Result<RewardMap> {
        let url = self.url_for(heights);
        info!("Requesting rewards for {} checkpoint(s)", heights.len());

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProjectorError::OracleFetch(format!("Reward request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProjectorError::OracleFetch(format!("Failed to read reward response: {}", e)))?;

        if !status.is_success() {
            return Err(ProjectorError::OracleFetch(format!(
                "Reward endpoint returned HTTP {} with body {}",
                status, body
            )));
        }

        let mut sorted = heights.to_vec();
        sorted.sort_unstable();
        parse_reward_response(&body, &sorted)
    }
}
