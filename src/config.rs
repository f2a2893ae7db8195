use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectorError, Result};
use crate::oracle::OracleConfig;
use crate::params::{EmissionSchedule, SimulationParameters};

/// Environment variable that overrides `oracle.base_url`
pub const ORACLE_URL_ENV: &str = "STAKE_PROJECTOR_ORACLE_URL";

/// Everything the projector needs for one session, as read from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectorConfig {
    pub network: SimulationParameters,
    #[serde(default)]
    pub emission: EmissionSchedule,
    #[serde(default)]
    pub oracle: OracleConfig,
}

impl ProjectorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ProjectorError::Config(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let config: ProjectorConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;

        info!("Loaded projector config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: ProjectorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;

        if self.oracle.base_url.trim().is_empty() {
            return Err(ProjectorError::Config("Oracle base URL must not be empty".to_string()));
        }
        if self.oracle.cache_ttl_secs < 0 {
            return Err(ProjectorError::Config(format!(
                "Cache TTL must not be negative, got {}",
                self.oracle.cache_ttl_secs
            )));
        }

        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(ORACLE_URL_ENV) {
            if !url.trim().is_empty() {
                info!("Using oracle URL from {}", ORACLE_URL_ENV);
                self.oracle.base_url = url;
            }
        }
    }
}
