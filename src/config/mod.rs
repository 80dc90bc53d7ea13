//! Query parameters.
//!
//! A [`QueryConfig`] can be deserialized, built in code, or read from the
//! environment (optionally through a `.env` file) with [`QueryConfig::from_env`]:
//!
//! ```bash
//! TRAJSIM_DELTA=50
//! TRAJSIM_SECTION_LENGTH=10
//! TRAJSIM_TIMEOUT_SECS=10
//! TRAJSIM_MODE=road-continuous
//! ```

use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use strum::{EnumIter, EnumString};

use crate::error::Error;


/// Selects the spatial model and whether the query is re-evaluated
/// continuously as the vehicle advances.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum QueryMode {
    EuclideanSimple,
    EuclideanContinuous,
    RoadSimple,
    #[default]
    RoadContinuous,
}

impl QueryMode {
    /// Resolves the numeric selector used by the flat-file tooling,
    /// `1` through `4` in declaration order.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(QueryMode::EuclideanSimple),
            2 => Some(QueryMode::EuclideanContinuous),
            3 => Some(QueryMode::RoadSimple),
            4 => Some(QueryMode::RoadContinuous),
            _ => None,
        }
    }

    pub fn is_road(&self) -> bool {
        matches!(self, QueryMode::RoadSimple | QueryMode::RoadContinuous)
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, QueryMode::EuclideanContinuous | QueryMode::RoadContinuous)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Similarity threshold, in metres.
    pub delta: f64,
    /// Discretization step, in metres.
    pub section_length: f64,
    /// Wall-clock budget of a single branch and bound search.
    pub timeout: Duration,
    /// Loop-tolerant searches discard paths reaching this many edges.
    pub loop_path_cap: usize,
    pub mode: QueryMode,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            delta: 50.0,
            section_length: 10.0,
            timeout: Duration::from_secs(10),
            loop_path_cap: 4990,
            mode: QueryMode::default(),
        }
    }
}

impl QueryConfig {
    pub fn with_delta(self, delta: f64) -> Self {
        QueryConfig { delta, ..self }
    }

    pub fn with_section_length(self, section_length: f64) -> Self {
        QueryConfig {
            section_length,
            ..self
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        QueryConfig { timeout, ..self }
    }

    pub fn with_mode(self, mode: QueryMode) -> Self {
        QueryConfig { mode, ..self }
    }

    /// Reads the configuration from the environment, loading a `.env`
    /// file first if one is present. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, Error> {
        if let Err(err) = dotenv::dotenv() {
            debug!("No .env file loaded: {err}");
        }

        let mut config = QueryConfig::default();

        if let Some(delta) = read::<f64>("TRAJSIM_DELTA")? {
            config.delta = delta;
        }

        if let Some(section_length) = read::<f64>("TRAJSIM_SECTION_LENGTH")? {
            config.section_length = section_length;
        }

        if let Some(seconds) = read::<u64>("TRAJSIM_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(seconds);
        }

        if let Ok(mode) = env::var("TRAJSIM_MODE") {
            config.mode = match mode.parse::<u8>() {
                Ok(code) => QueryMode::from_code(code),
                Err(_) => QueryMode::from_str(&mode).ok(),
            }
            .ok_or_else(|| Error::Config(format!("unknown query mode `{mode}`")))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the parameters describe a meaningful query.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(Error::Config(format!("delta must be positive, got {}", self.delta)));
        }

        if !(self.section_length.is_finite() && self.section_length > 0.0) {
            return Err(Error::Config(format!(
                "section length must be positive, got {}",
                self.section_length
            )));
        }

        if self.loop_path_cap == 0 {
            return Err(Error::Config("loop path cap must be at least one edge".to_string()));
        }

        Ok(())
    }
}

fn read<T: FromStr>(key: &str) -> Result<Option<T>, Error> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} is not valid: `{value}`"))),
        Err(_) => Ok(None),
    }
}
