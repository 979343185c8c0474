//! Build [`TrainConfig`] from environment variables.
//!
//! Every variable is optional; unset ones fall back to [`TrainConfig::default`].
//! A variable that is set but malformed is an error rather than a silent default.

use std::path::PathBuf;
use std::str::FromStr;

use super::constants::{
    ENV_DOT_PATH, ENV_HIDDEN_SIZES, ENV_LEARNING_RATE, ENV_LOSS_LOG_EVERY, ENV_NUM_STEPS,
    ENV_PREFIX, ENV_SEED,
};
use super::TrainConfig;
use crate::error::ConfigError;

/// Full variable name for a suffix, e.g. `SEED` -> `SCALARGRAD_SEED`.
pub fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

/// `Ok(None)` if `key` is unset.
pub fn env_string(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(s) => Ok(Some(s)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::EnvVar {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Reads `key` and parses it into `T`.
pub fn env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = env_string(key)? else {
        return Ok(None);
    };
    parse_value(key, &raw).map(Some)
}

/// Reads `key` as a comma-separated list, e.g. `4,4` or `8, 8, 4`.
pub fn env_list<T>(key: &str) -> Result<Option<Vec<T>>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = env_string(key)? else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(Some(Vec::new()));
    }
    raw.split(',')
        .map(|item| parse_value(key, item.trim()))
        .collect::<Result<Vec<T>, _>>()
        .map(Some)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Parse {
        key: key.to_string(),
        value: raw.to_string(),
        message: e.to_string(),
    })
}

/// Builds a [`TrainConfig`] from `SCALARGRAD_*` variables. Does not validate.
pub fn from_env() -> Result<TrainConfig, ConfigError> {
    let default = TrainConfig::default();
    Ok(TrainConfig {
        seed: env_parsed(&env_key(ENV_SEED))?.unwrap_or(default.seed),
        learning_rate: env_parsed(&env_key(ENV_LEARNING_RATE))?.unwrap_or(default.learning_rate),
        num_steps: env_parsed(&env_key(ENV_NUM_STEPS))?.unwrap_or(default.num_steps),
        loss_log_every: env_parsed(&env_key(ENV_LOSS_LOG_EVERY))?
            .unwrap_or(default.loss_log_every),
        hidden_sizes: env_list(&env_key(ENV_HIDDEN_SIZES))?.unwrap_or(default.hidden_sizes),
        dot_path: env_string(&env_key(ENV_DOT_PATH))?
            .map(PathBuf::from)
            .or(default.dot_path),
    })
}
