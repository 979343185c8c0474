//! Training configuration.
//!
//! Load from the environment with [`from_env`] and check with
//! [`TrainConfig::validate`] before use.

mod builder;
mod constants;

use std::path::PathBuf;

use constants::{
    DEFAULT_HIDDEN_SIZES, DEFAULT_LEARNING_RATE, DEFAULT_LOSS_LOG_EVERY, DEFAULT_NUM_STEPS,
    DEFAULT_SEED,
};

pub use builder::{env_key, env_list, env_parsed, env_string, from_env};

use crate::error::ConfigError;

/// Settings for [`fit`](crate::train::fit) and the demo binary.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    /// Seed for parameter initialisation.
    pub seed: u64,
    pub learning_rate: f64,
    pub num_steps: usize,
    /// Log the loss every this many steps.
    pub loss_log_every: usize,
    /// Widths of the hidden layers. A single-output layer is always appended.
    pub hidden_sizes: Vec<usize>,
    /// Where the demo writes its Graphviz output, if anywhere.
    pub dot_path: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            learning_rate: DEFAULT_LEARNING_RATE,
            num_steps: DEFAULT_NUM_STEPS,
            loss_log_every: DEFAULT_LOSS_LOG_EVERY,
            hidden_sizes: DEFAULT_HIDDEN_SIZES.to_vec(),
            dot_path: None,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::Validation(format!(
                "learning_rate must be finite and positive, got {}",
                self.learning_rate
            )));
        }
        if self.num_steps == 0 {
            return Err(ConfigError::Validation(
                "num_steps must be greater than 0".to_string(),
            ));
        }
        if self.loss_log_every == 0 {
            return Err(ConfigError::Validation(
                "loss_log_every must be greater than 0".to_string(),
            ));
        }
        if let Some(position) = self.hidden_sizes.iter().position(|&size| size == 0) {
            return Err(ConfigError::Validation(format!(
                "hidden layer {position} has zero width"
            )));
        }
        Ok(())
    }

    /// Layer widths of the model: the hidden layers followed by one output.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = self.hidden_sizes.clone();
        sizes.push(1);
        sizes
    }
}
