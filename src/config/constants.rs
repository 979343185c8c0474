//! Default values and environment variable names for the training config.

/// Prefix shared by every variable, e.g. `SCALARGRAD_SEED`.
pub(crate) const ENV_PREFIX: &str = "SCALARGRAD_";

pub(crate) const ENV_SEED: &str = "SEED";
pub(crate) const ENV_LEARNING_RATE: &str = "LEARNING_RATE";
pub(crate) const ENV_NUM_STEPS: &str = "NUM_STEPS";
pub(crate) const ENV_LOSS_LOG_EVERY: &str = "LOSS_LOG_EVERY";
pub(crate) const ENV_HIDDEN_SIZES: &str = "HIDDEN_SIZES";
pub(crate) const ENV_DOT_PATH: &str = "DOT_PATH";

pub(crate) const DEFAULT_SEED: u64 = 42;
pub(crate) const DEFAULT_LEARNING_RATE: f64 = 0.1;
pub(crate) const DEFAULT_NUM_STEPS: usize = 10_000;
pub(crate) const DEFAULT_LOSS_LOG_EVERY: usize = 1_000;
pub(crate) const DEFAULT_HIDDEN_SIZES: [usize; 2] = [4, 4];
