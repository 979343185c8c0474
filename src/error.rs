use thiserror::Error;

/// Errors produced when loading or validating a [`TrainConfig`](crate::config::TrainConfig).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Values are out of range, e.g. a non-positive learning rate.
    #[error("config validation: {0}")]
    Validation(String),

    /// A variable is set but cannot be read (e.g. it is not valid Unicode).
    #[error("env var {key}: {message}")]
    EnvVar { key: String, message: String },

    /// A variable is set but does not parse into the expected type.
    #[error("env var {key}={value:?}: {message}")]
    Parse {
        key: String,
        value: String,
        message: String,
    },
}

/// Errors returned by [`fit`](crate::train::fit) before any training happens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("dataset mismatch: {rows} input rows but {targets} targets")]
    DatasetMismatch { rows: usize, targets: usize },

    #[error("dataset has no samples")]
    EmptyDataset,
}

/// Top-level error of the `scalargrad` binary.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
