//! # scalargrad
//!
//! Reverse-mode automatic differentiation over individual `f64` values, and a
//! small `tanh` multi-layer perceptron built on top of it.
//!
//! Arithmetic on [`Scalar`] handles records a graph in a [`Graph`] arena;
//! [`Scalar::backward`] then fills in the gradient of that scalar with respect
//! to every node it was computed from.

pub mod config;
pub mod error;
pub mod graph;
pub mod nn;
pub mod optim;
pub mod scalar;
pub mod train;
pub mod viz;

pub use error::{ConfigError, Error, TrainError};
pub use graph::{Checkpoint, Graph, NodeId, Op};
pub use nn::{Layer, Mlp, Module, Neuron};
pub use scalar::{IntoScalar, Scalar};
