//! Full-batch training of an [`Mlp`] with [`Sgd`] on a small dataset.

use log::{info, warn};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::TrainConfig;
use crate::error::TrainError;
use crate::graph::Graph;
use crate::nn::{squared_error, Mlp, Module};
use crate::optim::Sgd;
use crate::scalar::Scalar;

/// Outcome of [`fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Loss of the freshly initialised model.
    pub initial_loss: f64,
    /// Loss of the model after the last update.
    pub final_loss: f64,
    /// Output of the trained model for each input row.
    pub predictions: Vec<f64>,
    pub parameter_count: usize,
}

/// Trains a `tanh` MLP with one output to map each row of `inputs` to the
/// matching entry of `targets`, minimising the summed squared error.
///
/// Every step runs a forward pass over all rows, zeroes the parameter
/// gradients, back-propagates from the loss and applies one SGD update. The
/// nodes of that step are then discarded so the graph only ever holds the
/// parameters plus one forward pass.
pub fn fit(
    config: &TrainConfig,
    inputs: &Array2<f64>,
    targets: &Array1<f64>,
) -> Result<TrainReport, TrainError> {
    config.validate()?;
    if inputs.nrows() != targets.len() {
        return Err(TrainError::DatasetMismatch {
            rows: inputs.nrows(),
            targets: targets.len(),
        });
    }
    if inputs.nrows() == 0 {
        return Err(TrainError::EmptyDataset);
    }

    let samples: Vec<Vec<f64>> = inputs.outer_iter().map(|row| row.to_vec()).collect();
    let targets = targets.to_vec();

    let graph = Graph::new();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let model = Mlp::new(&graph, inputs.ncols(), &config.layer_sizes(), &mut rng);
    let parameters = model.parameters();
    let optimizer = Sgd::new(config.learning_rate);
    let checkpoint = graph.checkpoint();
    info!(
        "training {} parameters on {} samples for {} steps",
        parameters.len(),
        samples.len(),
        config.num_steps
    );

    let mut initial_loss = None;
    let mut diverged = false;
    for step in 0..config.num_steps {
        let loss = squared_error(&predict(&model, &samples), &targets);
        let loss_value = loss.value();
        initial_loss.get_or_insert(loss_value);
        if step % config.loss_log_every == 0 {
            info!("step {step}: loss {loss_value:.6}");
        }
        if !loss_value.is_finite() && !diverged {
            warn!("loss became non-finite ({loss_value}) at step {step}");
            diverged = true;
        }

        model.reset_gradients();
        loss.backward();
        optimizer.step(&parameters);
        graph.rewind(checkpoint);
    }

    let outputs = predict(&model, &samples);
    let final_loss = squared_error(&outputs, &targets).value();
    let predictions = outputs.iter().map(Scalar::value).collect();
    info!("finished training: loss {final_loss:.6}");

    Ok(TrainReport {
        // num_steps > 0 was validated
        initial_loss: initial_loss.unwrap_or(final_loss),
        final_loss,
        predictions,
        parameter_count: parameters.len(),
    })
}

// First output of the model for every sample.
fn predict<'g>(model: &Mlp<'g>, samples: &[Vec<f64>]) -> Vec<Scalar<'g>> {
    samples
        .iter()
        .map(|sample| model.forward(sample.as_slice())[0])
        .collect()
}
