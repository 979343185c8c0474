use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use ndarray::array;
use scalargrad::{config, train, viz, Error, Graph};

// o = tanh(x1*w1 + x2*w2 + b) with the bias picked so that o is about 0.7071.
fn single_neuron_backward(dot_path: Option<&Path>) -> Result<(), Error> {
    let graph = Graph::new();
    let x1 = graph.leaf(2.0);
    let x2 = graph.leaf(0.0);
    let w1 = graph.leaf(-3.0);
    let w2 = graph.leaf(1.0);
    let b = graph.leaf(6.881_373_587_019_543);

    let x1w1 = x1 * w1;
    let x2w2 = x2 * w2;
    let n = x1w1 + x2w2 + b;
    let o = n.tanh();

    o.reset_gradients();
    o.backward();
    info!(
        "o = {:.4}; grads: x1 {:.4}, w1 {:.4}, x2 {:.4}, w2 {:.4}",
        o.value(),
        x1.gradient(),
        w1.gradient(),
        x2.gradient(),
        w2.gradient()
    );

    if let Some(path) = dot_path {
        let mut out = BufWriter::new(File::create(path)?);
        viz::write_dot(o, &mut out)?;
        out.flush()?;
        info!("wrote computation graph to {}", path.display());
    }
    Ok(())
}

fn train_tiny_dataset(config: &config::TrainConfig) -> Result<(), Error> {
    let xs = array![
        [2.0, 3.0, -1.0],
        [3.0, -1.0, 0.5],
        [0.5, 1.0, 1.0],
        [1.0, 1.0, -1.0]
    ];
    let ys = array![1.0, -1.0, -1.0, 1.0];

    let report = train::fit(config, &xs, &ys)?;
    info!(
        "loss {:.6} -> {:.6} over {} parameters",
        report.initial_loss, report.final_loss, report.parameter_count
    );
    for (prediction, target) in report.predictions.iter().zip(ys.iter()) {
        info!("target {target:+.1}: predicted {prediction:+.4}");
    }
    Ok(())
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::from_env()?;
    config.validate()?;

    single_neuron_backward(config.dot_path.as_deref())?;
    train_tiny_dataset(&config)
}
