//! Fixed-budget mini-batch training.
//!
//! `train_mlp` splits the data into train/holdout, builds an `Mlp` around the
//! caller's hidden sizes, and runs the optimizer for `num_epochs * num_batches`
//! iterations. At the end of every epoch it scores both splits and reports:
//!
//! ```text
//!      Epoch     |    Train cosine  |    Train log-like  |  Holdout cosine  |  Holdout log-like
//!               0|           0.41...|            0.88...|           0.39...|            0.93...
//! ```
//!
//! There is no early stopping; any NaN/Inf aborts the run with `Error::NonFinite`.

use log::{debug, info, warn};

use crate::objective::{MiniBatchObjective, Regularization};
use crate::optim::{self, Optimizer};
use crate::{Activation, Dataset, Error, Likelihood, Matrix, Mlp, Result, Split};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Hidden layer widths; input and output widths come from the data.
    pub hidden_sizes: Vec<usize>,
    pub batch_size: usize,
    /// Standard deviation of the random initial weights.
    pub param_scale: f32,
    pub num_epochs: usize,
    pub step_size: f32,
    pub l1_lambda: f32,
    pub l2_lambda: f32,
    pub nonlinearity: Activation,
    pub likelihood: Likelihood,
    pub optimizer: Optimizer,
    /// Fraction of rows used for training; the rest is holdout.
    pub train_frac: f64,
    pub split: Split,
    /// Seed for weight initialization; `None` uses OS entropy.
    pub seed: Option<u64>,
    /// Print the progress table to stdout.
    pub verbose: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: Vec::new(),
            batch_size: 256,
            param_scale: 0.1,
            num_epochs: 5,
            step_size: 0.001,
            l1_lambda: 0.0,
            l2_lambda: 0.0,
            nonlinearity: Activation::Tanh,
            likelihood: Likelihood::default(),
            optimizer: Optimizer::default(),
            train_frac: 0.8,
            split: Split::Random,
            seed: None,
            verbose: true,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if self.num_epochs == 0 {
            return Err(Error::InvalidConfig("num_epochs must be > 0".to_owned()));
        }
        if !(self.param_scale.is_finite() && self.param_scale >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "param_scale must be finite and >= 0, got {}",
                self.param_scale
            )));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "step_size must be finite and > 0, got {}",
                self.step_size
            )));
        }
        if self.hidden_sizes.contains(&0) {
            return Err(Error::InvalidConfig(
                "hidden layer sizes must be > 0".to_owned(),
            ));
        }
        self.regularization().validate()?;
        self.nonlinearity.validate()?;
        self.likelihood.validate()?;
        self.optimizer.validate()
    }

    fn regularization(&self) -> Regularization {
        Regularization {
            l1: self.l1_lambda,
            l2: self.l2_lambda,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    /// `cms` for the cosine likelihood, `rms` for the Gaussian one.
    pub train_accuracy: f32,
    /// Negative log-likelihood over the whole train split.
    pub train_loss: f32,
    /// `None` when the holdout split is empty.
    pub holdout_accuracy: Option<f32>,
    pub holdout_loss: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitReport {
    pub epochs: Vec<EpochReport>,
}

impl FitReport {
    pub fn last(&self) -> Option<&EpochReport> {
        self.epochs.last()
    }
}

/// A trained network together with its weights.
#[derive(Debug, Clone)]
pub struct TrainedMlp {
    pub mlp: Mlp,
    pub weights: Vec<f32>,
    pub report: FitReport,
}

impl TrainedMlp {
    pub fn predict(&self, inputs: &Matrix) -> Result<Matrix> {
        self.mlp.predict(&self.weights, inputs)
    }
}

/// Fixed-width stdout progress table.
#[derive(Debug, Clone, Copy)]
pub struct ProgressTable {
    accuracy_name: &'static str,
}

impl ProgressTable {
    pub fn new(likelihood: Likelihood) -> Self {
        Self {
            accuracy_name: likelihood.accuracy_name(),
        }
    }

    pub fn header(&self) -> String {
        let train = format!("Train {}", self.accuracy_name);
        let holdout = format!("Holdout {}", self.accuracy_name);
        format!(
            "{:^15}|{:^20}|{:^20}|{:^20}|{:^20}",
            "Epoch", train, "Train log-like", holdout, "Holdout log-like"
        )
    }

    pub fn row(&self, report: &EpochReport) -> String {
        format!(
            "{:15}|{:20}|{:20}|{:>20}|{:>20}",
            report.epoch,
            report.train_accuracy,
            report.train_loss,
            fmt_opt(report.holdout_accuracy),
            fmt_opt(report.holdout_loss),
        )
    }
}

fn fmt_opt(v: Option<f32>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_owned())
}

/// Accuracy and negative log-likelihood of `weights` over a whole dataset.
pub fn evaluate(mlp: &Mlp, weights: &[f32], data: &Dataset, likelihood: Likelihood) -> Result<(f32, f32)> {
    let preds = mlp.predict(weights, data.inputs())?;
    let accuracy = likelihood.accuracy(&preds, data.targets())?;
    let loss = -likelihood.log_likelihood(weights, &preds, data.targets())?;
    Ok((accuracy, loss))
}

/// Split `(inputs, targets)` into train/holdout and train a fresh network.
///
/// `init_weights` overrides the random initialization and must have length
/// `num_weights` of the resulting architecture.
pub fn train_mlp(
    inputs: &Matrix,
    targets: &Matrix,
    cfg: &TrainConfig,
    init_weights: Option<Vec<f32>>,
) -> Result<TrainedMlp> {
    cfg.validate()?;
    let data = Dataset::new(inputs.clone(), targets.clone())?;
    let (train, holdout) = data.split(cfg.train_frac, cfg.split)?;
    train_mlp_split(&train, &holdout, cfg, init_weights)
}

/// Train on an existing train/holdout split.
pub fn train_mlp_split(
    train: &Dataset,
    holdout: &Dataset,
    cfg: &TrainConfig,
    init_weights: Option<Vec<f32>>,
) -> Result<TrainedMlp> {
    cfg.validate()?;
    if train.is_empty() {
        return Err(Error::InvalidData(
            "train split must not be empty".to_owned(),
        ));
    }
    if !holdout.is_empty()
        && (holdout.input_dim() != train.input_dim() || holdout.target_dim() != train.target_dim())
    {
        return Err(Error::InvalidShape(format!(
            "holdout dims ({}, {}) do not match train dims ({}, {})",
            holdout.input_dim(),
            holdout.target_dim(),
            train.input_dim(),
            train.target_dim()
        )));
    }
    if holdout.is_empty() {
        warn!("holdout split is empty; holdout metrics will not be reported");
    }

    let mut layer_sizes = Vec::with_capacity(cfg.hidden_sizes.len() + 2);
    layer_sizes.push(train.input_dim());
    layer_sizes.extend_from_slice(&cfg.hidden_sizes);
    layer_sizes.push(train.target_dim());
    let mlp = Mlp::build(&layer_sizes, cfg.nonlinearity)?;

    let objective = MiniBatchObjective::new(
        &mlp,
        train,
        cfg.batch_size,
        cfg.likelihood,
        cfg.regularization(),
    )?;
    let num_batches = objective.num_batches();
    let num_iters = cfg.num_epochs.checked_mul(num_batches).ok_or_else(|| {
        Error::InvalidConfig(format!(
            "{} epochs of {num_batches} batches overflow the iteration count",
            cfg.num_epochs
        ))
    })?;

    let init = match init_weights {
        Some(w) => {
            mlp.check_weights(&w)?;
            w
        }
        None => match cfg.seed {
            Some(seed) => mlp.init_weights_with_seed(cfg.param_scale, seed),
            None => mlp.init_weights(cfg.param_scale, &mut rand::thread_rng()),
        },
    };

    debug!(
        "training layers {:?} ({} weights) on {} rows, {} holdout rows, {} batches/epoch",
        layer_sizes,
        mlp.num_weights(),
        train.len(),
        holdout.len(),
        num_batches
    );

    let table = ProgressTable::new(cfg.likelihood);
    if cfg.verbose {
        println!("{}", table.header());
    }

    let mut report = FitReport::default();
    let weights = optim::minimize(
        &objective,
        init,
        cfg.optimizer,
        cfg.step_size,
        num_iters,
        |weights, iter, _grad| {
            if (iter + 1) % num_batches != 0 {
                return Ok(());
            }
            let (train_accuracy, train_loss) = evaluate(&mlp, weights, train, cfg.likelihood)?;
            let (holdout_accuracy, holdout_loss) = if holdout.is_empty() {
                (None, None)
            } else {
                let (a, l) = evaluate(&mlp, weights, holdout, cfg.likelihood)?;
                (Some(a), Some(l))
            };
            let epoch = EpochReport {
                epoch: iter / num_batches,
                train_accuracy,
                train_loss,
                holdout_accuracy,
                holdout_loss,
            };

            info!(
                "epoch {}: train {} {:.6} loss {:.6}, holdout {} {:?} loss {:?}",
                epoch.epoch,
                table.accuracy_name,
                epoch.train_accuracy,
                epoch.train_loss,
                table.accuracy_name,
                epoch.holdout_accuracy,
                epoch.holdout_loss
            );
            if cfg.verbose {
                println!("{}", table.row(&epoch));
            }
            report.epochs.push(epoch);
            Ok(())
        },
    )?;

    Ok(TrainedMlp {
        mlp,
        weights,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ZeroNorm;

    fn linear_data(len: usize) -> (Matrix, Matrix) {
        let mut xs = Vec::with_capacity(len);
        let mut ys = Vec::with_capacity(len);
        for i in 0..len {
            let a = (i as f32 * 0.37).sin();
            let b = (i as f32 * 0.91).cos();
            xs.push(vec![a, b]);
            ys.push(vec![a + b, a - b]);
        }
        (Matrix::from_rows(&xs).unwrap(), Matrix::from_rows(&ys).unwrap())
    }

    fn quiet(cfg: TrainConfig) -> TrainConfig {
        TrainConfig {
            verbose: false,
            seed: Some(0),
            split: Split::Seeded(0),
            ..cfg
        }
    }

    #[test]
    fn reports_once_per_epoch() {
        let (x, y) = linear_data(40);
        let cfg = quiet(TrainConfig {
            hidden_sizes: vec![4],
            batch_size: 8,
            num_epochs: 3,
            step_size: 0.01,
            likelihood: Likelihood::Gaussian {
                weight_scale: 10.0,
                noise_scale: 1.0,
            },
            ..TrainConfig::default()
        });
        let trained = train_mlp(&x, &y, &cfg, None).unwrap();
        let epochs: Vec<usize> = trained.report.epochs.iter().map(|e| e.epoch).collect();
        assert_eq!(epochs, vec![0, 1, 2]);
        assert_eq!(trained.mlp.layer_sizes(), &[2, 4, 2]);
    }

    #[test]
    fn gaussian_training_reduces_rms() {
        let (x, y) = linear_data(64);
        let cfg = quiet(TrainConfig {
            batch_size: 16,
            num_epochs: 60,
            step_size: 0.05,
            likelihood: Likelihood::Gaussian {
                weight_scale: 10.0,
                noise_scale: 1.0,
            },
            ..TrainConfig::default()
        });
        let trained = train_mlp(&x, &y, &cfg, None).unwrap();
        let first = trained.report.epochs.first().unwrap().train_accuracy;
        let last = trained.report.last().unwrap().train_accuracy;
        assert!(last < first, "rms did not improve: {first} -> {last}");
    }

    #[test]
    fn init_weights_length_is_validated() {
        let (x, y) = linear_data(10);
        let cfg = quiet(TrainConfig::default());
        let err = train_mlp(&x, &y, &cfg, Some(vec![0.0; 5])).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn zero_epochs_is_a_config_error() {
        let (x, y) = linear_data(10);
        let cfg = quiet(TrainConfig {
            num_epochs: 0,
            ..TrainConfig::default()
        });
        assert!(matches!(
            train_mlp(&x, &y, &cfg, None),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn epoch_count_overflowing_the_iteration_count_is_a_config_error() {
        let (x, y) = linear_data(10);
        let cfg = quiet(TrainConfig {
            hidden_sizes: vec![],
            batch_size: 2,
            num_epochs: usize::MAX,
            ..TrainConfig::default()
        });
        assert!(matches!(
            train_mlp(&x, &y, &cfg, None),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn degenerate_targets_abort_training_under_reject_policy() {
        let x = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let y = Matrix::zeros(3, 2);
        let cfg = quiet(TrainConfig {
            batch_size: 3,
            train_frac: 1.0,
            likelihood: Likelihood::Cosine {
                zero_norm: ZeroNorm::Reject,
            },
            ..TrainConfig::default()
        });
        let err = train_mlp(&x, &y, &cfg, None).unwrap_err();
        assert!(matches!(err, Error::DegenerateVector { .. }));
    }

    #[test]
    fn table_rows_are_fixed_width() {
        let table = ProgressTable::new(Likelihood::default());
        let header = table.header();
        assert!(header.contains("Train cosine"));
        let row = table.row(&EpochReport {
            epoch: 3,
            train_accuracy: 0.5,
            train_loss: 0.7,
            holdout_accuracy: None,
            holdout_loss: None,
        });
        let widths: Vec<usize> = row.split('|').map(|c| c.chars().count()).collect();
        assert_eq!(widths, vec![15, 20, 20, 20, 20]);
        assert_eq!(header.chars().count(), row.chars().count());
    }
}
