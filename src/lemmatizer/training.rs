use log::info;

use super::{Window, window_featurizer};
use crate::metrics::ZeroNorm;
use crate::train::{TrainConfig, TrainedMlp, train_mlp};
use crate::{Error, Likelihood, Matrix, Result, SentenceTensor};

#[derive(Debug, Clone, PartialEq)]
pub struct LemmatizerConfig {
    pub window: Window,
    /// Drop rows whose target is all zeros (sentence padding) before training.
    pub drop_padding: bool,
    pub train: TrainConfig,
}

impl Default for LemmatizerConfig {
    fn default() -> Self {
        Self {
            window: Window::default(),
            drop_padding: true,
            train: TrainConfig {
                hidden_sizes: vec![1000],
                batch_size: 16,
                param_scale: 0.001,
                num_epochs: 100,
                step_size: 0.001,
                likelihood: Likelihood::Cosine {
                    zero_norm: ZeroNorm::Zero,
                },
                ..TrainConfig::default()
            },
        }
    }
}

impl LemmatizerConfig {
    pub fn validate(&self) -> Result<()> {
        self.train.validate()
    }
}

/// Train a network mapping (windowed) word features to lemma embeddings.
///
/// Both tensors are flattened to one row per timestep before windowing, so windows
/// may straddle sentence boundaries, exactly as the rows are laid out.
pub fn train_lemmatizer(
    features: &SentenceTensor,
    targets: &SentenceTensor,
    cfg: &LemmatizerConfig,
) -> Result<TrainedMlp> {
    cfg.validate()?;
    if features.sentences() != targets.sentences() || features.timesteps() != targets.timesteps() {
        return Err(Error::InvalidShape(format!(
            "feature tensor ({}, {}, _) does not match target tensor ({}, {}, _)",
            features.sentences(),
            features.timesteps(),
            targets.sentences(),
            targets.timesteps()
        )));
    }

    let (x, y) = window_featurizer(&features.flatten()?, &targets.flatten()?, cfg.window)?;
    let (x, y) = if cfg.drop_padding {
        drop_zero_targets(&x, &y)
    } else {
        (x, y)
    };
    if x.is_empty() {
        return Err(Error::InvalidData(
            "no training rows with a non-zero target".to_owned(),
        ));
    }

    info!(
        "training lemmatizer on {} rows of width {} (window {:?})",
        x.rows(),
        x.cols(),
        cfg.window
    );
    train_mlp(&x, &y, &cfg.train, None)
}

fn drop_zero_targets(x: &Matrix, y: &Matrix) -> (Matrix, Matrix) {
    let keep: Vec<usize> = y
        .iter_rows()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|&v| v != 0.0))
        .map(|(i, _)| i)
        .collect();
    if keep.len() < y.rows() {
        info!("dropped {} padding rows", y.rows() - keep.len());
    }
    (x.gather_rows(&keep), y.gather_rows(&keep))
}
