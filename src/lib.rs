//! A word-vector lemmatizer trained as a small MLP.
//!
//! The crate has two layers:
//!
//! - A generic regression trainer: an [`Mlp`] over a single flat weight vector,
//!   scored by a [`Likelihood`] (mean cosine similarity or a Gaussian/MSE variant),
//!   optimized with mini-batch Adam by [`train_mlp`].
//! - The [`lemmatizer`] pipeline: sentences become `[embedding | POS index]` feature
//!   rows whose targets are the embeddings of their dictionary lemmas; a trained
//!   network's predictions are decoded back to words by nearest-neighbor search.
//!
//! # Panics vs `Result`
//!
//! Public APIs validate shapes and configuration and return [`Result`]. Internal
//! kernels (`matmul`, activation slices) only `debug_assert!` their contracts.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - [`Matrix`] is row-major; one row per sample.
//! - Weights are a flat `Vec<f32>`, layer by layer `W` (in x out, row-major) then `b`.
//! - [`SentenceTensor`] is `(sentences, timesteps, dim)`, zero padded.
//!
//! # Quick start
//!
//! ```rust
//! use neural_lemmatizer::{Matrix, Split, TrainConfig, train_mlp};
//!
//! # fn main() -> neural_lemmatizer::Result<()> {
//! let xs: Vec<Vec<f32>> = (0..20).map(|i| vec![(i as f32).sin(), (i as f32).cos()]).collect();
//! let ys: Vec<Vec<f32>> = xs.iter().map(|x| vec![x[0] + 1.0, x[1] - 1.0]).collect();
//!
//! let cfg = TrainConfig {
//!     hidden_sizes: vec![4],
//!     batch_size: 4,
//!     num_epochs: 2,
//!     split: Split::Seeded(0),
//!     seed: Some(0),
//!     verbose: false,
//!     ..TrainConfig::default()
//! };
//! let trained = train_mlp(&Matrix::from_rows(&xs)?, &Matrix::from_rows(&ys)?, &cfg, None)?;
//! assert_eq!(trained.report.epochs.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod data;
pub mod error;
pub mod lemmatizer;
pub mod likelihood;
pub(crate) mod matmul;
pub mod matrix;
pub mod metrics;
pub mod mlp;
pub mod objective;
pub mod optim;
pub mod serde_model;
pub mod train;

pub use activation::Activation;
pub use data::{Dataset, SentenceTensor, Split};
pub use error::{Error, Result};
pub use likelihood::Likelihood;
pub use matrix::Matrix;
pub use metrics::{ZeroNorm, cms, cosine_similarity, mat_cosine_dist, rms};
pub use mlp::{LayerParams, Mlp};
pub use objective::{MiniBatchObjective, Objective, Regularization};
pub use optim::{Optimizer, OptimizerState, minimize};
pub use serde_model::SavedWeights;
pub use train::{
    EpochReport, FitReport, ProgressTable, TrainConfig, TrainedMlp, evaluate, train_mlp,
    train_mlp_split,
};
