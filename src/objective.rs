//! Differentiable training objectives.
//!
//! Optimizers only see the `Objective` trait: a scalar function of a flat parameter
//! vector and an iteration index, plus its gradient. How the gradient is obtained
//! (here: hand-derived backprop in `Mlp::logprob_gradient`) stays behind the trait.

use std::ops::Range;

use crate::{Dataset, Error, Likelihood, Matrix, Mlp, Result};

/// A scalar objective to minimize over a flat parameter vector.
pub trait Objective {
    /// Length of the parameter vector.
    fn num_params(&self) -> usize;

    /// Objective value at `params` for iteration `iter`.
    fn value(&self, params: &[f32], iter: usize) -> Result<f32>;

    /// Writes the gradient at `params` into `grad` and returns the objective value.
    fn gradient(&self, params: &[f32], iter: usize, grad: &mut [f32]) -> Result<f32>;
}

/// L1/L2 penalty strengths added to the negative log-likelihood.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Regularization {
    pub l1: f32,
    pub l2: f32,
}

impl Regularization {
    pub fn validate(self) -> Result<()> {
        for (name, v) in [("l1_lambda", self.l1), ("l2_lambda", self.l2)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        Ok(())
    }

    fn penalty(self, params: &[f32]) -> f32 {
        if self.l1 == 0.0 && self.l2 == 0.0 {
            return 0.0;
        }
        let mut sum_sq = 0.0_f32;
        let mut sum_abs = 0.0_f32;
        for &w in params {
            sum_sq = w.mul_add(w, sum_sq);
            sum_abs += w.abs();
        }
        self.l2 * sum_sq + self.l1 * sum_abs
    }

    fn add_gradient(self, params: &[f32], grad: &mut [f32]) {
        if self.l1 == 0.0 && self.l2 == 0.0 {
            return;
        }
        for (g, &w) in grad.iter_mut().zip(params) {
            // Subgradient 0 at w == 0.
            let sign = if w > 0.0 {
                1.0
            } else if w < 0.0 {
                -1.0
            } else {
                0.0
            };
            *g += 2.0 * self.l2 * w + self.l1 * sign;
        }
    }
}

/// Negative log-likelihood of one mini-batch plus L1/L2 penalties.
///
/// Iteration `iter` uses batch `iter mod num_batches`; the last batch may be short.
#[derive(Debug, Clone)]
pub struct MiniBatchObjective<'a> {
    mlp: &'a Mlp,
    batches: Vec<(Matrix, Matrix)>,
    likelihood: Likelihood,
    regularization: Regularization,
}

impl<'a> MiniBatchObjective<'a> {
    pub fn new(
        mlp: &'a Mlp,
        train: &Dataset,
        batch_size: usize,
        likelihood: Likelihood,
        regularization: Regularization,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if train.is_empty() {
            return Err(Error::InvalidData(
                "train dataset must not be empty".to_owned(),
            ));
        }
        likelihood.validate()?;
        regularization.validate()?;

        let num_batches = train.len().div_ceil(batch_size);
        let batches = (0..num_batches)
            .map(|idx| {
                let range = batch_range(idx, batch_size, train.len());
                (
                    train.inputs().slice_rows(range.clone()),
                    train.targets().slice_rows(range),
                )
            })
            .collect();

        Ok(Self {
            mlp,
            batches,
            likelihood,
            regularization,
        })
    }

    #[inline]
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    #[inline]
    fn batch(&self, iter: usize) -> &(Matrix, Matrix) {
        &self.batches[iter % self.batches.len()]
    }
}

/// Rows covered by batch `idx`.
pub fn batch_range(idx: usize, batch_size: usize, len: usize) -> Range<usize> {
    let start = (idx * batch_size).min(len);
    start..((idx + 1) * batch_size).min(len)
}

impl Objective for MiniBatchObjective<'_> {
    fn num_params(&self) -> usize {
        self.mlp.num_weights()
    }

    fn value(&self, params: &[f32], iter: usize) -> Result<f32> {
        let (inputs, targets) = self.batch(iter);
        let logprob = self.mlp.logprob(params, inputs, targets, self.likelihood)?;
        Ok(-logprob + self.regularization.penalty(params))
    }

    fn gradient(&self, params: &[f32], iter: usize, grad: &mut [f32]) -> Result<f32> {
        let (inputs, targets) = self.batch(iter);
        let logprob = self
            .mlp
            .logprob_gradient(params, inputs, targets, self.likelihood, grad)?;
        for g in grad.iter_mut() {
            *g = -*g;
        }
        self.regularization.add_gradient(params, grad);
        Ok(-logprob + self.regularization.penalty(params))
    }
}
