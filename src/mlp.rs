//! Multi-layer perceptron over a single flat weight vector.
//!
//! An `Mlp` only describes the architecture (layer sizes + nonlinearity). The weights
//! live in a separate `&[f32]` owned by the caller, laid out layer by layer:
//!
//! ```text
//! [ W_0 (m_0 × n_0, row-major) | b_0 (n_0) | W_1 (m_1 × n_1) | b_1 (n_1) | ... ]
//! ```
//!
//! so `num_weights = Σ (m + 1) · n` over consecutive `(m, n)` layer-size pairs.
//!
//! `predict` computes `X·W + b` for every layer and applies the nonlinearity between
//! layers; the last layer's output is returned without it.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

use crate::matmul::{matmul, matmul_a_bt, matmul_at_b_acc};
use crate::{Activation, Error, Likelihood, Matrix, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    layer_sizes: Vec<usize>,
    activation: Activation,
    /// Start of each layer's block in the flat weight vector.
    offsets: Vec<usize>,
    num_weights: usize,
}

/// Borrowed view of one layer's parameters inside a flat weight vector.
#[derive(Debug, Clone, Copy)]
pub struct LayerParams<'a> {
    pub in_dim: usize,
    pub out_dim: usize,
    /// Row-major `(in_dim, out_dim)`.
    pub weights: &'a [f32],
    pub biases: &'a [f32],
}

/// Forward-pass intermediates needed by backprop.
struct ForwardCache {
    /// Post-activation output of every hidden layer.
    hidden: Vec<Matrix>,
    output: Matrix,
}

impl Mlp {
    /// Define a network from its layer widths, input and output dimensions included.
    pub fn build(layer_sizes: &[usize], activation: Activation) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(Error::InvalidConfig(
                "layer sizes must include input and output dims".to_owned(),
            ));
        }
        if layer_sizes.contains(&0) {
            return Err(Error::InvalidConfig(
                "all layer sizes must be > 0".to_owned(),
            ));
        }
        activation.validate()?;

        let mut offsets = Vec::with_capacity(layer_sizes.len() - 1);
        let mut num_weights = 0_usize;
        for w in layer_sizes.windows(2) {
            offsets.push(num_weights);
            num_weights += (w[0] + 1) * w[1];
        }

        Ok(Self {
            layer_sizes: layer_sizes.to_vec(),
            activation,
            offsets,
            num_weights,
        })
    }

    #[inline]
    pub fn num_weights(&self) -> usize {
        self.num_weights
    }

    #[inline]
    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layer_sizes[0]
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    /// Random weights drawn from `param_scale * N(0, 1)`.
    pub fn init_weights<R: Rng + ?Sized>(&self, param_scale: f32, rng: &mut R) -> Vec<f32> {
        (0..self.num_weights)
            .map(|_| param_scale * Distribution::<f32>::sample(&StandardNormal, &mut *rng))
            .collect()
    }

    pub fn init_weights_with_seed(&self, param_scale: f32, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.init_weights(param_scale, &mut rng)
    }

    pub fn check_weights(&self, weights: &[f32]) -> Result<()> {
        if weights.len() != self.num_weights {
            return Err(Error::ShapeMismatch {
                what: "weight vector length",
                expected: self.num_weights,
                actual: weights.len(),
            });
        }
        Ok(())
    }

    fn check_inputs(&self, inputs: &Matrix) -> Result<()> {
        if inputs.cols() != self.input_dim() {
            return Err(Error::ShapeMismatch {
                what: "input columns",
                expected: self.input_dim(),
                actual: inputs.cols(),
            });
        }
        Ok(())
    }

    /// Split a flat weight vector into per-layer views.
    pub fn unpack<'a>(&self, weights: &'a [f32]) -> Result<Vec<LayerParams<'a>>> {
        self.check_weights(weights)?;
        Ok((0..self.num_layers())
            .map(|idx| self.layer_params(weights, idx))
            .collect())
    }

    #[inline]
    fn layer_params<'a>(&self, weights: &'a [f32], idx: usize) -> LayerParams<'a> {
        let in_dim = self.layer_sizes[idx];
        let out_dim = self.layer_sizes[idx + 1];
        let start = self.offsets[idx];
        let bias_start = start + in_dim * out_dim;
        LayerParams {
            in_dim,
            out_dim,
            weights: &weights[start..bias_start],
            biases: &weights[bias_start..bias_start + out_dim],
        }
    }

    /// Batched prediction: `(batch, input_dim) -> (batch, output_dim)`.
    pub fn predict(&self, weights: &[f32], inputs: &Matrix) -> Result<Matrix> {
        self.check_weights(weights)?;
        self.check_inputs(inputs)?;
        Ok(self.forward(weights, inputs).output)
    }

    /// Log-likelihood of `targets` under the network's predictions for `inputs`.
    pub fn logprob(
        &self,
        weights: &[f32],
        inputs: &Matrix,
        targets: &Matrix,
        likelihood: Likelihood,
    ) -> Result<f32> {
        let preds = self.predict(weights, inputs)?;
        likelihood.log_likelihood(weights, &preds, targets)
    }

    /// Gradient of `logprob` w.r.t. the weights.
    ///
    /// Overwrites `grad` (length `num_weights`) and returns the log-likelihood.
    pub fn logprob_gradient(
        &self,
        weights: &[f32],
        inputs: &Matrix,
        targets: &Matrix,
        likelihood: Likelihood,
        grad: &mut [f32],
    ) -> Result<f32> {
        self.check_weights(weights)?;
        self.check_inputs(inputs)?;
        if grad.len() != self.num_weights {
            return Err(Error::ShapeMismatch {
                what: "gradient buffer length",
                expected: self.num_weights,
                actual: grad.len(),
            });
        }

        let cache = self.forward(weights, inputs);
        let mut d_z = Matrix::zeros(cache.output.rows(), cache.output.cols());
        grad.fill(0.0);
        let value = likelihood.backward(weights, &cache.output, targets, &mut d_z, grad)?;

        self.backward(weights, inputs, &cache, d_z, grad);
        Ok(value)
    }

    fn forward(&self, weights: &[f32], inputs: &Matrix) -> ForwardCache {
        let batch = inputs.rows();
        let last = self.num_layers() - 1;
        let mut hidden = Vec::with_capacity(last);

        let mut output = Matrix::zeros(0, self.output_dim());
        for idx in 0..self.num_layers() {
            let layer = self.layer_params(weights, idx);
            let layer_in = if idx == 0 { inputs } else { &hidden[idx - 1] };

            let mut z = Matrix::zeros(batch, layer.out_dim);
            matmul(
                layer_in.as_slice(),
                layer.weights,
                z.as_mut_slice(),
                batch,
                layer.in_dim,
                layer.out_dim,
            );
            for r in 0..batch {
                for (v, &b) in z.row_mut(r).iter_mut().zip(layer.biases) {
                    *v += b;
                }
            }

            if idx == last {
                output = z;
            } else {
                self.activation.apply_slice(z.as_mut_slice());
                hidden.push(z);
            }
        }

        ForwardCache { hidden, output }
    }

    /// Backprop `d_z` (gradient w.r.t. the output) through every layer, accumulating
    /// parameter gradients into `grad`.
    fn backward(
        &self,
        weights: &[f32],
        inputs: &Matrix,
        cache: &ForwardCache,
        mut d_z: Matrix,
        grad: &mut [f32],
    ) {
        let batch = inputs.rows();

        for idx in (0..self.num_layers()).rev() {
            let layer = self.layer_params(weights, idx);
            let layer_in = if idx == 0 { inputs } else { &cache.hidden[idx - 1] };

            let (d_w, rest) = grad[self.offsets[idx]..].split_at_mut(layer.in_dim * layer.out_dim);
            let d_b = &mut rest[..layer.out_dim];

            matmul_at_b_acc(
                layer_in.as_slice(),
                d_z.as_slice(),
                d_w,
                batch,
                layer.in_dim,
                layer.out_dim,
            );
            for row in d_z.iter_rows() {
                for (g, &d) in d_b.iter_mut().zip(row) {
                    *g += d;
                }
            }

            if idx == 0 {
                break;
            }

            let mut d_prev = Matrix::zeros(batch, layer.in_dim);
            matmul_a_bt(
                d_z.as_slice(),
                layer.weights,
                d_prev.as_mut_slice(),
                batch,
                layer.out_dim,
                layer.in_dim,
            );
            for (d, &y) in d_prev
                .as_mut_slice()
                .iter_mut()
                .zip(layer_in.as_slice())
            {
                *d *= self.activation.grad_from_output(y);
            }
            d_z = d_prev;
        }
    }
}
