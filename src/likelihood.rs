//! Objective variants scored by `Mlp::logprob`.
//!
//! - `Cosine`: `ln(cms(preds, targets))`, a pseudo log-likelihood that rewards
//!   directional agreement between predicted and target embeddings.
//! - `Gaussian`: an isotropic Gaussian prior on the weights plus a Gaussian
//!   log-likelihood of the targets around the predictions (the MSE variant).

use std::f32::consts::PI;

use crate::metrics::{self, ZeroNorm};
use crate::{Error, Matrix, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Likelihood {
    Cosine { zero_norm: ZeroNorm },
    Gaussian { weight_scale: f32, noise_scale: f32 },
}

impl Default for Likelihood {
    fn default() -> Self {
        Likelihood::Cosine {
            zero_norm: ZeroNorm::Reject,
        }
    }
}

impl Likelihood {
    /// Gaussian variant with the customary scales (`weight_scale = 10`, `noise_scale = 0.1`).
    pub fn gaussian() -> Self {
        Likelihood::Gaussian {
            weight_scale: 10.0,
            noise_scale: 0.1,
        }
    }

    pub fn validate(self) -> Result<()> {
        if let Likelihood::Gaussian {
            weight_scale,
            noise_scale,
        } = self
        {
            for (name, v) in [("weight_scale", weight_scale), ("noise_scale", noise_scale)] {
                if !(v.is_finite() && v > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "{name} must be finite and > 0, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Name of the accuracy measure reported for this variant.
    pub fn accuracy_name(self) -> &'static str {
        match self {
            Likelihood::Cosine { .. } => "cosine",
            Likelihood::Gaussian { .. } => "rms",
        }
    }

    /// Accuracy measure: `cms` for the cosine variant, `rms` for the Gaussian one.
    pub fn accuracy(self, preds: &Matrix, targets: &Matrix) -> Result<f32> {
        match self {
            Likelihood::Cosine { zero_norm } => metrics::cms(preds, targets, zero_norm),
            Likelihood::Gaussian { .. } => metrics::rms(preds, targets),
        }
    }

    /// Log-likelihood of `targets` given `preds` (and `weights` for the prior term).
    pub fn log_likelihood(self, weights: &[f32], preds: &Matrix, targets: &Matrix) -> Result<f32> {
        match self {
            Likelihood::Cosine { zero_norm } => {
                let score = metrics::cms(preds, targets, zero_norm)?;
                checked_ln(score)
            }
            Likelihood::Gaussian {
                weight_scale,
                noise_scale,
            } => {
                metrics::check_same_shape(preds, targets)?;
                let prior: f32 = weights.iter().map(|&w| log_normal(w, 0.0, weight_scale)).sum();
                let lik: f32 = preds
                    .as_slice()
                    .iter()
                    .zip(targets.as_slice())
                    .map(|(&p, &t)| log_normal(p, t, noise_scale))
                    .sum();
                Ok(prior + lik)
            }
        }
    }

    /// Log-likelihood plus its gradients.
    ///
    /// Overwrites `d_preds` with `dL/d(preds)` and adds the weight-prior gradient
    /// (if any) into `d_weights`.
    pub(crate) fn backward(
        self,
        weights: &[f32],
        preds: &Matrix,
        targets: &Matrix,
        d_preds: &mut Matrix,
        d_weights: &mut [f32],
    ) -> Result<f32> {
        debug_assert_eq!(weights.len(), d_weights.len());
        match self {
            Likelihood::Cosine { zero_norm } => {
                if preds.is_empty() {
                    return Err(Error::InvalidData("logprob of an empty batch".to_owned()));
                }
                let sum = metrics::cosine_sum_backward(preds, targets, zero_norm, d_preds)?;
                let value = checked_ln(sum.abs() / preds.rows() as f32)?;
                // d ln|S| = dS / S
                d_preds.scale(1.0 / sum);
                Ok(value)
            }
            Likelihood::Gaussian {
                weight_scale,
                noise_scale,
            } => {
                metrics::check_same_shape(preds, targets)?;
                let inv_w2 = 1.0 / (weight_scale * weight_scale);
                let inv_n2 = 1.0 / (noise_scale * noise_scale);

                let mut value = 0.0_f32;
                for (g, &w) in d_weights.iter_mut().zip(weights) {
                    value += log_normal(w, 0.0, weight_scale);
                    *g -= w * inv_w2;
                }
                let d = d_preds.as_mut_slice();
                for (i, (&p, &t)) in preds.as_slice().iter().zip(targets.as_slice()).enumerate() {
                    value += log_normal(p, t, noise_scale);
                    d[i] = -(p - t) * inv_n2;
                }
                Ok(value)
            }
        }
    }
}

fn checked_ln(x: f32) -> Result<f32> {
    if !(x.is_finite() && x > 0.0) {
        return Err(Error::InvalidLogDomain(x));
    }
    Ok(x.ln())
}

/// Log density of `N(mean, scale²)` at `x`.
#[inline]
fn log_normal(x: f32, mean: f32, scale: f32) -> f32 {
    let z = (x - mean) / scale;
    -0.5 * (2.0 * PI).ln() - scale.ln() - 0.5 * z * z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_logprob_is_log_of_cms() {
        let p = Matrix::from_rows(&[vec![1.0, 1.0], vec![2.0, 0.0]]).unwrap();
        let t = Matrix::from_rows(&[vec![1.0, 1.0], vec![0.0, 3.0]]).unwrap();
        // cms = |1 + 0| / 2 = 0.5
        let lp = Likelihood::default().log_likelihood(&[], &p, &t).unwrap();
        assert!((lp - 0.5_f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn cosine_logprob_rejects_zero_similarity() {
        let p = Matrix::from_rows(&[vec![1.0, 0.0]]).unwrap();
        let t = Matrix::from_rows(&[vec![0.0, 1.0]]).unwrap();
        let err = Likelihood::default().log_likelihood(&[], &p, &t).unwrap_err();
        assert!(matches!(err, Error::InvalidLogDomain(_)));
    }

    #[test]
    fn gaussian_density_matches_closed_form() {
        // N(0, 1) at 0 is 1/sqrt(2π).
        let expected = (1.0 / (2.0 * PI).sqrt()).ln();
        assert!((log_normal(0.0, 0.0, 1.0) - expected).abs() < 1e-6);
    }

    #[test]
    fn gaussian_scales_must_be_positive() {
        assert!(
            Likelihood::Gaussian {
                weight_scale: 0.0,
                noise_scale: 0.1
            }
            .validate()
            .is_err()
        );
        assert!(Likelihood::gaussian().validate().is_ok());
    }
}
