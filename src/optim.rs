//! First-order optimizers over a flat parameter vector.
//!
//! Optimizers update a flat parameter vector given its gradient. They know nothing
//! about networks: `minimize` drives any `Objective` for a fixed number of iterations.
//!
//! Design notes:
//! - Optimizer *state* (momentum/Adam moments) lives outside the parameters.
//! - Every iteration is checked for NaN/Inf; a non-finite value aborts the run.

use log::debug;

use crate::objective::Objective;
use crate::{Error, Result};

/// Update rule used by `minimize`. Defaults to Adam(0.9, 0.999, 1e-8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Optimizer {
    Sgd,
    SgdMomentum { momentum: f32 },
    /// Bias-corrected.
    Adam { beta1: f32, beta2: f32, eps: f32 },
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::Adam {
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }
}

impl Optimizer {
    pub fn validate(self) -> Result<()> {
        match self {
            Optimizer::Sgd => Ok(()),
            Optimizer::SgdMomentum { momentum } => unit_interval("momentum", momentum),
            Optimizer::Adam { beta1, beta2, eps } => {
                unit_interval("adam beta1", beta1)?;
                unit_interval("adam beta2", beta2)?;
                if eps.is_finite() && eps > 0.0 {
                    Ok(())
                } else {
                    Err(Error::InvalidConfig(format!(
                        "adam eps must be finite and > 0, got {eps}"
                    )))
                }
            }
        }
    }

    /// Allocate optimizer state for `num_params` parameters.
    pub fn state(self, num_params: usize) -> Result<OptimizerState> {
        self.validate()?;

        Ok(match self {
            Optimizer::Sgd => OptimizerState::Sgd,
            Optimizer::SgdMomentum { momentum } => OptimizerState::SgdMomentum {
                momentum,
                velocity: vec![0.0; num_params],
            },
            Optimizer::Adam { beta1, beta2, eps } => OptimizerState::Adam {
                beta1,
                beta2,
                eps,
                beta1_pow: 1.0,
                beta2_pow: 1.0,
                m: vec![0.0; num_params],
                v: vec![0.0; num_params],
            },
        })
    }
}

fn unit_interval(name: &str, v: f32) -> Result<()> {
    if v.is_finite() && (0.0..1.0).contains(&v) {
        return Ok(());
    }
    Err(Error::InvalidConfig(format!(
        "{name} must be finite and in [0, 1), got {v}"
    )))
}

/// Per-parameter buffers of a running optimizer.
#[derive(Debug, Clone)]
pub enum OptimizerState {
    Sgd,
    SgdMomentum {
        momentum: f32,
        velocity: Vec<f32>,
    },
    Adam {
        beta1: f32,
        beta2: f32,
        eps: f32,
        beta1_pow: f32,
        beta2_pow: f32,
        m: Vec<f32>,
        v: Vec<f32>,
    },
}

impl OptimizerState {
    /// Apply one update: `params -= step_size * direction(grad)`.
    pub fn step(&mut self, params: &mut [f32], grad: &[f32], step_size: f32) {
        debug_assert_eq!(params.len(), grad.len());

        match self {
            OptimizerState::Sgd => {
                for (p, &g) in params.iter_mut().zip(grad) {
                    *p -= step_size * g;
                }
            }
            OptimizerState::SgdMomentum { momentum, velocity } => {
                debug_assert_eq!(velocity.len(), params.len());
                for ((p, v), &g) in params.iter_mut().zip(velocity.iter_mut()).zip(grad) {
                    *v = *momentum * *v + g;
                    *p -= step_size * *v;
                }
            }
            OptimizerState::Adam {
                beta1,
                beta2,
                eps,
                beta1_pow,
                beta2_pow,
                m,
                v,
            } => {
                *beta1_pow *= *beta1;
                *beta2_pow *= *beta2;
                let corr1 = 1.0 - *beta1_pow;
                let corr2 = 1.0 - *beta2_pow;

                for i in 0..params.len() {
                    let g = grad[i];
                    m[i] = *beta1 * m[i] + (1.0 - *beta1) * g;
                    v[i] = *beta2 * v[i] + (1.0 - *beta2) * (g * g);

                    let m_hat = m[i] / corr1;
                    let v_hat = v[i] / corr2;
                    params[i] -= step_size * m_hat / (v_hat.sqrt() + *eps);
                }
            }
        }
    }
}

/// Minimize `objective` starting from `init` for `num_iters` iterations.
///
/// `callback(params, iter, grad)` runs after every update with the updated parameters
/// and the gradient that produced them; returning an error stops the run.
pub fn minimize<O, F>(
    objective: &O,
    init: Vec<f32>,
    optimizer: Optimizer,
    step_size: f32,
    num_iters: usize,
    mut callback: F,
) -> Result<Vec<f32>>
where
    O: Objective + ?Sized,
    F: FnMut(&[f32], usize, &[f32]) -> Result<()>,
{
    if !(step_size.is_finite() && step_size > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "step size must be finite and > 0, got {step_size}"
        )));
    }
    if init.len() != objective.num_params() {
        return Err(Error::ShapeMismatch {
            what: "initial parameter vector length",
            expected: objective.num_params(),
            actual: init.len(),
        });
    }

    let mut params = init;
    let mut grad = vec![0.0_f32; params.len()];
    let mut state = optimizer.state(params.len())?;
    debug!("minimizing {} parameters for {num_iters} iterations with {optimizer:?}", params.len());

    for iter in 0..num_iters {
        let value = objective.gradient(&params, iter, &mut grad)?;
        if !value.is_finite() || grad.iter().any(|g| !g.is_finite()) {
            return Err(Error::NonFinite { iteration: iter });
        }

        state.step(&mut params, &grad, step_size);
        if params.iter().any(|p| !p.is_finite()) {
            return Err(Error::NonFinite { iteration: iter });
        }

        callback(&params, iter, &grad)?;
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `f(x) = Σ (x_i - c_i)²`
    struct Quadratic {
        center: Vec<f32>,
    }

    impl Objective for Quadratic {
        fn num_params(&self) -> usize {
            self.center.len()
        }

        fn value(&self, params: &[f32], _iter: usize) -> Result<f32> {
            Ok(params
                .iter()
                .zip(&self.center)
                .map(|(p, c)| (p - c) * (p - c))
                .sum())
        }

        fn gradient(&self, params: &[f32], iter: usize, grad: &mut [f32]) -> Result<f32> {
            for ((g, p), c) in grad.iter_mut().zip(params).zip(&self.center) {
                *g = 2.0 * (p - c);
            }
            self.value(params, iter)
        }
    }

    struct Explodes;

    impl Objective for Explodes {
        fn num_params(&self) -> usize {
            1
        }

        fn value(&self, _params: &[f32], _iter: usize) -> Result<f32> {
            Ok(f32::NAN)
        }

        fn gradient(&self, _params: &[f32], _iter: usize, grad: &mut [f32]) -> Result<f32> {
            grad[0] = f32::NAN;
            Ok(f32::NAN)
        }
    }

    #[test]
    fn optimizer_validation_rejects_bad_hyperparams() {
        assert!(Optimizer::SgdMomentum { momentum: 1.0 }.validate().is_err());
        assert!(
            Optimizer::Adam {
                beta1: 1.0,
                beta2: 0.999,
                eps: 1e-8
            }
            .validate()
            .is_err()
        );
        assert!(
            Optimizer::Adam {
                beta1: 0.9,
                beta2: 0.999,
                eps: 0.0
            }
            .validate()
            .is_err()
        );
        assert!(Optimizer::default().validate().is_ok());
    }

    #[test]
    fn sgd_momentum_updates_like_sgd_on_first_step() {
        let mut params = vec![1.0_f32, 2.0];
        let mut state = Optimizer::SgdMomentum { momentum: 0.9 }.state(2).unwrap();
        state.step(&mut params, &[3.0, 4.0], 0.1);
        assert!((params[0] - (1.0 - 0.1 * 3.0)).abs() < 1e-6);
        assert!((params[1] - (2.0 - 0.1 * 4.0)).abs() < 1e-6);
    }

    #[test]
    fn adam_first_step_matches_expected_direction_for_unit_grad() {
        let mut params = vec![1.0_f32];
        let mut state = Optimizer::Adam {
            beta1: 0.9,
            beta2: 0.999,
            eps: 1.0,
        }
        .state(1)
        .unwrap();
        state.step(&mut params, &[1.0], 0.1);
        // With eps=1.0 and unit grad the bias-corrected step is 1/(1+eps) = 0.5.
        assert!((params[0] - (1.0 - 0.1 * 0.5)).abs() < 1e-6);
    }

    #[test]
    fn minimize_converges_on_quadratic_and_calls_back_every_iteration() {
        let obj = Quadratic {
            center: vec![1.0, -2.0],
        };
        let mut calls = 0;
        let out = minimize(&obj, vec![0.0, 0.0], Optimizer::Sgd, 0.1, 200, |_, iter, _| {
            assert_eq!(iter, calls);
            calls += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(calls, 200);
        assert!((out[0] - 1.0).abs() < 1e-3);
        assert!((out[1] + 2.0).abs() < 1e-3);
    }

    #[test]
    fn minimize_reports_non_finite_values() {
        let err = minimize(&Explodes, vec![0.0], Optimizer::default(), 0.1, 5, |_, _, _| Ok(()))
            .unwrap_err();
        assert_eq!(err, Error::NonFinite { iteration: 0 });
    }

    #[test]
    fn minimize_validates_initial_length() {
        let obj = Quadratic { center: vec![0.0; 3] };
        let err = minimize(&obj, vec![0.0; 2], Optimizer::Sgd, 0.1, 1, |_, _, _| Ok(())).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
