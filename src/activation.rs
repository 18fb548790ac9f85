//! Nonlinearities applied between dense layers.
//!
//! The network applies the nonlinearity after every `X·W + b`, but returns the last
//! layer's pre-activation output. Backprop caches post-activation values and computes
//! `dL/dz` from `dL/dy` using `y`, so no separate `z` buffer is needed for hidden layers.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Element-wise activation function.
pub enum Activation {
    #[default]
    Tanh,
    Relu,
    LeakyRelu {
        alpha: f32,
    },
    Sigmoid,
    Identity,
}

impl Activation {
    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        if let Activation::LeakyRelu { alpha } = self
            && !(alpha.is_finite() && alpha >= 0.0)
        {
            return Err(Error::InvalidConfig(format!(
                "leaky ReLU alpha must be finite and >= 0, got {alpha}"
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
            Activation::LeakyRelu { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::Sigmoid => sigmoid(x),
            Activation::Identity => x,
        }
    }

    /// Apply in place over a buffer.
    #[inline]
    pub(crate) fn apply_slice(self, xs: &mut [f32]) {
        if self == Activation::Identity {
            return;
        }
        for x in xs {
            *x = self.apply(*x);
        }
    }

    /// Derivative w.r.t. the input, expressed through the post-activation output `y`.
    #[inline]
    pub(crate) fn grad_from_output(self, y: f32) -> f32 {
        match self {
            Activation::Tanh => 1.0 - y * y,
            Activation::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyRelu { alpha } => {
                if y > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::Sigmoid => y * (1.0 - y),
            Activation::Identity => 1.0,
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_tanh() {
        assert_eq!(Activation::default(), Activation::Tanh);
    }

    #[test]
    fn leaky_relu_alpha_must_be_finite_and_non_negative() {
        assert!(
            Activation::LeakyRelu { alpha: f32::NAN }
                .validate()
                .is_err()
        );
        assert!(Activation::LeakyRelu { alpha: -0.1 }.validate().is_err());
        assert!(Activation::LeakyRelu { alpha: 0.1 }.validate().is_ok());
    }

    #[test]
    fn gradients_from_output_match_derivatives() {
        let y = Activation::Tanh.apply(0.3);
        assert!((Activation::Tanh.grad_from_output(y) - (1.0 - y * y)).abs() < 1e-6);

        let s = Activation::Sigmoid.apply(0.0);
        assert!((Activation::Sigmoid.grad_from_output(s) - 0.25).abs() < 1e-6);

        let act = Activation::LeakyRelu { alpha: 0.1 };
        assert_eq!(act.apply(-2.0), -0.2);
        assert_eq!(act.grad_from_output(-0.2), 0.1);
        assert_eq!(Activation::Relu.grad_from_output(0.0), 0.0);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_string(&Activation::LeakyRelu { alpha: 0.5 }).unwrap();
        assert_eq!(json, r#"{"kind":"leaky_relu","alpha":0.5}"#);
        let back: Activation = serde_json::from_str(r#"{"kind":"tanh"}"#).unwrap();
        assert_eq!(back, Activation::Tanh);
    }
}
