//! Versioned JSON format for trained weights.
//!
//! The file stores the architecture (`layer_sizes`, `nonlinearity`) next to the flat
//! weight vector, so a network can be rebuilt without the training config. Loading
//! validates the version, the weight count against the architecture, and finiteness.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::train::TrainedMlp;
use crate::{Activation, Error, Mlp, Result};

pub const WEIGHTS_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedWeights {
    pub format_version: u32,
    pub layer_sizes: Vec<usize>,
    pub nonlinearity: Activation,
    /// Flat layout: per layer `W` (in x out, row-major) then `b` (out).
    pub weights: Vec<f32>,
}

impl SavedWeights {
    pub fn from_model(mlp: &Mlp, weights: &[f32]) -> Result<Self> {
        mlp.check_weights(weights)?;
        Ok(Self {
            format_version: WEIGHTS_FORMAT_VERSION,
            layer_sizes: mlp.layer_sizes().to_vec(),
            nonlinearity: mlp.activation(),
            weights: weights.to_vec(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != WEIGHTS_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported weights format_version {}; expected {}",
                self.format_version, WEIGHTS_FORMAT_VERSION
            )));
        }
        let mlp = Mlp::build(&self.layer_sizes, self.nonlinearity)
            .map_err(|e| Error::InvalidData(format!("invalid architecture: {e}")))?;
        mlp.check_weights(&self.weights)?;
        if self.weights.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "weights must contain only finite values".to_owned(),
            ));
        }
        Ok(())
    }

    /// Rebuild the network and hand back its weights.
    pub fn into_model(self) -> Result<(Mlp, Vec<f32>)> {
        self.validate()?;
        let mlp = Mlp::build(&self.layer_sizes, self.nonlinearity)?;
        Ok((mlp, self.weights))
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidData(format!("failed to serialize weights: {e}")))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let saved: SavedWeights = serde_json::from_str(s)
            .map_err(|e| Error::InvalidData(format!("failed to parse weights json: {e}")))?;
        saved.validate()?;
        Ok(saved)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let p = path.as_ref();
        let s = serde_json::to_string_pretty(self).map_err(|e| Error::resource_write(p, e))?;
        std::fs::write(p, s).map_err(|e| Error::resource_write(p, e))
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p).map_err(|e| Error::resource(p, e))?;
        Self::from_json_str(&s).map_err(|e| Error::resource(p, e))
    }
}

impl TrainedMlp {
    /// Save the architecture and weights (not the training report).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        SavedWeights::from_model(&self.mlp, &self.weights)?.save_json(path)
    }
}
