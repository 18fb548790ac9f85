//! Feature-layout parameters persisted next to the trained weights.
//!
//! Inference has to rebuild exactly the feature rows the network was trained on:
//! same sentence width, same tag -> integer mapping, same window.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{PosIndex, Window};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    pub max_words: usize,
    pub pos_index: PosIndex,
    #[serde(default)]
    pub window: Window,
}

impl ParamSet {
    pub fn new(max_words: usize, pos_index: PosIndex) -> Self {
        Self {
            max_words,
            pos_index,
            window: Window::default(),
        }
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_words == 0 {
            return Err(Error::InvalidData("max_words must be > 0".to_owned()));
        }
        if self.pos_index.is_empty() {
            return Err(Error::InvalidData("pos_index must not be empty".to_owned()));
        }
        if self.window.span() > self.max_words {
            return Err(Error::InvalidData(format!(
                "window of {} rows does not fit in max_words {}",
                self.window.span(),
                self.max_words
            )));
        }
        Ok(())
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let p = path.as_ref();
        let s = serde_json::to_string_pretty(self).map_err(|e| Error::resource_write(p, e))?;
        std::fs::write(p, s).map_err(|e| Error::resource_write(p, e))
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p).map_err(|e| Error::resource(p, e))?;
        let params: ParamSet = serde_json::from_str(&s).map_err(|e| Error::resource(p, e))?;
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_defaults_when_absent() {
        let params: ParamSet =
            serde_json::from_str(r#"{"max_words":78,"pos_index":{"NN":0}}"#).unwrap();
        assert_eq!(params.window, Window::default());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn save_and_load_preserve_everything() {
        let path = std::env::temp_dir().join(format!(
            "neural_lemmatizer_{}_params.json",
            std::process::id()
        ));
        let params = ParamSet::new(12, PosIndex::penn_treebank()).with_window(Window::new(1, 2));
        params.save_json(&path).unwrap();
        assert_eq!(ParamSet::load_json(&path).unwrap(), params);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn save_into_missing_directory_is_a_write_error() {
        let path = std::env::temp_dir()
            .join(format!("neural_lemmatizer_{}_no_such_dir", std::process::id()))
            .join("params.json");
        let err = ParamSet::new(12, PosIndex::penn_treebank())
            .save_json(&path)
            .unwrap_err();
        assert!(matches!(err, Error::ResourceWrite { .. }));
    }

    #[test]
    fn oversized_window_is_invalid() {
        let params = ParamSet::new(2, PosIndex::penn_treebank()).with_window(Window::new(1, 1));
        assert!(params.validate().is_err());
    }
}
