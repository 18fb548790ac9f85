use std::path::Path;

use log::debug;

use super::{
    EmbeddingTable, Featurizer, MissPolicy, ParamSet, PosTagger, Vectorizer, prepare_sentence,
    window_features,
};
use crate::serde_model::SavedWeights;
use crate::{Error, Mlp, Result};

/// A trained lemmatizer ready to map sentences to lemmas.
pub struct NeuralLemmatizer<'a> {
    mlp: Mlp,
    weights: Vec<f32>,
    params: ParamSet,
    embeddings: &'a EmbeddingTable,
    tagger: &'a dyn PosTagger,
}

impl<'a> NeuralLemmatizer<'a> {
    /// Wrap a trained network, checking that its shape matches the feature layout
    /// described by `params`.
    pub fn new(
        mlp: Mlp,
        weights: Vec<f32>,
        params: ParamSet,
        embeddings: &'a EmbeddingTable,
        tagger: &'a dyn PosTagger,
    ) -> Result<Self> {
        params.validate()?;
        mlp.check_weights(&weights)?;

        let dim = embeddings.dim();
        let expected_in = (dim + 1) * params.window.span();
        if mlp.input_dim() != expected_in {
            return Err(Error::ShapeMismatch {
                what: "network input width",
                expected: expected_in,
                actual: mlp.input_dim(),
            });
        }
        if mlp.output_dim() != dim {
            return Err(Error::ShapeMismatch {
                what: "network output width",
                expected: dim,
                actual: mlp.output_dim(),
            });
        }

        Ok(Self {
            mlp,
            weights,
            params,
            embeddings,
            tagger,
        })
    }

    /// Load weights and the parameter set written after training.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        weights_path: P,
        params_path: Q,
        embeddings: &'a EmbeddingTable,
        tagger: &'a dyn PosTagger,
    ) -> Result<Self> {
        let (mlp, weights) = SavedWeights::load_json(weights_path)?.into_model()?;
        let params = ParamSet::load_json(params_path)?;
        Self::new(mlp, weights, params, embeddings, tagger)
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    /// One lemma per input word.
    ///
    /// Words past `max_words`, words without a full context window, and words whose
    /// prediction is a zero vector keep their surface form.
    pub fn lemmatize<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<String>> {
        let featurizer = Featurizer {
            pos_index: &self.params.pos_index,
            vectorizer: self.embeddings,
            tagger: self.tagger,
            max_words: self.params.max_words,
            miss_policy: MissPolicy::Zero,
        };
        let prepared = prepare_sentence(&featurizer, words, None)?;
        let inputs = window_features(&prepared.features, self.params.window)?;
        let preds = self.mlp.predict(&self.weights, &inputs)?;
        let before = self.params.window.before;

        let mut lemmas = Vec::with_capacity(words.len());
        for (i, word) in words.iter().map(AsRef::as_ref).enumerate() {
            let row = i
                .checked_sub(before)
                .filter(|&r| i < prepared.num_words && r < preds.rows());
            let lemma = match row {
                Some(r) => self.decode(preds.row(r))?.unwrap_or(word),
                None => word,
            };
            lemmas.push(lemma.to_owned());
        }
        debug!("lemmatized {} words", lemmas.len());
        Ok(lemmas)
    }

    fn decode(&self, prediction: &[f32]) -> Result<Option<&'a str>> {
        if prediction.iter().all(|&v| v == 0.0) {
            return Ok(None);
        }
        let nearest = self.embeddings.most_similar(prediction, 1)?;
        Ok(nearest.first().map(|&(w, _)| w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lemmatizer::{PosIndex, Window};
    use crate::{Activation, Matrix};

    fn table() -> EmbeddingTable {
        EmbeddingTable::from_entries(
            2,
            [("cat", vec![1.0, 0.0]), ("run", vec![0.0, 1.0])],
        )
        .unwrap()
    }

    fn tagger(words: &[&str]) -> Vec<String> {
        words.iter().map(|_| "NN".to_owned()).collect()
    }

    /// Copies the embedding columns of the center row straight to the output.
    fn passthrough(window: Window) -> (Mlp, Vec<f32>) {
        let span = window.span();
        let in_dim = 3 * span;
        let mlp = Mlp::build(&[in_dim, 2], Activation::Tanh).unwrap();
        let mut w = Matrix::zeros(in_dim, 2);
        let center = 3 * window.before;
        w.row_mut(center)[0] = 1.0;
        w.row_mut(center + 1)[1] = 1.0;
        let mut weights = w.into_vec();
        weights.extend_from_slice(&[0.0, 0.0]);
        (mlp, weights)
    }

    #[test]
    fn decodes_nearest_embedding() {
        let table = table();
        let (mlp, weights) = passthrough(Window::default());
        let params = ParamSet::new(3, PosIndex::from_tags(["NN"]));
        let lem = NeuralLemmatizer::new(mlp, weights, params, &table, &tagger).unwrap();

        let out = lem.lemmatize(&["run", "cat", "dog", "cat"]).unwrap();
        // "dog" misses the table, predicts zeros and keeps its form; the 4th word is
        // past max_words.
        assert_eq!(out, vec!["run", "cat", "dog", "cat"]);
    }

    #[test]
    fn boundary_words_without_a_window_keep_their_form() {
        let table = table();
        let window = Window::new(1, 1);
        let (mlp, weights) = passthrough(window);
        let params = ParamSet::new(3, PosIndex::from_tags(["NN"])).with_window(window);
        let lem = NeuralLemmatizer::new(mlp, weights, params, &table, &tagger).unwrap();

        let out = lem.lemmatize(&["x", "run", "y"]).unwrap();
        assert_eq!(out, vec!["x", "run", "y"]);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let table = table();
        let (mlp, weights) = passthrough(Window::default());
        let params = ParamSet::new(3, PosIndex::from_tags(["NN"])).with_window(Window::new(1, 0));
        let err = NeuralLemmatizer::new(mlp, weights, params, &table, &tagger)
            .err()
            .unwrap();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
