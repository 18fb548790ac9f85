//! Word-vector lemmatizer built on top of the flat-weight MLP trainer.
//!
//! Each token becomes a feature row `[embedding(word) | pos_index(tag)]` and its target
//! is `embedding(lemma(word, coarse_pos))`. A trained network maps feature rows to
//! predicted lemma embeddings, which `NeuralLemmatizer` decodes back to words by
//! nearest-neighbor search over the embedding table.
//!
//! The embedding lookup, POS tagger and lemma dictionary are external collaborators,
//! modelled as the traits below. `EmbeddingTable` is the in-memory `Vectorizer`.

pub mod embedding;
pub mod inference;
pub mod params;
pub mod pos;
pub mod prepare;
pub mod training;
pub mod window;

pub use embedding::EmbeddingTable;
pub use inference::NeuralLemmatizer;
pub use params::ParamSet;
pub use pos::{CoarsePos, PosIndex};
pub use prepare::{
    Featurizer, GenConfig, GeneratedDataset, MissPolicy, PrepStats, PreparedSentence, SentencePairs,
    gen_dataset, prepare_sentence,
};
pub use training::{LemmatizerConfig, train_lemmatizer};
pub use window::{Window, window_features, window_featurizer};

/// Word -> fixed-length embedding.
pub trait Vectorizer {
    /// Length of every vector returned by `vector`.
    fn dim(&self) -> usize;

    /// The embedding of `word`, or `None` if it is out of vocabulary.
    fn vector(&self, word: &str) -> Option<&[f32]>;
}

/// Assigns a Penn Treebank tag to every token of a sentence.
pub trait PosTagger {
    /// Must return exactly one tag per word.
    fn tag(&self, words: &[&str]) -> Vec<String>;
}

impl<F> PosTagger for F
where
    F: Fn(&[&str]) -> Vec<String>,
{
    fn tag(&self, words: &[&str]) -> Vec<String> {
        self(words)
    }
}

/// Dictionary lemma of a word given its coarse part of speech.
pub trait LemmaLookup {
    fn lemma(&self, word: &str, pos: CoarsePos) -> String;
}

impl<F> LemmaLookup for F
where
    F: Fn(&str, CoarsePos) -> String,
{
    fn lemma(&self, word: &str, pos: CoarsePos) -> String {
        self(word, pos)
    }
}
