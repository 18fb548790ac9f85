//! Sentence -> fixed-size feature/target tensors.
//!
//! Every sentence becomes a `(max_words, dim + 1)` feature matrix and, when lemmas are
//! requested, a `(max_words, dim)` target matrix. Longer sentences are cut at
//! `max_words`, shorter ones are padded with zero rows.

use log::{debug, info};

use super::{CoarsePos, LemmaLookup, ParamSet, PosIndex, PosTagger, Vectorizer};
use crate::data::split_indices;
use crate::{Error, Matrix, Result, SentenceTensor, Split};

/// What to do with a word the embedding table does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissPolicy {
    /// Use a zero vector and count the miss.
    #[default]
    Zero,
    /// Fail with `Error::VocabularyMiss`.
    Reject,
}

/// The external resources needed to turn words into feature rows.
#[derive(Clone, Copy)]
pub struct Featurizer<'a> {
    pub pos_index: &'a PosIndex,
    pub vectorizer: &'a dyn Vectorizer,
    pub tagger: &'a dyn PosTagger,
    pub max_words: usize,
    pub miss_policy: MissPolicy,
}

impl Featurizer<'_> {
    /// Width of a feature row: the embedding plus one POS column.
    #[inline]
    pub fn feature_dim(&self) -> usize {
        self.vectorizer.dim() + 1
    }

    fn embed(&self, word: &str, out: &mut [f32], misses: &mut usize) -> Result<()> {
        match self.vectorizer.vector(word) {
            Some(v) => {
                out.copy_from_slice(v);
                Ok(())
            }
            None => match self.miss_policy {
                MissPolicy::Zero => {
                    debug!("'{word}' is not in the embedding vocabulary; using zeros");
                    out.fill(0.0);
                    *misses += 1;
                    Ok(())
                }
                MissPolicy::Reject => Err(Error::VocabularyMiss(word.to_owned())),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSentence {
    /// `(max_words, dim + 1)`: embedding columns then the POS index.
    pub features: Matrix,
    /// `(max_words, dim)` lemma embeddings, present only when lemmas were requested.
    pub targets: Option<Matrix>,
    /// Real (non-padding) rows, i.e. `min(words.len(), max_words)`.
    pub num_words: usize,
    /// Embedding lookups that missed, word and lemma lookups combined.
    pub misses: usize,
    pub truncated: bool,
}

/// Build the feature rows (and optionally the lemma-embedding targets) of one sentence.
///
/// The whole sentence is tagged so the tagger sees full context; only the first
/// `max_words` tokens are kept. Without `lemmas` no lemma lookups happen and
/// `targets` is `None`.
pub fn prepare_sentence<S: AsRef<str>>(
    featurizer: &Featurizer<'_>,
    words: &[S],
    lemmas: Option<&dyn LemmaLookup>,
) -> Result<PreparedSentence> {
    if featurizer.max_words == 0 {
        return Err(Error::InvalidConfig("max_words must be > 0".to_owned()));
    }
    let words: Vec<&str> = words.iter().map(AsRef::as_ref).collect();
    let tags = featurizer.tagger.tag(&words);
    if tags.len() != words.len() {
        return Err(Error::InvalidData(format!(
            "tagger returned {} tags for {} words",
            tags.len(),
            words.len()
        )));
    }

    let dim = featurizer.vectorizer.dim();
    let num_words = words.len().min(featurizer.max_words);
    let mut features = Matrix::zeros(featurizer.max_words, dim + 1);
    let mut targets = lemmas.map(|_| Matrix::zeros(featurizer.max_words, dim));
    let mut misses = 0;

    for (i, (&word, tag)) in words.iter().zip(&tags).take(num_words).enumerate() {
        let row = features.row_mut(i);
        featurizer.embed(word, &mut row[..dim], &mut misses)?;
        row[dim] = featurizer.pos_index.get(tag)? as f32;

        if let (Some(lookup), Some(targets)) = (lemmas, targets.as_mut()) {
            let lemma = lookup.lemma(word, CoarsePos::from_treebank_or(tag, CoarsePos::Noun));
            featurizer.embed(&lemma, targets.row_mut(i), &mut misses)?;
        }
    }

    Ok(PreparedSentence {
        features,
        targets,
        num_words,
        misses,
        truncated: words.len() > featurizer.max_words,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrepStats {
    pub sentences: usize,
    /// Real tokens kept after truncation.
    pub tokens: usize,
    pub truncated_sentences: usize,
    pub vocabulary_misses: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenConfig {
    pub max_words: usize,
    /// Train fraction of a train/test split; `None` keeps every sentence in `train`.
    pub train_test_split: Option<f64>,
    pub split: Split,
    pub miss_policy: MissPolicy,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            max_words: 78,
            train_test_split: Some(0.8),
            split: Split::Random,
            miss_policy: MissPolicy::Zero,
        }
    }
}

impl GenConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_words == 0 {
            return Err(Error::InvalidConfig("max_words must be > 0".to_owned()));
        }
        if let Some(frac) = self.train_test_split
            && !(frac > 0.0 && frac <= 1.0)
        {
            return Err(Error::InvalidConfig(format!(
                "train_test_split must be in (0, 1], got {frac}"
            )));
        }
        Ok(())
    }
}

/// Feature and target tensors with matching sentence order.
#[derive(Debug, Clone, PartialEq)]
pub struct SentencePairs {
    /// `(sentences, max_words, dim + 1)`
    pub features: SentenceTensor,
    /// `(sentences, max_words, dim)`
    pub targets: SentenceTensor,
}

impl SentencePairs {
    #[inline]
    pub fn len(&self) -> usize {
        self.features.sentences()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(indices),
            targets: self.targets.select(indices),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDataset {
    pub train: SentencePairs,
    /// Present when `GenConfig::train_test_split` is set.
    pub test: Option<SentencePairs>,
    pub params: ParamSet,
    pub stats: PrepStats,
}

/// Featurize a corpus of tokenized sentences.
pub fn gen_dataset<W, S>(
    sentences: &[W],
    pos_index: &PosIndex,
    vectorizer: &dyn Vectorizer,
    tagger: &dyn PosTagger,
    lemmas: &dyn LemmaLookup,
    cfg: &GenConfig,
) -> Result<GeneratedDataset>
where
    W: AsRef<[S]>,
    S: AsRef<str>,
{
    cfg.validate()?;
    if sentences.is_empty() {
        return Err(Error::InvalidData("no sentences to prepare".to_owned()));
    }
    if pos_index.is_empty() {
        return Err(Error::InvalidData("pos_index must not be empty".to_owned()));
    }

    let featurizer = Featurizer {
        pos_index,
        vectorizer,
        tagger,
        max_words: cfg.max_words,
        miss_policy: cfg.miss_policy,
    };
    let dim = vectorizer.dim();
    let mut all = SentencePairs {
        features: SentenceTensor::zeros(sentences.len(), cfg.max_words, dim + 1),
        targets: SentenceTensor::zeros(sentences.len(), cfg.max_words, dim),
    };
    let mut stats = PrepStats::default();

    for (n, sentence) in sentences.iter().enumerate() {
        let prepared = prepare_sentence(&featurizer, sentence.as_ref(), Some(lemmas))?;
        all.features.set_sentence(n, &prepared.features)?;
        if let Some(targets) = &prepared.targets {
            all.targets.set_sentence(n, targets)?;
        }

        stats.sentences += 1;
        stats.tokens += prepared.num_words;
        stats.vocabulary_misses += prepared.misses;
        if prepared.truncated {
            stats.truncated_sentences += 1;
        }
        if (n + 1).is_multiple_of(1000) {
            info!("prepared {} of {} sentences", n + 1, sentences.len());
        }
    }

    info!(
        "prepared {} sentences ({} tokens, {} truncated, {} vocabulary misses)",
        stats.sentences, stats.tokens, stats.truncated_sentences, stats.vocabulary_misses
    );

    let (train, test) = match cfg.train_test_split {
        Some(frac) => {
            let (train_idx, test_idx) = split_indices(sentences.len(), frac, cfg.split)?;
            (all.select(&train_idx), Some(all.select(&test_idx)))
        }
        None => (all, None),
    };

    Ok(GeneratedDataset {
        train,
        test,
        params: ParamSet::new(cfg.max_words, pos_index.clone()),
        stats,
    })
}
