//! Part-of-speech handling.
//!
//! Raw Penn Treebank tags feed the network through `PosIndex` (tag -> integer);
//! the lemma dictionary only needs the four coarse WordNet classes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoarsePos {
    Noun,
    Adjective,
    Verb,
    Adverb,
}

impl CoarsePos {
    /// Map a treebank tag to its coarse class by its two-letter prefix
    /// (`NN*`, `JJ*`, `VB*`, `RB*`).
    pub fn from_treebank(tag: &str) -> Option<Self> {
        match tag.get(..2)? {
            "NN" => Some(CoarsePos::Noun),
            "JJ" => Some(CoarsePos::Adjective),
            "VB" => Some(CoarsePos::Verb),
            "RB" => Some(CoarsePos::Adverb),
            _ => None,
        }
    }

    pub fn from_treebank_or(tag: &str, default: CoarsePos) -> Self {
        Self::from_treebank(tag).unwrap_or(default)
    }

    /// WordNet's single-letter code.
    pub fn wordnet_code(self) -> char {
        match self {
            CoarsePos::Noun => 'n',
            CoarsePos::Adjective => 'a',
            CoarsePos::Verb => 'v',
            CoarsePos::Adverb => 'r',
        }
    }
}

impl fmt::Display for CoarsePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wordnet_code())
    }
}

/// The 45 Penn Treebank tags, in their conventional order.
pub const PENN_TREEBANK_TAGS: [&str; 45] = [
    "CC", "CD", "DT", "EX", "FW", "IN", "JJ", "JJR", "JJS", "LS", "MD", "NN", "NNS", "NNP",
    "NNPS", "PDT", "POS", "PRP", "PRP$", "RB", "RBR", "RBS", "RP", "SYM", "TO", "UH", "VB",
    "VBD", "VBG", "VBN", "VBP", "VBZ", "WDT", "WP", "WP$", "WRB", "$", "#", "``", "''", "(",
    ")", ",", ".", ":",
];

/// Tag -> integer feature value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PosIndex {
    index: BTreeMap<String, usize>,
}

impl PosIndex {
    /// Index tags by their position in `tags`. Repeated tags keep their last position.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let index = tags
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.into(), i))
            .collect();
        Self { index }
    }

    pub fn penn_treebank() -> Self {
        Self::from_tags(PENN_TREEBANK_TAGS)
    }

    /// Load an ordered JSON list of tags, e.g. `["CC", "CD", ...]`.
    pub fn load_json_list<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p).map_err(|e| Error::resource(p, e))?;
        let tags: Vec<String> = serde_json::from_str(&s).map_err(|e| Error::resource(p, e))?;
        if tags.is_empty() {
            return Err(Error::resource(p, "tag list is empty"));
        }
        Ok(Self::from_tags(tags))
    }

    pub fn get(&self, tag: &str) -> Result<usize> {
        self.index
            .get(tag)
            .copied()
            .ok_or_else(|| Error::UnknownPosTag(tag.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn treebank_prefixes_map_to_coarse_classes() {
        assert_eq!(CoarsePos::from_treebank("NNS"), Some(CoarsePos::Noun));
        assert_eq!(CoarsePos::from_treebank("JJR"), Some(CoarsePos::Adjective));
        assert_eq!(CoarsePos::from_treebank("VBD"), Some(CoarsePos::Verb));
        assert_eq!(CoarsePos::from_treebank("RB"), Some(CoarsePos::Adverb));
        assert_eq!(CoarsePos::from_treebank("DT"), None);
        assert_eq!(CoarsePos::from_treebank("."), None);
        assert_eq!(
            CoarsePos::from_treebank_or("IN", CoarsePos::Noun),
            CoarsePos::Noun
        );
    }

    #[test]
    fn index_follows_list_order() {
        let idx = PosIndex::from_tags(["DT", "NN", "VBZ"]);
        assert_eq!(idx.get("NN").unwrap(), 1);
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.get("XX"), Err(Error::UnknownPosTag("XX".to_owned())));
    }

    #[test]
    fn penn_index_covers_all_tags() {
        let idx = PosIndex::penn_treebank();
        assert_eq!(idx.len(), 45);
        assert_eq!(idx.get("CC").unwrap(), 0);
        assert_eq!(idx.get(":").unwrap(), 44);
    }

    #[test]
    fn serializes_as_a_plain_map() {
        let idx = PosIndex::from_tags(["DT", "NN"]);
        let json = serde_json::to_string(&idx).unwrap();
        assert_eq!(json, r#"{"DT":0,"NN":1}"#);
        let back: PosIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back, idx);
    }
}
