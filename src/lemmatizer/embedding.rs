//! In-memory word embedding table.
//!
//! Loads the word2vec formats (binary and text) and answers both directions of the
//! lemmatizer's needs: word -> vector for featurization, vector -> nearest words for
//! decoding predictions.
//!
//! Binary layout:
//!
//! ```text
//! "<vocab_size> <dim>\n"
//! repeated vocab_size times: "<word> " then dim little-endian f32 (optionally "\n")
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::info;

use super::Vectorizer;
use crate::metrics::cosine_similarity;
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct EmbeddingTable {
    dim: usize,
    words: Vec<String>,
    /// Row-major `(words.len(), dim)`.
    vectors: Vec<f32>,
    index: HashMap<String, usize>,
}

impl EmbeddingTable {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("embedding dim must be > 0".to_owned()));
        }
        Ok(Self {
            dim,
            ..Self::default()
        })
    }

    /// Build a table from `(word, vector)` pairs; every vector must have length `dim`.
    pub fn from_entries<I, S>(dim: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut table = Self::new(dim)?;
        for (word, vector) in entries {
            table.insert(word, &vector)?;
        }
        Ok(table)
    }

    /// Add or replace the vector for `word`.
    pub fn insert(&mut self, word: impl Into<String>, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::ShapeMismatch {
                what: "embedding length",
                expected: self.dim,
                actual: vector.len(),
            });
        }
        let word = word.into();
        match self.index.get(&word) {
            Some(&row) => {
                self.vectors[row * self.dim..(row + 1) * self.dim].copy_from_slice(vector);
            }
            None => {
                self.index.insert(word.clone(), self.words.len());
                self.words.push(word);
                self.vectors.extend_from_slice(vector);
            }
        }
        Ok(())
    }

    /// Load the word2vec binary format (e.g. `GoogleNews-vectors-negative300.bin`).
    pub fn load_word2vec_binary<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let file = File::open(p).map_err(|e| Error::resource(p, e))?;
        let file_len = file.metadata().map_err(|e| Error::resource(p, e))?.len();
        let mut reader = BufReader::new(file);

        let mut header = String::new();
        reader
            .read_line(&mut header)
            .map_err(|e| Error::resource(p, e))?;
        let (vocab_size, dim) = parse_header(&header).map_err(|e| Error::resource(p, e))?;

        let mut table = Self::new(dim).map_err(|e| Error::resource(p, e))?;
        // Each entry holds at least a one-byte word, a space and the vector bytes.
        let raw_len = dim
            .checked_mul(4)
            .ok_or_else(|| Error::resource(p, format!("dim {dim} is too large")))?;
        let body_len = file_len.saturating_sub(header.len() as u64);
        let fits = raw_len
            .checked_add(2)
            .and_then(|entry| entry.checked_mul(vocab_size))
            .is_some_and(|min_len| min_len as u64 <= body_len);
        if !fits {
            return Err(Error::resource(
                p,
                format!(
                    "header declares {vocab_size} entries of dim {dim}, \
                     file body has {body_len} bytes"
                ),
            ));
        }

        let mut raw = vec![0_u8; raw_len];
        let mut vector = vec![0.0_f32; dim];
        let mut word = Vec::new();
        for n in 0..vocab_size {
            word.clear();
            read_word(&mut reader, &mut word)
                .map_err(|e| Error::resource(p, format!("entry {n}: {e}")))?;
            reader
                .read_exact(&mut raw)
                .map_err(|e| Error::resource(p, format!("entry {n}: {e}")))?;
            for (v, bytes) in vector.iter_mut().zip(raw.chunks_exact(4)) {
                *v = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            let text = String::from_utf8(std::mem::take(&mut word))
                .map_err(|e| Error::resource(p, format!("entry {n}: word is not UTF-8: {e}")))?;
            table.insert(text, &vector)?;
        }
        if table.len() != vocab_size {
            return Err(Error::resource(
                p,
                format!("header declares {vocab_size} entries, found {}", table.len()),
            ));
        }

        info!("loaded {} embeddings of dim {dim} from {}", table.len(), p.display());
        Ok(table)
    }

    /// Load the word2vec text format: a `"<vocab_size> <dim>"` header, then one
    /// `word v1 ... vdim` line per entry.
    pub fn load_word2vec_text<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p).map_err(|e| Error::resource(p, e))?;
        let mut lines = s.lines();
        let header = lines
            .next()
            .ok_or_else(|| Error::resource(p, "missing header"))?;
        let (vocab_size, dim) = parse_header(header).map_err(|e| Error::resource(p, e))?;

        let mut table = Self::new(dim).map_err(|e| Error::resource(p, e))?;
        for (n, line) in lines.filter(|l| !l.trim().is_empty()).enumerate() {
            let mut parts = line.split_whitespace();
            let word = parts
                .next()
                .ok_or_else(|| Error::resource(p, format!("entry {n}: empty line")))?;
            let vector = parts
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| Error::resource(p, format!("entry {n}: {e}")))?;
            table
                .insert(word, &vector)
                .map_err(|e| Error::resource(p, format!("entry {n}: {e}")))?;
        }
        if table.len() != vocab_size {
            return Err(Error::resource(
                p,
                format!("header declares {vocab_size} entries, found {}", table.len()),
            ));
        }

        info!("loaded {} embeddings of dim {dim} from {}", table.len(), p.display());
        Ok(table)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// The `topn` words whose vectors are most cosine-similar to `query`, best first.
    ///
    /// Zero-norm table entries are skipped; a zero-norm query is an error.
    pub fn most_similar(&self, query: &[f32], topn: usize) -> Result<Vec<(&str, f32)>> {
        if query.len() != self.dim {
            return Err(Error::ShapeMismatch {
                what: "query length",
                expected: self.dim,
                actual: query.len(),
            });
        }
        if query.iter().all(|&v| v == 0.0) {
            return Err(Error::DegenerateVector { row: 0 });
        }

        let mut scored: Vec<(&str, f32)> = self
            .words
            .iter()
            .zip(self.vectors.chunks_exact(self.dim))
            .filter_map(|(w, v)| cosine_similarity(query, v).map(|s| (w.as_str(), s)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(topn);
        Ok(scored)
    }
}

impl Vectorizer for EmbeddingTable {
    fn dim(&self) -> usize {
        self.dim
    }

    fn vector(&self, word: &str) -> Option<&[f32]> {
        let row = *self.index.get(word)?;
        Some(&self.vectors[row * self.dim..(row + 1) * self.dim])
    }
}

fn parse_header(line: &str) -> std::result::Result<(usize, usize), String> {
    let mut parts = line.split_whitespace();
    let mut next = |name: &str| -> std::result::Result<usize, String> {
        parts
            .next()
            .ok_or_else(|| format!("header is missing {name}"))?
            .parse::<usize>()
            .map_err(|e| format!("invalid {name} in header: {e}"))
    };
    let vocab_size = next("vocab size")?;
    let dim = next("dim")?;
    Ok((vocab_size, dim))
}

/// Read bytes up to the next space, skipping the newlines some writers put between
/// entries.
fn read_word<R: BufRead>(reader: &mut R, word: &mut Vec<u8>) -> std::io::Result<()> {
    let mut byte = [0_u8; 1];
    loop {
        reader.read_exact(&mut byte)?;
        match byte[0] {
            b' ' if !word.is_empty() => return Ok(()),
            b'\n' | b'\r' | b' ' => {}
            b => word.push(b),
        }
    }
}
