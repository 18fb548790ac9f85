//! Dataset containers and train/holdout splitting.
//!
//! `Dataset` pairs an input matrix with a target matrix of the same row count.
//! `SentenceTensor` is the padded `(sentences, timesteps, dim)` layout produced by the
//! lemmatizer pipeline; it flattens to a `Matrix` of timesteps for training.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::{Error, Matrix, Result};

/// How rows are assigned to the train and holdout parts of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Split {
    /// The first rows go to train, the rest to holdout.
    Ordered,
    /// Rows are shuffled with a deterministic seed before splitting.
    Seeded(u64),
    /// Rows are shuffled with OS entropy.
    #[default]
    Random,
}

/// Partition `0..len` into train and holdout index lists.
///
/// The train part receives `floor(len * train_frac)` indices.
pub fn split_indices(len: usize, train_frac: f64, split: Split) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(train_frac.is_finite() && train_frac > 0.0 && train_frac <= 1.0) {
        return Err(Error::InvalidConfig(format!(
            "train fraction must be in (0, 1], got {train_frac}"
        )));
    }

    let mut order: Vec<usize> = (0..len).collect();
    match split {
        Split::Ordered => {}
        Split::Seeded(seed) => order.shuffle(&mut StdRng::seed_from_u64(seed)),
        Split::Random => order.shuffle(&mut rand::thread_rng()),
    }

    let n_train = (len as f64 * train_frac).floor() as usize;
    if n_train == 0 {
        return Err(Error::InvalidData(format!(
            "split of {len} rows with fraction {train_frac} leaves no training rows"
        )));
    }
    let holdout = order.split_off(n_train);
    Ok((order, holdout))
}

/// A supervised dataset: inputs (X) and targets (Y).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    inputs: Matrix,
    targets: Matrix,
}

impl Dataset {
    pub fn new(inputs: Matrix, targets: Matrix) -> Result<Self> {
        if inputs.rows() != targets.rows() {
            return Err(Error::InvalidData(format!(
                "inputs/targets row count mismatch: {} vs {}",
                inputs.rows(),
                targets.rows()
            )));
        }
        Ok(Self { inputs, targets })
    }

    /// Build a dataset from per-sample rows.
    pub fn from_rows(inputs: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<Self> {
        Self::new(Matrix::from_rows(inputs)?, Matrix::from_rows(targets)?)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.rows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.inputs.cols()
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.targets.cols()
    }

    #[inline]
    pub fn inputs(&self) -> &Matrix {
        &self.inputs
    }

    #[inline]
    pub fn targets(&self) -> &Matrix {
        &self.targets
    }

    pub fn into_parts(self) -> (Matrix, Matrix) {
        (self.inputs, self.targets)
    }

    /// Split into `(train, holdout)` datasets.
    pub fn split(&self, train_frac: f64, split: Split) -> Result<(Dataset, Dataset)> {
        let (train_idx, holdout_idx) = split_indices(self.len(), train_frac, split)?;
        Ok((self.select(&train_idx), self.select(&holdout_idx)))
    }

    fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            inputs: self.inputs.gather_rows(indices),
            targets: self.targets.gather_rows(indices),
        }
    }
}

/// Zero-padded `(sentences, timesteps, dim)` tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceTensor {
    data: Vec<f32>,
    sentences: usize,
    timesteps: usize,
    dim: usize,
}

impl SentenceTensor {
    pub fn zeros(sentences: usize, timesteps: usize, dim: usize) -> Self {
        Self {
            data: vec![0.0; sentences * timesteps * dim],
            sentences,
            timesteps,
            dim,
        }
    }

    #[inline]
    pub fn sentences(&self) -> usize {
        self.sentences
    }

    #[inline]
    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Copy sentence `idx` out as a `(timesteps, dim)` matrix.
    pub fn sentence(&self, idx: usize) -> Result<Matrix> {
        self.check_index(idx)?;
        let block = self.timesteps * self.dim;
        let start = idx * block;
        Matrix::from_flat(self.data[start..start + block].to_vec(), self.dim)
    }

    /// Overwrite sentence `idx` with `values`, which must be `(timesteps, dim)`.
    pub fn set_sentence(&mut self, idx: usize, values: &Matrix) -> Result<()> {
        if values.shape() != (self.timesteps, self.dim) {
            return Err(Error::InvalidShape(format!(
                "sentence matrix has shape {:?}, expected ({}, {})",
                values.shape(),
                self.timesteps,
                self.dim
            )));
        }
        self.check_index(idx)?;
        let block = self.timesteps * self.dim;
        self.data[idx * block..(idx + 1) * block].copy_from_slice(values.as_slice());
        Ok(())
    }

    fn check_index(&self, idx: usize) -> Result<()> {
        if idx >= self.sentences {
            return Err(Error::InvalidShape(format!(
                "sentence index {idx} out of bounds for {} sentences",
                self.sentences
            )));
        }
        Ok(())
    }

    /// Copy the listed sentences (in that order) into a new tensor.
    pub fn select(&self, indices: &[usize]) -> SentenceTensor {
        let block = self.timesteps * self.dim;
        let mut data = Vec::with_capacity(indices.len() * block);
        for &i in indices {
            data.extend_from_slice(&self.data[i * block..(i + 1) * block]);
        }
        SentenceTensor {
            data,
            sentences: indices.len(),
            timesteps: self.timesteps,
            dim: self.dim,
        }
    }

    /// Reshape to `(sentences * timesteps, dim)`.
    pub fn flatten(&self) -> Result<Matrix> {
        Matrix::from_flat(self.data.clone(), self.dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_split_keeps_row_order() {
        let ds = Dataset::from_rows(
            &[vec![0.0], vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
            &[vec![0.0], vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
        )
        .unwrap();
        let (train, holdout) = ds.split(0.8, Split::Ordered).unwrap();
        assert_eq!(train.len(), 4);
        assert_eq!(holdout.len(), 1);
        assert_eq!(holdout.inputs().row(0), &[4.0]);
    }

    #[test]
    fn seeded_split_is_deterministic_and_a_partition() {
        let (a_train, a_hold) = split_indices(50, 0.8, Split::Seeded(7)).unwrap();
        let (b_train, b_hold) = split_indices(50, 0.8, Split::Seeded(7)).unwrap();
        assert_eq!(a_train, b_train);
        assert_eq!(a_hold, b_hold);

        let mut all: Vec<usize> = a_train.iter().chain(&a_hold).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn split_rejects_bad_fraction() {
        assert!(split_indices(10, 0.0, Split::Ordered).is_err());
        assert!(split_indices(10, 1.5, Split::Ordered).is_err());
        assert!(split_indices(1, 0.5, Split::Ordered).is_err());
    }

    #[test]
    fn sentence_tensor_flattens_row_major() {
        let mut t = SentenceTensor::zeros(2, 3, 2);
        let s = Matrix::from_flat(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2).unwrap();
        t.set_sentence(1, &s).unwrap();

        let flat = t.flatten().unwrap();
        assert_eq!(flat.shape(), (6, 2));
        assert_eq!(flat.row(3), &[1.0, 2.0]);
        assert_eq!(flat.row(0), &[0.0, 0.0]);
        assert_eq!(t.sentence(1).unwrap(), s);
    }

    #[test]
    fn sentence_index_out_of_range_is_an_error() {
        let mut t = SentenceTensor::zeros(2, 3, 2);
        assert!(matches!(t.sentence(2), Err(Error::InvalidShape(_))));
        assert!(matches!(t.sentence(usize::MAX), Err(Error::InvalidShape(_))));
        let s = Matrix::zeros(3, 2);
        assert!(matches!(t.set_sentence(2, &s), Err(Error::InvalidShape(_))));
        assert_eq!(t.sentence(0).unwrap(), s);
    }
}
