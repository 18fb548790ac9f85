use serde::{Deserialize, Serialize};

use crate::{Error, Matrix, Result};

/// Number of neighboring timesteps concatenated before and after each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Window {
    pub before: usize,
    pub after: usize,
}

impl Window {
    pub fn new(before: usize, after: usize) -> Self {
        Self { before, after }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.before == 0 && self.after == 0
    }

    /// Rows per window, the center row included.
    #[inline]
    pub fn span(self) -> usize {
        self.before + self.after + 1
    }
}

/// Concatenate every row with its `before` predecessors and `after` successors.
///
/// Rows without a full window are dropped, so an `N`-row input yields
/// `N - before - after` rows of width `cols * span`. Output row `r` covers input rows
/// `r ..= r + before + after`. An empty window returns the input unchanged.
pub fn window_features(features: &Matrix, window: Window) -> Result<Matrix> {
    if window.is_empty() {
        return Ok(features.clone());
    }
    let n = features.rows();
    if n < window.span() {
        return Err(Error::InvalidShape(format!(
            "{n} rows are too few for a window of {} rows",
            window.span()
        )));
    }

    let cols = features.cols();
    let out_rows = n - window.span() + 1;
    let mut out = Matrix::zeros(out_rows, cols * window.span());
    for r in 0..out_rows {
        out.row_mut(r)
            .copy_from_slice(&features.as_slice()[r * cols..(r + window.span()) * cols]);
    }
    Ok(out)
}

/// Window `features` and keep the target of each window's center row.
pub fn window_featurizer(features: &Matrix, targets: &Matrix, window: Window) -> Result<(Matrix, Matrix)> {
    if features.rows() != targets.rows() {
        return Err(Error::ShapeMismatch {
            what: "target rows",
            expected: features.rows(),
            actual: targets.rows(),
        });
    }
    if window.is_empty() {
        return Ok((features.clone(), targets.clone()));
    }
    let windowed = window_features(features, window)?;
    let centers = window.before..window.before + windowed.rows();
    Ok((windowed, targets.slice_rows(centers)))
}
