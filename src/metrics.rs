//! Batch metrics over row vectors.
//!
//! `cms` (mean absolute cosine similarity) is the accuracy measure of the cosine
//! objective; `rms` is the accuracy measure of the Gaussian (MSE) objective.
//! Rows with zero norm have no direction, so every cosine helper takes a `ZeroNorm`
//! policy instead of producing NaN.

use crate::{Error, Matrix, Result};

/// What to do with a zero-norm row when computing a cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroNorm {
    /// Fail with `Error::DegenerateVector`.
    #[default]
    Reject,
    /// Treat the similarity as 0 (and its gradient as 0).
    Zero,
}

/// Cosine similarity of two equal-length vectors, or `None` if either has zero norm.
#[inline]
pub fn cosine_similarity(x: &[f32], y: &[f32]) -> Option<f32> {
    debug_assert_eq!(x.len(), y.len());
    let (dot, xx, yy) = dot_and_norms(x, y);
    if xx == 0.0 || yy == 0.0 {
        return None;
    }
    Some(dot / (xx.sqrt() * yy.sqrt()))
}

#[inline]
fn dot_and_norms(x: &[f32], y: &[f32]) -> (f32, f32, f32) {
    let mut dot = 0.0_f32;
    let mut xx = 0.0_f32;
    let mut yy = 0.0_f32;
    for (&a, &b) in x.iter().zip(y) {
        dot = a.mul_add(b, dot);
        xx = a.mul_add(a, xx);
        yy = b.mul_add(b, yy);
    }
    (dot, xx, yy)
}

pub(crate) fn check_same_shape(preds: &Matrix, targets: &Matrix) -> Result<()> {
    if preds.cols() != targets.cols() {
        return Err(Error::ShapeMismatch {
            what: "target columns",
            expected: preds.cols(),
            actual: targets.cols(),
        });
    }
    if preds.rows() != targets.rows() {
        return Err(Error::ShapeMismatch {
            what: "target rows",
            expected: preds.rows(),
            actual: targets.rows(),
        });
    }
    Ok(())
}

/// Per-row cosine similarity `dot(x, y) / (|x| * |y|)` of two equal-shape batches.
pub fn mat_cosine_dist(x: &Matrix, y: &Matrix, zero_norm: ZeroNorm) -> Result<Vec<f32>> {
    check_same_shape(x, y)?;
    x.iter_rows()
        .zip(y.iter_rows())
        .enumerate()
        .map(|(row, (a, b))| match (cosine_similarity(a, b), zero_norm) {
            (Some(c), _) => Ok(c),
            (None, ZeroNorm::Zero) => Ok(0.0),
            (None, ZeroNorm::Reject) => Err(Error::DegenerateVector { row }),
        })
        .collect()
}

/// Mean absolute cosine similarity: `|Σ cos(pred_i, target_i)| / n`.
pub fn cms(preds: &Matrix, targets: &Matrix, zero_norm: ZeroNorm) -> Result<f32> {
    if preds.is_empty() {
        return Err(Error::InvalidData("cms of an empty batch".to_owned()));
    }
    let sims = mat_cosine_dist(preds, targets, zero_norm)?;
    Ok(sims.iter().sum::<f32>().abs() / preds.rows() as f32)
}

/// Root mean squared error over every element of the batch.
pub fn rms(preds: &Matrix, targets: &Matrix) -> Result<f32> {
    check_same_shape(preds, targets)?;
    if preds.is_empty() {
        return Err(Error::InvalidData("rms of an empty batch".to_owned()));
    }
    let mut sum_sq = 0.0_f32;
    for (&p, &t) in preds.as_slice().iter().zip(targets.as_slice()) {
        let diff = p - t;
        sum_sq = diff.mul_add(diff, sum_sq);
    }
    Ok((sum_sq / preds.as_slice().len() as f32).sqrt())
}

/// Sum of per-row cosine similarities and its gradient w.r.t. `preds`.
///
/// Writes `d(Σ cos)/d(preds)` into `d_preds` (same shape as `preds`).
/// For `c = p·y / (|p||y|)`: `dc/dp = y / (|p||y|) - c * p / |p|²`.
pub(crate) fn cosine_sum_backward(
    preds: &Matrix,
    targets: &Matrix,
    zero_norm: ZeroNorm,
    d_preds: &mut Matrix,
) -> Result<f32> {
    check_same_shape(preds, targets)?;
    debug_assert_eq!(preds.shape(), d_preds.shape());

    let mut sum = 0.0_f32;
    for row in 0..preds.rows() {
        let p = preds.row(row);
        let y = targets.row(row);
        let d = d_preds.row_mut(row);

        let (dot, pp, yy) = dot_and_norms(p, y);
        if pp == 0.0 || yy == 0.0 {
            match zero_norm {
                ZeroNorm::Zero => {
                    d.fill(0.0);
                    continue;
                }
                ZeroNorm::Reject => return Err(Error::DegenerateVector { row }),
            }
        }

        let p_norm = pp.sqrt();
        let y_norm = yy.sqrt();
        let c = dot / (p_norm * y_norm);
        sum += c;

        let inv_py = 1.0 / (p_norm * y_norm);
        let c_over_pp = c / pp;
        for i in 0..p.len() {
            d[i] = y[i] * inv_py - c_over_pp * p[i];
        }
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[Vec<f32>]) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    #[test]
    fn orthogonal_identical_and_opposite_rows() {
        let x = m(&[vec![1.0, 0.0], vec![0.0, 2.0], vec![3.0, 4.0]]);
        let y = m(&[vec![0.0, 5.0], vec![0.0, 1.0], vec![-3.0, -4.0]]);
        let sims = mat_cosine_dist(&x, &y, ZeroNorm::Reject).unwrap();
        assert!(sims[0].abs() < 1e-6);
        assert!((sims[1] - 1.0).abs() < 1e-6);
        assert!((sims[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_norm_rows_follow_policy() {
        let x = m(&[vec![1.0, 0.0], vec![0.0, 0.0]]);
        let y = m(&[vec![1.0, 0.0], vec![1.0, 1.0]]);

        let err = mat_cosine_dist(&x, &y, ZeroNorm::Reject).unwrap_err();
        assert_eq!(err, Error::DegenerateVector { row: 1 });

        let sims = mat_cosine_dist(&x, &y, ZeroNorm::Zero).unwrap();
        assert_eq!(sims, vec![1.0, 0.0]);
    }

    #[test]
    fn cms_is_invariant_to_positive_scaling() {
        let x = m(&[vec![1.0, 2.0, -1.0], vec![0.5, -0.3, 2.0]]);
        let y = m(&[vec![0.3, 2.0, 1.0], vec![-1.0, 0.2, 0.7]]);
        let base = cms(&x, &y, ZeroNorm::Reject).unwrap();

        let mut xs = x.clone();
        xs.scale(7.5);
        let mut ys = y.clone();
        ys.scale(0.01);
        assert!((cms(&xs, &y, ZeroNorm::Reject).unwrap() - base).abs() < 1e-5);
        assert!((cms(&x, &ys, ZeroNorm::Reject).unwrap() - base).abs() < 1e-5);
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let x = m(&[vec![1.0, 2.0]]);
        let y = m(&[vec![1.0, 2.0, 3.0]]);
        assert!(matches!(
            cms(&x, &y, ZeroNorm::Reject),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rms_matches_hand_computation() {
        let x = m(&[vec![1.0, 3.0]]);
        let y = m(&[vec![2.0, 1.0]]);
        // sqrt((1 + 4) / 2)
        assert!((rms(&x, &y).unwrap() - 2.5_f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn cosine_backward_matches_numeric_gradient() {
        let preds = m(&[vec![0.4, -1.2, 0.7], vec![1.0, 0.1, -0.3]]);
        let targets = m(&[vec![0.2, 0.5, 1.0], vec![-0.4, 0.9, 0.3]]);
        let mut d = Matrix::zeros(2, 3);
        cosine_sum_backward(&preds, &targets, ZeroNorm::Reject, &mut d).unwrap();

        let eps = 1e-3_f32;
        for idx in 0..preds.as_slice().len() {
            let mut plus = preds.clone();
            plus.as_mut_slice()[idx] += eps;
            let mut minus = preds.clone();
            minus.as_mut_slice()[idx] -= eps;
            let f = |p: &Matrix| -> f32 {
                mat_cosine_dist(p, &targets, ZeroNorm::Reject)
                    .unwrap()
                    .iter()
                    .sum()
            };
            let numeric = (f(&plus) - f(&minus)) / (2.0 * eps);
            let analytic = d.as_slice()[idx];
            assert!(
                (numeric - analytic).abs() < 1e-2,
                "idx={idx} numeric={numeric} analytic={analytic}"
            );
        }
    }
}
