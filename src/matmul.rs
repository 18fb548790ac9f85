//! Small GEMM wrapper used by the batched forward and backward passes.
//!
//! - default: a simple, safe triple-loop implementation
//! - optional: a faster backend via the `matrixmultiply` feature
//!
//! All buffers are row-major. The three entry points cover the products a dense
//! layer needs: `X·W`, `Xᵀ·G` and `G·Wᵀ`.

/// `c = alpha * a·b + beta * c` with arbitrary strides.
#[allow(clippy::too_many_arguments)]
#[inline]
fn gemm_f32(
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    a: &[f32],
    rsa: usize,
    csa: usize,
    b: &[f32],
    rsb: usize,
    csb: usize,
    beta: f32,
    c: &mut [f32],
    rsc: usize,
    csc: usize,
) {
    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        for v in c.iter_mut() {
            *v *= beta;
        }
        return;
    }

    #[cfg(feature = "matrixmultiply")]
    {
        // SAFETY: callers pass buffers sized for the given shapes and strides.
        unsafe {
            matrixmultiply::sgemm(
                m,
                k,
                n,
                alpha,
                a.as_ptr(),
                rsa as isize,
                csa as isize,
                b.as_ptr(),
                rsb as isize,
                csb as isize,
                beta,
                c.as_mut_ptr(),
                rsc as isize,
                csc as isize,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0_f32;
            let a0 = i * rsa;
            let b0 = j * csb;

            for p in 0..k {
                acc = a[a0 + p * csa].mul_add(b[p * rsb + b0], acc);
            }

            let idx = i * rsc + j * csc;
            c[idx] = alpha * acc + beta * c[idx];
        }
    }
}

/// `c (m×n) = a (m×k) · b (k×n)`, overwriting `c`.
pub(crate) fn matmul(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), k * n);
    debug_assert_eq!(c.len(), m * n);
    gemm_f32(m, n, k, 1.0, a, k, 1, b, n, 1, 0.0, c, n, 1);
}

/// `c (k×n) += aᵀ · g`, where `a` is `(m×k)` and `g` is `(m×n)`.
pub(crate) fn matmul_at_b_acc(a: &[f32], g: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(g.len(), m * n);
    debug_assert_eq!(c.len(), k * n);
    // aᵀ has shape (k×m) with row stride 1 and column stride k.
    gemm_f32(k, n, m, 1.0, a, 1, k, g, n, 1, 1.0, c, n, 1);
}

/// `c (m×k) = g · wᵀ`, where `g` is `(m×n)` and `w` is `(k×n)`, overwriting `c`.
pub(crate) fn matmul_a_bt(g: &[f32], w: &[f32], c: &mut [f32], m: usize, n: usize, k: usize) {
    debug_assert_eq!(g.len(), m * n);
    debug_assert_eq!(w.len(), k * n);
    debug_assert_eq!(c.len(), m * k);
    // wᵀ has shape (n×k) with row stride 1 and column stride n.
    gemm_f32(m, k, n, 1.0, g, n, 1, w, 1, n, 0.0, c, k, 1);
}
