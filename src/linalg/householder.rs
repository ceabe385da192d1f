use alloc::vec::Vec;
use core::ops::Range;

use num_traits::Zero;

use crate::dense::DynMatrix;
use crate::traits::{LinalgScalar, MatrixMut};

/// Compute a Householder reflector for `x` in place.
///
/// On return `x[0]` holds the new leading entry `-sigma` and `x[1..]` holds
/// the tail of `v` (the leading `1` is implicit). The returned `beta` is
/// real-valued, so `H = I - beta * v * v^H` is Hermitian and unitary, and
/// `H * x_original = [-sigma, 0, ..., 0]`.
///
/// When the tail is already zero the reflection is the identity: `beta` is
/// zero, `x` is left untouched and nothing is divided. Every non-trivial
/// reflection negates `det`.
///
/// ```
/// use bandeq::linalg::householder::{make_reflector, reflect};
///
/// let orig = [3.0_f64, 4.0];
/// let mut x = orig;
/// let mut det = 1.0;
/// let beta = make_reflector(&mut x, &mut det);
/// assert!((x[0].abs() - 5.0).abs() < 1e-12);
/// assert_eq!(det, -1.0);
///
/// let mut y = orig;
/// reflect(&x[1..], beta, &mut y);
/// assert!((y[0] - x[0]).abs() < 1e-12);
/// assert!(y[1].abs() < 1e-12);
/// ```
pub fn make_reflector<T: LinalgScalar>(x: &mut [T], det: &mut T) -> T {
    let Some((&mut alpha, tail)) = x.split_first_mut() else {
        return T::zero();
    };

    let mut tail_sq = <T::Real as Zero>::zero();
    for &v in tail.iter() {
        tail_sq = tail_sq + v.modulus_sq();
    }
    if tail_sq == <T::Real as Zero>::zero() {
        return T::zero();
    }

    let norm = (alpha.modulus_sq() + tail_sq).lsqrt();
    // sigma shares the phase of alpha so v0 = alpha + sigma cannot cancel.
    let sigma = T::from_real(norm) * alpha.phase();
    let v0 = alpha + sigma;
    let beta = v0 / sigma;

    let inv_v0 = T::one() / v0;
    for v in tail.iter_mut() {
        *v = *v * inv_v0;
    }
    x[0] = T::zero() - sigma;
    *det = T::zero() - *det;
    beta
}

/// Apply `H = I - beta * v * v^H` to `y`, where `v = [1, v_tail...]`.
///
/// `y` must have length `v_tail.len() + 1`.
#[inline]
pub fn reflect<T: LinalgScalar>(v_tail: &[T], beta: T, y: &mut [T]) {
    debug_assert_eq!(y.len(), v_tail.len() + 1);
    if beta == T::zero() {
        return;
    }
    let (y0, rest) = match y.split_first_mut() {
        Some(p) => p,
        None => return,
    };
    let mut dot = *y0;
    for (v, yi) in v_tail.iter().zip(rest.iter()) {
        dot = dot + v.conj() * *yi;
    }
    dot = dot * beta;
    *y0 = *y0 - dot;
    for (v, yi) in v_tail.iter().zip(rest.iter_mut()) {
        *yi = *yi - dot * *v;
    }
}

/// Apply a stored reflector to rows `row0..row0 + v_tail.len() + 1` of
/// each column in `cols`.
pub fn reflect_cols<T: LinalgScalar>(
    v_tail: &[T],
    beta: T,
    m: &mut impl MatrixMut<T>,
    row0: usize,
    cols: Range<usize>,
) {
    if beta == T::zero() {
        return;
    }
    let len = v_tail.len() + 1;
    for c in cols {
        let col = m.col_as_mut_slice(c, row0);
        reflect(v_tail, beta, &mut col[..len]);
    }
}

/// Accumulate `count` reflectors into an explicit `nrows x ncols` matrix
/// `H_0 * H_1 * ... * H_{count-1} * I`.
///
/// `load(j, tail)` must fill `tail` with the stored tail of reflector `j`
/// (which acts on rows `j..j + tail.len() + 1`) and return its `beta`.
pub fn form_q<T: LinalgScalar>(
    nrows: usize,
    ncols: usize,
    count: usize,
    mut load: impl FnMut(usize, &mut Vec<T>) -> T,
) -> DynMatrix<T> {
    let mut q = DynMatrix::zeros(nrows, ncols, T::zero());
    for i in 0..nrows.min(ncols) {
        q[(i, i)] = T::one();
    }
    let mut tail = Vec::new();
    for j in (0..count).rev() {
        tail.clear();
        let beta = load(j, &mut tail);
        // Columns left of j are still unit vectors with no support in rows >= j.
        reflect_cols(&tail, beta, &mut q, j, j..ncols);
    }
    q
}
