//! Triangular solves against banded triangles.
//!
//! Solves `T X = B` in place, where `T` is the lower or upper triangle of a
//! square [`BandView`] and `B` is a column-major [`DynMatrix`]. Only the
//! diagonals inside the band are touched.
//!
//! Kernel selection depends on the size of the (sub-)triangle:
//! - up to `tuning.small`: explicit inverse of the tiny triangle, then a
//!   small dense multiply;
//! - up to `tuning.recursion_threshold`: a plain substitution loop, row
//!   oriented when `T` is row-major and column oriented otherwise;
//! - larger: split into two triangles and a rectangular coupling block,
//!   solve recursively, and subtract the coupling product inside the band.

use crate::band::{BandView, StorageOrder};
use crate::dense::DynMatrix;
use crate::linalg::tuning::{blocksize, join_raw, Parallelism, Tuning};
use crate::linalg::LinalgError;
use crate::traits::LinalgScalar;

/// Which triangle of the band is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uplo {
    Lower,
    Upper,
}

/// Whether the diagonal is read or taken to be all ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    /// Implicit unit diagonal. The stored diagonal is never read.
    Unit,
    NonUnit,
}

/// Contiguous range of columns of a column-major matrix.
struct ColsMut<'a, T> {
    data: &'a mut [T],
    nrows: usize,
    ncols: usize,
}

impl<'a, T> ColsMut<'a, T> {
    fn new(data: &'a mut [T], nrows: usize, ncols: usize) -> Self {
        debug_assert_eq!(data.len(), nrows * ncols);
        Self { data, nrows, ncols }
    }

    fn split_at(self, col: usize) -> (ColsMut<'a, T>, ColsMut<'a, T>) {
        let (left, right) = self.data.split_at_mut(col * self.nrows);
        (
            ColsMut::new(left, self.nrows, col),
            ColsMut::new(right, self.nrows, self.ncols - col),
        )
    }

    #[inline]
    fn col_mut(&mut self, c: usize) -> &mut [T] {
        let n = self.nrows;
        &mut self.data[c * n..(c + 1) * n]
    }
}

/// Solve `T X = B` in place, overwriting `b` with `X`.
///
/// Panics if `t` is not square or `b` has the wrong number of rows.
///
/// ```
/// use bandeq::{BandMatrix, DynMatrix, StorageOrder};
/// use bandeq::linalg::{trisolve, Tuning};
/// use bandeq::linalg::trisolve::{DiagKind, Uplo};
///
/// // Upper bidiagonal: 2 on the diagonal, 1 above.
/// let t = BandMatrix::from_fn(3, 3, 0, 1, StorageOrder::ColMajor, |i, j| {
///     if i == j { 2.0_f64 } else { 1.0 }
/// });
/// let mut b = DynMatrix::from_rows(3, 1, &[3.0, 3.0, 2.0]);
/// trisolve::solve_in_place(&t.view(), Uplo::Upper, DiagKind::NonUnit, &mut b, &Tuning::default());
/// assert_eq!(b.as_slice(), &[1.0, 1.0, 1.0]);
/// ```
pub fn solve_in_place<T: LinalgScalar>(
    t: &BandView<'_, T>,
    uplo: Uplo,
    diag: DiagKind,
    b: &mut DynMatrix<T>,
    tuning: &Tuning,
) {
    assert!(
        t.is_square(),
        "triangular solve requires a square band, got {}x{}",
        t.nrows(),
        t.ncols()
    );
    assert_eq!(
        b.nrows(),
        t.nrows(),
        "right-hand side has {} rows, triangle has {}",
        b.nrows(),
        t.nrows()
    );
    let (n, k) = (b.nrows(), b.ncols());
    let cols = ColsMut::new(b.as_mut_slice(), n, k);
    solve_cols(t, uplo, diag, cols, tuning, tuning.parallelism);
}

/// Solve `T x = b` for a single vector in place.
pub fn solve_vec_in_place<T: LinalgScalar>(
    t: &BandView<'_, T>,
    uplo: Uplo,
    diag: DiagKind,
    x: &mut [T],
) {
    assert!(t.is_square(), "triangular solve requires a square band");
    assert_eq!(x.len(), t.nrows(), "vector length mismatch");
    let n = x.len();
    let mut cols = ColsMut::new(x, n, 1);
    solve_rec(t, uplo, diag, &mut cols, 0, n, &Tuning::default());
}

/// Checked variant of [`solve_in_place`]: returns `Err(Singular)` before
/// touching `b` if a non-unit diagonal entry is exactly zero.
pub fn try_solve_in_place<T: LinalgScalar>(
    t: &BandView<'_, T>,
    uplo: Uplo,
    diag: DiagKind,
    b: &mut DynMatrix<T>,
    tuning: &Tuning,
) -> Result<(), LinalgError> {
    if diag == DiagKind::NonUnit && has_zero_diagonal(t) {
        return Err(LinalgError::Singular);
    }
    solve_in_place(t, uplo, diag, b, tuning);
    Ok(())
}

/// Dense inverse of the triangle.
pub fn invert<T: LinalgScalar>(
    t: &BandView<'_, T>,
    uplo: Uplo,
    diag: DiagKind,
    tuning: &Tuning,
) -> Result<DynMatrix<T>, LinalgError> {
    let mut x = DynMatrix::eye(t.nrows(), T::zero());
    try_solve_in_place(t, uplo, diag, &mut x, tuning)?;
    Ok(x)
}

pub(crate) fn has_zero_diagonal<T: LinalgScalar>(t: &BandView<'_, T>) -> bool {
    t.diag(0).iter().any(|d| d == T::zero())
}

fn solve_cols<T: LinalgScalar>(
    t: &BandView<'_, T>,
    uplo: Uplo,
    diag: DiagKind,
    b: ColsMut<'_, T>,
    tuning: &Tuning,
    parallelism: Parallelism,
) {
    let n = t.nrows();
    let k = b.ncols;
    let parallel = !matches!(parallelism, Parallelism::None);
    if parallel && k >= 2 && n.saturating_mul(n).saturating_mul(k) > tuning.par_min_work {
        let block = tuning.par_block.max(1);
        let mut mid = (k / 2 + block - 1) / block * block;
        if mid >= k {
            mid = k / 2;
        }
        let (left, right) = b.split_at(mid);
        join_raw(
            |par| solve_cols(t, uplo, diag, left, tuning, par),
            |par| solve_cols(t, uplo, diag, right, tuning, par),
            parallelism,
        );
        return;
    }
    let mut b = b;
    solve_rec(t, uplo, diag, &mut b, 0, n, tuning);
}

fn solve_rec<T: LinalgScalar>(
    t: &BandView<'_, T>,
    uplo: Uplo,
    diag: DiagKind,
    b: &mut ColsMut<'_, T>,
    off: usize,
    len: usize,
    tuning: &Tuning,
) {
    if len == 0 {
        return;
    }
    if len <= tuning.small.min(4) {
        small_solve(t, uplo, diag, b, off, len);
        return;
    }
    if len <= tuning.recursion_threshold {
        loop_solve(t, uplo, diag, b, off, len);
        return;
    }

    let bs = blocksize(len);
    match uplo {
        Uplo::Lower => {
            solve_rec(t, uplo, diag, b, off, bs, tuning);
            update_lower(t, b, off, bs, len);
            solve_rec(t, uplo, diag, b, off + bs, len - bs, tuning);
        }
        Uplo::Upper => {
            solve_rec(t, uplo, diag, b, off + bs, len - bs, tuning);
            update_upper(t, b, off, bs, len);
            solve_rec(t, uplo, diag, b, off, bs, tuning);
        }
    }
}

/// `B[bottom] -= T[bottom, top] * B[top]`, restricted to the rows the
/// band reaches.
fn update_lower<T: LinalgScalar>(
    t: &BandView<'_, T>,
    b: &mut ColsMut<'_, T>,
    off: usize,
    bs: usize,
    len: usize,
) {
    let lo = t.nlo();
    let split = off + bs;
    let row_end = (off + len).min(split + lo);
    for c in 0..b.ncols {
        let x = b.col_mut(c);
        for r in split..row_end {
            let mut s = x[r];
            for j in r.saturating_sub(lo).max(off)..split {
                s = s - t.at(r, j) * x[j];
            }
            x[r] = s;
        }
    }
}

/// `B[top] -= T[top, bottom] * B[bottom]`, restricted to the rows the
/// band reaches.
fn update_upper<T: LinalgScalar>(
    t: &BandView<'_, T>,
    b: &mut ColsMut<'_, T>,
    off: usize,
    bs: usize,
    len: usize,
) {
    let hi = t.nhi();
    let split = off + bs;
    let end = off + len;
    let row_start = split.saturating_sub(hi).max(off);
    for c in 0..b.ncols {
        let x = b.col_mut(c);
        for r in row_start..split {
            let mut s = x[r];
            for j in split..end.min(r + hi + 1) {
                s = s - t.at(r, j) * x[j];
            }
            x[r] = s;
        }
    }
}

fn loop_solve<T: LinalgScalar>(
    t: &BandView<'_, T>,
    uplo: Uplo,
    diag: DiagKind,
    b: &mut ColsMut<'_, T>,
    off: usize,
    len: usize,
) {
    let unit = diag == DiagKind::Unit;
    let by_rows = t.storage_order() == StorageOrder::RowMajor;
    let (lo, hi) = (t.nlo(), t.nhi());
    let end = off + len;
    for c in 0..b.ncols {
        let x = b.col_mut(c);
        match (uplo, by_rows) {
            (Uplo::Lower, true) => {
                for i in off..end {
                    let mut s = x[i];
                    for j in i.saturating_sub(lo).max(off)..i {
                        s = s - t.at(i, j) * x[j];
                    }
                    x[i] = if unit { s } else { s / t.at(i, i) };
                }
            }
            (Uplo::Lower, false) => {
                for j in off..end {
                    if !unit {
                        x[j] = x[j] / t.at(j, j);
                    }
                    let xj = x[j];
                    if xj == T::zero() {
                        continue;
                    }
                    for i in (j + 1)..end.min(j + lo + 1) {
                        x[i] = x[i] - t.at(i, j) * xj;
                    }
                }
            }
            (Uplo::Upper, true) => {
                for i in (off..end).rev() {
                    let mut s = x[i];
                    for j in (i + 1)..end.min(i + hi + 1) {
                        s = s - t.at(i, j) * x[j];
                    }
                    x[i] = if unit { s } else { s / t.at(i, i) };
                }
            }
            (Uplo::Upper, false) => {
                for j in (off..end).rev() {
                    if !unit {
                        x[j] = x[j] / t.at(j, j);
                    }
                    let xj = x[j];
                    if xj == T::zero() {
                        continue;
                    }
                    for i in j.saturating_sub(hi).max(off)..j {
                        x[i] = x[i] - t.at(i, j) * xj;
                    }
                }
            }
        }
    }
}

/// Invert the `len x len` triangle at `off` explicitly (`len <= 4`) and
/// multiply each right-hand-side column by it.
fn small_solve<T: LinalgScalar>(
    t: &BandView<'_, T>,
    uplo: Uplo,
    diag: DiagKind,
    b: &mut ColsMut<'_, T>,
    off: usize,
    len: usize,
) {
    debug_assert!(len <= 4);
    let unit = diag == DiagKind::Unit;
    let inv_diag = |i: usize| {
        if unit {
            T::one()
        } else {
            T::one() / t.at(off + i, off + i)
        }
    };
    // Entries outside the band read as zero.
    let tij = |i: usize, j: usize| t.get(off + i, off + j);

    // Row-major 4x4 scratch: inv[i * 4 + j].
    let mut inv = [T::zero(); 16];
    match uplo {
        Uplo::Lower => {
            for j in 0..len {
                inv[j * 4 + j] = inv_diag(j);
                for i in (j + 1)..len {
                    let mut s = T::zero();
                    for k in j..i {
                        s = s + tij(i, k) * inv[k * 4 + j];
                    }
                    inv[i * 4 + j] = (T::zero() - s) * inv_diag(i);
                }
            }
        }
        Uplo::Upper => {
            for j in 0..len {
                inv[j * 4 + j] = inv_diag(j);
                for i in (0..j).rev() {
                    let mut s = T::zero();
                    for k in (i + 1)..=j {
                        s = s + tij(i, k) * inv[k * 4 + j];
                    }
                    inv[i * 4 + j] = (T::zero() - s) * inv_diag(i);
                }
            }
        }
    }

    let mut y = [T::zero(); 4];
    for c in 0..b.ncols {
        let x = &mut b.col_mut(c)[off..off + len];
        for i in 0..len {
            let (k0, k1) = match uplo {
                Uplo::Lower => (0, i + 1),
                Uplo::Upper => (i, len),
            };
            let mut s = T::zero();
            for k in k0..k1 {
                s = s + inv[i * 4 + k] * x[k];
            }
            y[i] = s;
        }
        x.copy_from_slice(&y[..len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::BandMatrix;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_triangle(
        rng: &mut StdRng,
        n: usize,
        uplo: Uplo,
        width: usize,
        order: StorageOrder,
    ) -> BandMatrix<f64> {
        let (lo, hi) = match uplo {
            Uplo::Lower => (width, 0),
            Uplo::Upper => (0, width),
        };
        let mut a = BandMatrix::zeros(n, n, lo, hi, order);
        for j in 0..n {
            for i in a.storage().col_range(j) {
                a[(i, j)] = if i == j {
                    rng.gen_range(2.0..4.0)
                } else {
                    rng.gen_range(-1.0..1.0)
                };
            }
        }
        a
    }

    fn check_solve(t: &BandMatrix<f64>, uplo: Uplo, diag: DiagKind, tuning: &Tuning) {
        let n = t.nrows();
        let mut rng = StdRng::seed_from_u64(7);
        let b = DynMatrix::from_fn(n, 3, |_, _| rng.gen_range(-1.0..1.0));
        let mut x = b.clone();
        solve_in_place(&t.view(), uplo, diag, &mut x, tuning);

        let mut dense = t.to_dense();
        if diag == DiagKind::Unit {
            for i in 0..n {
                dense[(i, i)] = 1.0;
            }
        }
        let r = &(&dense * &x) - &b;
        assert!(
            r.max_abs() < 1e-12 * (1.0 + x.max_abs()),
            "residual {} for {:?} {:?} n={}",
            r.max_abs(),
            uplo,
            diag,
            n
        );
    }

    #[test]
    fn all_kernels_agree_with_dense() {
        let mut rng = StdRng::seed_from_u64(42);
        let tunings = [
            Tuning::default(),
            Tuning::default().with_small(0).with_recursion_threshold(1),
            Tuning::default().with_small(0).with_recursion_threshold(1000),
            Tuning::default().with_recursion_threshold(8),
        ];
        for &uplo in &[Uplo::Lower, Uplo::Upper] {
            for &order in &[
                StorageOrder::ColMajor,
                StorageOrder::RowMajor,
                StorageOrder::DiagMajor,
            ] {
                for &(n, w) in &[(1, 0), (3, 1), (4, 3), (9, 2), (40, 3), (70, 1)] {
                    let t = random_triangle(&mut rng, n, uplo, w, order);
                    for tuning in &tunings {
                        check_solve(&t, uplo, DiagKind::NonUnit, tuning);
                        check_solve(&t, uplo, DiagKind::Unit, tuning);
                    }
                }
            }
        }
    }

    #[test]
    fn unit_mode_never_reads_diagonal() {
        let t = BandMatrix::from_fn(6, 6, 2, 0, StorageOrder::ColMajor, |i, j| {
            if i == j {
                f64::NAN
            } else {
                0.5
            }
        });
        for tuning in &[
            Tuning::default(),
            Tuning::default().with_small(0).with_recursion_threshold(1),
        ] {
            let mut b = DynMatrix::from_fn(6, 2, |i, _| i as f64);
            solve_in_place(&t.view(), Uplo::Lower, DiagKind::Unit, &mut b, tuning);
            assert!(b.as_slice().iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn transposed_view_solves_transpose() {
        let mut rng = StdRng::seed_from_u64(3);
        let l = random_triangle(&mut rng, 12, Uplo::Lower, 2, StorageOrder::ColMajor);
        let lt = l.view().transpose();
        assert_eq!(lt.storage_order(), StorageOrder::RowMajor);
        let b = DynMatrix::from_fn(12, 1, |i, _| (i as f64).sin());
        let mut x = b.clone();
        solve_in_place(&lt, Uplo::Upper, DiagKind::NonUnit, &mut x, &Tuning::default());
        let r = &(&l.to_dense().transpose() * &x) - &b;
        assert!(r.max_abs() < 1e-12);
    }

    #[test]
    fn vector_solve_matches_matrix_solve() {
        let mut rng = StdRng::seed_from_u64(11);
        let u = random_triangle(&mut rng, 50, Uplo::Upper, 4, StorageOrder::DiagMajor);
        let mut v: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let mut m = DynMatrix::from_slice(50, 1, &v);
        solve_vec_in_place(&u.view(), Uplo::Upper, DiagKind::NonUnit, &mut v);
        solve_in_place(&u.view(), Uplo::Upper, DiagKind::NonUnit, &mut m, &Tuning::default());
        assert_eq!(m.as_slice(), &v[..]);
    }

    #[test]
    fn checked_solve_reports_zero_diagonal() {
        let mut u = BandMatrix::from_fn(5, 5, 0, 1, StorageOrder::ColMajor, |_, _| 1.0_f64);
        u[(3, 3)] = 0.0;
        let mut b = DynMatrix::from_fn(5, 1, |_, _| 1.0);
        let before = b.clone();
        let err = try_solve_in_place(&u.view(), Uplo::Upper, DiagKind::NonUnit, &mut b, &Tuning::default());
        assert_eq!(err, Err(LinalgError::Singular));
        assert_eq!(b, before);
        assert!(try_solve_in_place(&u.view(), Uplo::Upper, DiagKind::Unit, &mut b, &Tuning::default()).is_ok());
    }

    #[test]
    fn invert_gives_inverse() {
        let mut rng = StdRng::seed_from_u64(5);
        let l = random_triangle(&mut rng, 20, Uplo::Lower, 3, StorageOrder::ColMajor);
        let inv = invert(&l.view(), Uplo::Lower, DiagKind::NonUnit, &Tuning::default()).unwrap();
        let prod = &l.to_dense() * &inv;
        let id = DynMatrix::eye(20, 0.0);
        assert!((&prod - &id).max_abs() < 1e-12);
        // Inverse of a lower triangle stays lower.
        assert_eq!(inv[(0, 5)], 0.0);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn parallel_split_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(9);
        let l = random_triangle(&mut rng, 64, Uplo::Lower, 5, StorageOrder::ColMajor);
        let b = DynMatrix::from_fn(64, 37, |i, j| ((i * 37 + j) as f64).cos());
        let mut seq = b.clone();
        solve_in_place(&l.view(), Uplo::Lower, DiagKind::NonUnit, &mut seq, &Tuning::default());
        let par_tuning = Tuning::default()
            .with_par_min_work(0)
            .with_par_block(4)
            .with_parallelism(Parallelism::Rayon(0));
        let mut par = b.clone();
        solve_in_place(&l.view(), Uplo::Lower, DiagKind::NonUnit, &mut par, &par_tuning);
        assert_eq!(seq, par);
    }
}
