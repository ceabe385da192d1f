use num_traits::{Float, NumCast, One, Zero};

use crate::band::{BandMatrix, BandView, StorageOrder};
use crate::dense::{DynMatrix, DynVector};
use crate::linalg::trisolve::{self, DiagKind, Uplo};
use crate::linalg::{LinalgError, Tuning};
use crate::traits::LinalgScalar;

/// Cholesky decomposition of a Hermitian positive-definite band: `A = L L^H`.
///
/// Only the diagonal and the `nlo` sub-diagonals of the input are read.
/// `L` keeps the input's lower bandwidth; there is no pivoting and no
/// fill-in.
///
/// # Example
///
/// ```
/// use bandeq::{BandMatrix, DynVector, StorageOrder};
///
/// let a = BandMatrix::from_fn(3, 3, 1, 1, StorageOrder::DiagMajor, |i, j| {
///     if i == j { 2.0_f64 } else { -1.0 }
/// });
/// let chol = a.cholesky().unwrap();
/// assert!((chol.det() - 4.0).abs() < 1e-12);
///
/// let x = chol.solve(&DynVector::from_slice(&[1.0, 0.0, 1.0]));
/// for i in 0..3 {
///     assert!((x[i] - 1.0).abs() < 1e-12);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BandCholesky<T: LinalgScalar> {
    l: BandMatrix<T>,
    tuning: Tuning,
}

impl<T: LinalgScalar> BandCholesky<T> {
    /// Decompose a Hermitian positive-definite band.
    ///
    /// Returns `NotPositiveDefinite` if a pivot is not strictly positive.
    pub fn new(a: &BandView<'_, T>) -> Result<Self, LinalgError> {
        assert!(
            a.is_square(),
            "Cholesky decomposition requires a square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        );
        let n = a.nrows();
        let lo = a.nlo();
        let mut l = BandMatrix::zeros(n, n, lo, 0, StorageOrder::ColMajor);
        for j in 0..n {
            for i in j..(j + lo + 1).min(n) {
                l[(i, j)] = a.at(i, j);
            }
        }

        for j in 0..n {
            for k in j.saturating_sub(lo)..j {
                let ljk_conj = l[(j, k)].conj();
                for i in j..(k + lo + 1).min(n) {
                    l[(i, j)] = l[(i, j)] - l[(i, k)] * ljk_conj;
                }
            }

            let diag = l[(j, j)];
            if diag.re() <= <T::Real as Zero>::zero() {
                log::debug!(
                    target: "bandeq",
                    "band Cholesky: non-positive pivot in column {}",
                    j
                );
                return Err(LinalgError::NotPositiveDefinite);
            }
            let ljj = T::from_real(diag.re().lsqrt());
            l[(j, j)] = ljj;

            let inv_ljj = T::one() / ljj;
            for i in (j + 1)..(j + lo + 1).min(n) {
                l[(i, j)] = l[(i, j)] * inv_ljj;
            }
        }
        log::debug!(target: "bandeq", "band Cholesky: n={}, nlo={}", n, lo);

        Ok(Self {
            l,
            tuning: Tuning::default(),
        })
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.l.nrows()
    }

    /// Lower-triangular factor `L`.
    pub fn l(&self) -> BandView<'_, T> {
        self.l.view()
    }

    /// Solve `A X = B` in place.
    pub fn solve_in_place(&self, b: &mut DynMatrix<T>) {
        assert_eq!(
            b.nrows(),
            self.nrows(),
            "right-hand side has {} rows, matrix has {}",
            b.nrows(),
            self.nrows()
        );
        let l = self.l.view();
        trisolve::solve_in_place(&l, Uplo::Lower, DiagKind::NonUnit, b, &self.tuning);
        trisolve::solve_in_place(&l.adjoint(), Uplo::Upper, DiagKind::NonUnit, b, &self.tuning);
    }

    pub fn solve_into(&self, b: &DynMatrix<T>, x: &mut DynMatrix<T>) {
        assert_eq!(
            (b.nrows(), b.ncols()),
            (x.nrows(), x.ncols()),
            "output shape does not match right-hand side"
        );
        x.as_mut_slice().copy_from_slice(b.as_slice());
        self.solve_in_place(x);
    }

    /// Solve `X A = B` in place.
    pub fn solve_right_in_place(&self, b: &mut DynMatrix<T>) {
        assert_eq!(
            b.ncols(),
            self.nrows(),
            "right-hand side has {} columns, matrix has {}",
            b.ncols(),
            self.nrows()
        );
        // A^T = conj(L) L^T
        let mut bt = b.transpose();
        let l = self.l.view();
        trisolve::solve_in_place(&l.conjugate(), Uplo::Lower, DiagKind::NonUnit, &mut bt, &self.tuning);
        trisolve::solve_in_place(&l.transpose(), Uplo::Upper, DiagKind::NonUnit, &mut bt, &self.tuning);
        *b = bt.transpose();
    }

    pub fn solve_right_into(&self, b: &DynMatrix<T>, x: &mut DynMatrix<T>) {
        assert_eq!(
            (b.nrows(), b.ncols()),
            (x.nrows(), x.ncols()),
            "output shape does not match right-hand side"
        );
        x.as_mut_slice().copy_from_slice(b.as_slice());
        self.solve_right_in_place(x);
    }

    pub fn solve(&self, b: &DynVector<T>) -> DynVector<T> {
        let mut x = b.clone();
        self.solve_in_place(&mut x.inner);
        x
    }

    /// `det(A) = prod(L_jj)^2`, always real and positive.
    pub fn det(&self) -> T {
        let mut p = <T::Real as One>::one();
        for d in self.l.view().diag(0).iter() {
            let r = d.re();
            p = p * r * r;
        }
        T::from_real(p)
    }

    /// `ln(det(A))`, safe from overflow for large matrices.
    pub fn ln_det(&self) -> T::Real {
        let mut s = <T::Real as Zero>::zero();
        for d in self.l.view().diag(0).iter() {
            s = s + d.re().ln();
        }
        s + s
    }

    pub fn inverse(&self) -> DynMatrix<T> {
        let mut x = DynMatrix::eye(self.nrows(), T::zero());
        self.solve_in_place(&mut x);
        x
    }

    pub fn inverse_into(&self, out: &mut DynMatrix<T>) {
        let n = self.nrows();
        assert_eq!((out.nrows(), out.ncols()), (n, n), "inverse output must be {}x{}", n, n);
        for j in 0..n {
            for i in 0..n {
                out[(i, j)] = if i == j { T::one() } else { T::zero() };
            }
        }
        self.solve_in_place(out);
    }

    /// Rebuild `L L^H` and compare with the lower triangle of `a`.
    pub fn check_decomposition(&self, a: &BandView<'_, T>) -> bool {
        let n = self.nrows();
        assert_eq!((a.nrows(), a.ncols()), (n, n), "matrix shape does not match factorization");
        let l = self.l.view().to_dense();
        let llh = &l * &l.adjoint();
        let mut residual = <T::Real as Zero>::zero();
        let mut norm = <T::Real as Zero>::zero();
        for j in 0..n {
            for i in j..n {
                let aij = a.get(i, j);
                residual = residual + (llh[(i, j)] - aij).modulus_sq();
                norm = norm + aij.modulus_sq();
            }
        }
        let residual = residual.sqrt();
        let one = <T::Real as One>::one();
        let tol = <T::Real as NumCast>::from(8 * n.max(1)).unwrap_or(one)
            * T::lepsilon()
            * (one + norm.sqrt());
        log::debug!(
            target: "bandeq",
            "band Cholesky check: residual {:?}, tolerance {:?}",
            residual,
            tol
        );
        residual <= tol
    }
}

impl<'a, T: LinalgScalar> BandView<'a, T> {
    /// Cholesky decomposition of this Hermitian positive-definite band.
    pub fn cholesky(&self) -> Result<BandCholesky<T>, LinalgError> {
        BandCholesky::new(self)
    }
}

impl<T: LinalgScalar> BandMatrix<T> {
    pub fn cholesky(&self) -> Result<BandCholesky<T>, LinalgError> {
        BandCholesky::new(&self.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spd(n: usize, lo: usize) -> BandMatrix<f64> {
        BandMatrix::from_fn(n, n, lo, lo, StorageOrder::ColMajor, |i, j| {
            if i == j {
                2.0 * lo as f64 + 1.0 + i as f64
            } else {
                -1.0 / (1.0 + i.abs_diff(j) as f64)
            }
        })
    }

    #[test]
    fn reconstructs() {
        let a = spd(8, 3);
        let chol = a.cholesky().unwrap();
        assert_eq!(chol.l().nlo(), 3);
        assert_eq!(chol.l().nhi(), 0);
        assert!(chol.check_decomposition(&a.view()));
    }

    #[test]
    fn upper_triangle_is_ignored() {
        let mut a = spd(5, 1);
        let reference = a.cholesky().unwrap();
        for i in 0..4 {
            a[(i, i + 1)] = 1.0e6;
        }
        let chol = a.cholesky().unwrap();
        assert_eq!(chol.l().to_dense(), reference.l().to_dense());
    }

    #[test]
    fn not_positive_definite() {
        let a = BandMatrix::from_fn(3, 3, 1, 1, StorageOrder::ColMajor, |i, j| {
            if i == j {
                1.0_f64
            } else {
                2.0
            }
        });
        assert_eq!(a.cholesky().unwrap_err(), LinalgError::NotPositiveDefinite);
    }

    #[test]
    fn agrees_with_lu() {
        let a = spd(7, 2);
        let chol = a.cholesky().unwrap();
        let lu = a.lu();
        assert!((chol.det() - lu.det()).abs() < 1e-8 * lu.det().abs());
        assert!((chol.ln_det() - lu.log_det().0).abs() < 1e-10);

        let b = DynMatrix::from_fn(7, 3, |i, j| (i as f64) - 2.0 * (j as f64));
        let mut x1 = DynMatrix::zeros(7, 3, 0.0);
        chol.solve_into(&b, &mut x1);
        let mut x2 = b.clone();
        lu.solve_in_place(&mut x2);
        assert!((&x1 - &x2).max_abs() < 1e-12);
    }

    #[test]
    fn right_solve_and_inverse() {
        let a = spd(6, 2);
        let chol = a.cholesky().unwrap();
        let x_true = DynMatrix::from_fn(2, 6, |i, j| (i * 6 + j) as f64);
        let mut b = &x_true * &a.to_dense();
        chol.solve_right_in_place(&mut b);
        assert!((&b - &x_true).max_abs() < 1e-10);

        let inv = chol.inverse();
        let prod = &a.to_dense() * &inv;
        assert!((&prod - &DynMatrix::eye(6, 0.0)).max_abs() < 1e-12);
    }
}
