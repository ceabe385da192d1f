use alloc::vec::Vec;

use num_traits::{Float, NumCast, One, Zero};

use crate::band::{BandMatrix, BandView, StorageOrder};
use crate::dense::{DynMatrix, DynVector};
use crate::linalg::trisolve::{self, DiagKind, Uplo};
use crate::linalg::{LinalgError, Tuning};
use crate::perm::Permutation;
use crate::traits::{LinalgScalar, MatrixMut};

/// LU decomposition of a square banded matrix with partial pivoting
/// restricted to the band.
///
/// If the input has more sub-diagonals than super-diagonals (or the same
/// number and row-major storage), its transpose is factored instead so the
/// pivot search runs over the narrower side. With `lo = min(nlo, nhi)` the
/// packed factor keeps `lo` sub-diagonals of multipliers and
/// `min(nlo + nhi, n - 1)` super-diagonals of `U`, which bounds the fill-in
/// produced by row interchanges.
///
/// Multipliers are stored as eliminated, without applying later
/// interchanges (LAPACK `gbtrf` convention). [`l`](Self::l) returns the
/// conventional unit lower factor with those interchanges applied, so
/// `P * L * U` reconstructs the factored matrix.
///
/// Because the multipliers are unpermuted, `P` cannot be applied to the
/// right-hand side up front. The solves replay the interchange sequence one
/// step at a time ([`Permutation::apply_step`]), each step followed by the
/// elimination of that column, exactly as the factorization did.
///
/// The pivot search never leaves the band, so element growth is bounded by
/// `2^lo` per column instead of the dense partial-pivoting bound.
///
/// The determinant is accumulated during factorization; the handle is
/// immutable afterwards and can be shared between threads.
///
/// # Example
///
/// ```
/// use bandeq::{BandMatrix, DynVector, StorageOrder};
///
/// // Tridiagonal: 4 on the diagonal, 1 off it.
/// let a = BandMatrix::from_fn(5, 5, 1, 1, StorageOrder::DiagMajor, |i, j| {
///     if i == j { 4.0_f64 } else { 1.0 }
/// });
/// let lu = a.lu();
/// assert!(lu.permutation().is_identity());
///
/// let b = DynVector::from_slice(&[5.0, 6.0, 6.0, 6.0, 5.0]);
/// let x = lu.solve(&b);
/// for i in 0..5 {
///     assert!((x[i] - 1.0).abs() < 1e-12);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BandLu<T: LinalgScalar> {
    lux: BandMatrix<T>,
    lo: usize,
    hi: usize,
    pivots: Permutation,
    istrans: bool,
    singular: bool,
    log_det: T::Real,
    phase: T,
    tuning: Tuning,
}

struct Elimination<T: LinalgScalar> {
    ipiv: Vec<usize>,
    singular: bool,
    log_det: T::Real,
    phase: T,
}

/// Gaussian elimination on `a`, whose data occupies `lo` sub-diagonals and
/// `hi` super-diagonals. The storage must hold `min(lo + hi, n - 1)`
/// super-diagonals, all zero above `hi`.
fn eliminate<T: LinalgScalar>(a: &mut BandMatrix<T>, lo: usize, hi: usize) -> Elimination<T> {
    let n = a.nrows();
    let mut ipiv = Vec::with_capacity(n);
    let mut singular = false;
    let mut log_det = <T::Real as Zero>::zero();
    let mut phase = T::one();

    for k in 0..n {
        let end_row = (k + lo + 1).min(n);
        let end_col = (k + lo + hi + 1).min(n);

        let mut p = k;
        let mut max = a[(k, k)].modulus();
        for i in (k + 1)..end_row {
            let v = a[(i, k)].modulus();
            if v > max {
                max = v;
                p = i;
            }
        }
        ipiv.push(p);

        if p != k {
            for j in k..end_col {
                let tmp = a[(k, j)];
                a[(k, j)] = a[(p, j)];
                a[(p, j)] = tmp;
            }
            phase = T::zero() - phase;
        }

        let pivot = a[(k, k)];
        if pivot == T::zero() {
            log::debug!(target: "bandeq", "band LU: zero pivot in column {}", k);
            singular = true;
            continue;
        }
        log_det = log_det + max.ln();
        phase = phase * pivot.phase();

        let inv_pivot = T::one() / pivot;
        for i in (k + 1)..end_row {
            a[(i, k)] = a[(i, k)] * inv_pivot;
        }
        for j in (k + 1)..end_col {
            let akj = a[(k, j)];
            if akj == T::zero() {
                continue;
            }
            for i in (k + 1)..end_row {
                a[(i, j)] = a[(i, j)] - a[(i, k)] * akj;
            }
        }
    }

    Elimination {
        ipiv,
        singular,
        log_det,
        phase,
    }
}

impl<T: LinalgScalar> BandLu<T> {
    /// Factor a copy of `a`.
    ///
    /// Panics if `a` is not square.
    pub fn new(a: &BandView<'_, T>) -> Self {
        assert!(
            a.is_square(),
            "band LU requires a square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        );
        let n = a.nrows();
        let istrans =
            a.nlo() > a.nhi() || (a.nlo() == a.nhi() && a.storage_order() == StorageOrder::RowMajor);
        let src = if istrans { a.transpose() } else { *a };
        let lo = src.nlo();
        let hi = src.nhi();
        let fill = (lo + hi).min(n.saturating_sub(1));

        if n >= 16 && lo + hi + 1 >= n {
            log::warn!(
                target: "bandeq_perf",
                "band LU on a {}x{} band covering the whole matrix; a dense factorization is faster",
                n,
                n
            );
        }

        let mut lux = BandMatrix::zeros(n, n, lo, fill, StorageOrder::preferred(lo, fill));
        for j in 0..n {
            for i in src.col_range(j) {
                lux[(i, j)] = src.at(i, j);
            }
        }
        log::debug!(
            target: "bandeq",
            "band LU: n={}, nlo={}, nhi={}, istrans={}, fill nhi={}",
            n,
            a.nlo(),
            a.nhi(),
            istrans,
            fill
        );
        Self::from_eliminated(lux, lo, hi, fill, istrans)
    }

    /// Factor `a` reusing its buffer.
    ///
    /// `data_nhi` is the number of super-diagonals that hold data; storage
    /// diagonals above it are treated as scratch and zeroed. The factored
    /// orientation needs `min(nlo + data_nhi, n - 1)` storage diagonals on
    /// the side that receives `U`: super-diagonals when `A` itself is
    /// factored, sub-diagonals when its transpose is. The orientation
    /// [`new`](Self::new) would pick is used when it has room, otherwise the
    /// other one. If neither fits, `BandwidthMismatch` is returned and `a`
    /// is dropped untouched.
    ///
    /// ```
    /// use bandeq::{BandMatrix, StorageOrder};
    /// use bandeq::linalg::{BandLu, LinalgError};
    ///
    /// // Data has one super-diagonal; storage leaves room for one more.
    /// let a = BandMatrix::from_fn(4, 4, 1, 2, StorageOrder::ColMajor, |i, j| {
    ///     if j > i + 1 { 0.0 } else if i == j { 3.0_f64 } else { 1.0 }
    /// });
    /// let lu = BandLu::in_place(a, 1).unwrap();
    /// assert!((lu.det() - 55.0).abs() < 1e-12);
    ///
    /// let tight = BandMatrix::<f64>::zeros(4, 4, 1, 1, StorageOrder::ColMajor);
    /// let err = BandLu::in_place(tight, 1).unwrap_err();
    /// assert_eq!(err, LinalgError::BandwidthMismatch { expected: 2, got: 1 });
    /// ```
    pub fn in_place(a: BandMatrix<T>, data_nhi: usize) -> Result<Self, LinalgError> {
        if a.nrows() != a.ncols() {
            return Err(LinalgError::BandwidthMismatch {
                expected: a.nrows(),
                got: a.ncols(),
            });
        }
        if data_nhi > a.nhi() {
            return Err(LinalgError::BandwidthMismatch {
                expected: a.nhi(),
                got: data_nhi,
            });
        }
        let n = a.nrows();
        let data_nlo = a.nlo();
        let fill = (data_nlo + data_nhi).min(n.saturating_sub(1));
        let preferred = data_nlo > data_nhi
            || (data_nlo == data_nhi && a.storage().order() == StorageOrder::RowMajor);
        // Super-diagonals available for U in each orientation.
        let room = |trans: bool| if trans { a.nlo() } else { a.nhi() };
        let istrans = if room(preferred) >= fill {
            preferred
        } else if room(!preferred) >= fill {
            log::debug!(
                target: "bandeq",
                "band LU in place: storage has no room for fill-in with istrans={}, using istrans={}",
                preferred,
                !preferred
            );
            !preferred
        } else {
            return Err(LinalgError::BandwidthMismatch {
                expected: fill,
                got: room(preferred),
            });
        };
        let (a, lo, hi) = if istrans {
            (a.into_transpose(), data_nhi, data_nlo)
        } else {
            (a, data_nlo, data_nhi)
        };
        if a.storage().order() == StorageOrder::RowMajor {
            log::warn!(
                target: "bandeq_perf",
                "band LU prefers column-major or diagonal-major storage. Found row-major band."
            );
        }

        let mut a = a;
        // Stale data above the data bandwidth would leak into the fill-in.
        if fill > hi {
            let mut scratch = a.view_mut().diag_range_mut(hi as isize + 1, fill as isize + 1);
            scratch.fill_zero();
        }
        log::debug!(
            target: "bandeq",
            "band LU in place: n={}, lo={}, hi={}, istrans={}, storage nhi={}",
            n,
            lo,
            hi,
            istrans,
            a.nhi()
        );
        Ok(Self::from_eliminated(a, lo, hi, fill, istrans))
    }

    fn from_eliminated(mut lux: BandMatrix<T>, lo: usize, hi: usize, fill: usize, istrans: bool) -> Self {
        let e = eliminate(&mut lux, lo, hi);
        Self {
            lux,
            lo,
            hi: fill,
            pivots: Permutation::from_interchanges(e.ipiv),
            istrans,
            singular: e.singular,
            log_det: e.log_det,
            phase: e.phase,
            tuning: Tuning::default(),
        }
    }

    /// Replace the kernel dispatch thresholds used by the solves.
    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.lux.nrows()
    }

    /// Whether the transpose of the input was factored.
    #[inline]
    pub fn is_trans(&self) -> bool {
        self.istrans
    }

    /// Whether a pivot was exactly zero.
    #[inline]
    pub fn is_singular(&self) -> bool {
        self.singular
    }

    /// Packed factors: multipliers below the diagonal, `U` on and above.
    pub fn lu(&self) -> BandView<'_, T> {
        self.lux.view().diag_range(-(self.lo as isize), self.hi as isize + 1)
    }

    /// Upper-triangular factor `U` as a band view.
    pub fn u(&self) -> BandView<'_, T> {
        self.lux.view().diag_range(0, self.hi as isize + 1)
    }

    /// Dense unit lower factor with later interchanges applied, so that
    /// `P * L * U` equals the factored matrix.
    pub fn l(&self) -> DynMatrix<T> {
        let n = self.nrows();
        let mut l = DynMatrix::zeros(n, n, T::zero());
        for (k, &p) in self.pivots.interchanges().iter().enumerate() {
            if p != k {
                for j in 0..k {
                    let tmp = l[(k, j)];
                    l[(k, j)] = l[(p, j)];
                    l[(p, j)] = tmp;
                }
            }
            for i in (k + 1)..(k + self.lo + 1).min(n) {
                l[(i, k)] = self.lux[(i, k)];
            }
        }
        for i in 0..n {
            l[(i, i)] = T::one();
        }
        l
    }

    /// Row permutation `P` with `P * L * U` equal to the factored matrix.
    pub fn permutation(&self) -> Permutation {
        self.pivots.inverse()
    }

    /// `(ln|det|, phase)` with `det = phase * exp(ln|det|)`.
    ///
    /// A singular matrix gives `(-inf, 0)`.
    pub fn log_det(&self) -> (T::Real, T) {
        if self.singular {
            (<T::Real as Float>::neg_infinity(), T::zero())
        } else {
            (self.log_det, self.phase)
        }
    }

    pub fn det(&self) -> T {
        if self.singular {
            return T::zero();
        }
        T::from_real(self.log_det.exp()) * self.phase
    }

    // ── Solves ──────────────────────────────────────────────────────

    /// `B <- L^-1 P^-1 B`, replaying each interchange before its column.
    fn apply_l_inverse(&self, b: &mut DynMatrix<T>) {
        let n = self.nrows();
        for c in 0..b.ncols() {
            let x = b.col_as_mut_slice(c, 0);
            for k in 0..n {
                self.pivots.apply_step(k, x);
                let xk = x[k];
                if xk == T::zero() {
                    continue;
                }
                for i in (k + 1)..(k + self.lo + 1).min(n) {
                    x[i] = x[i] - self.lux[(i, k)] * xk;
                }
            }
        }
    }

    /// Solve `F X = B` for the factored matrix `F`.
    fn solve_f(&self, b: &mut DynMatrix<T>) {
        self.apply_l_inverse(b);
        trisolve::solve_in_place(&self.u(), Uplo::Upper, DiagKind::NonUnit, b, &self.tuning);
    }

    /// Solve `F^T X = B` for the factored matrix `F`.
    fn solve_ft(&self, b: &mut DynMatrix<T>) {
        let n = self.nrows();
        trisolve::solve_in_place(
            &self.u().transpose(),
            Uplo::Lower,
            DiagKind::NonUnit,
            b,
            &self.tuning,
        );
        for c in 0..b.ncols() {
            let x = b.col_as_mut_slice(c, 0);
            for k in (0..n).rev() {
                let mut s = x[k];
                for i in (k + 1)..(k + self.lo + 1).min(n) {
                    s = s - self.lux[(i, k)] * x[i];
                }
                x[k] = s;
                self.pivots.apply_step(k, x);
            }
        }
    }

    /// Solve `A X = B` in place.
    ///
    /// A singular `A` does not error here; the result holds infinities or
    /// NaNs. Check [`is_singular`](Self::is_singular) first.
    pub fn solve_in_place(&self, b: &mut DynMatrix<T>) {
        assert_eq!(
            b.nrows(),
            self.nrows(),
            "right-hand side has {} rows, matrix has {}",
            b.nrows(),
            self.nrows()
        );
        if self.istrans {
            self.solve_ft(b);
        } else {
            self.solve_f(b);
        }
    }

    /// Solve `A X = B` into `x`.
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
        // X A = B  <=>  A^T X^T = B^T
        let mut bt = b.transpose();
        if self.istrans {
            self.solve_f(&mut bt);
        } else {
            self.solve_ft(&mut bt);
        }
        *b = bt.transpose();
    }

    /// Solve `X A = B` into `x`.
    pub fn solve_right_into(&self, b: &DynMatrix<T>, x: &mut DynMatrix<T>) {
        assert_eq!(
            (b.nrows(), b.ncols()),
            (x.nrows(), x.ncols()),
            "output shape does not match right-hand side"
        );
        x.as_mut_slice().copy_from_slice(b.as_slice());
        self.solve_right_in_place(x);
    }

    /// Solve `A x = b`.
    pub fn solve(&self, b: &DynVector<T>) -> DynVector<T> {
        let mut x = b.clone();
        self.solve_in_place(&mut x.inner);
        x
    }

    // ── Inverses ────────────────────────────────────────────────────

    /// `A^-1`.
    pub fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let mut x = DynMatrix::zeros(self.nrows(), self.nrows(), T::zero());
        self.inverse_into(&mut x)?;
        Ok(x)
    }

    /// Write `A^-1` into `out`.
    pub fn inverse_into(&self, out: &mut DynMatrix<T>) -> Result<(), LinalgError> {
        let n = self.nrows();
        assert_eq!((out.nrows(), out.ncols()), (n, n), "inverse output must be {}x{}", n, n);
        if self.singular {
            return Err(LinalgError::Singular);
        }
        for j in 0..n {
            for i in 0..n {
                out[(i, j)] = if i == j { T::one() } else { T::zero() };
            }
        }
        self.solve_in_place(out);
        Ok(())
    }

    /// `A^-1` from the triangular inverse of `U` and the permuted `L`:
    /// `F^-1 = U^-1 (L^-1 P^-1)`, transposed when `F = A^T`.
    fn inverse_from_factors(&self) -> Result<DynMatrix<T>, LinalgError> {
        if self.singular {
            return Err(LinalgError::Singular);
        }
        let mut w = DynMatrix::eye(self.nrows(), T::zero());
        self.apply_l_inverse(&mut w);
        let u_inv = trisolve::invert(&self.u(), Uplo::Upper, DiagKind::NonUnit, &self.tuning)?;
        let f_inv = &u_inv * &w;
        if self.istrans {
            log::debug!(target: "bandeq", "band LU: Gram inverse formed from the transposed factors");
            Ok(f_inv.transpose())
        } else {
            Ok(f_inv)
        }
    }

    /// `(A^H A)^-1 = A^-1 A^-H`.
    pub fn inverse_ata(&self) -> Result<DynMatrix<T>, LinalgError> {
        let x = self.inverse_from_factors()?;
        Ok(&x * &x.adjoint())
    }

    pub fn inverse_ata_into(&self, out: &mut DynMatrix<T>) -> Result<(), LinalgError> {
        *out = self.inverse_ata()?;
        Ok(())
    }

    /// `(A A^H)^-1 = A^-H A^-1`.
    pub fn inverse_aat(&self) -> Result<DynMatrix<T>, LinalgError> {
        let x = self.inverse_from_factors()?;
        Ok(&x.adjoint() * &x)
    }

    pub fn inverse_aat_into(&self, out: &mut DynMatrix<T>) -> Result<(), LinalgError> {
        *out = self.inverse_aat()?;
        Ok(())
    }

    /// Reconstruct `P L U`, compare with `a`, and report whether the residual
    /// is within `cond(A) * n * eps * |L| |U|`.
    pub fn check_decomposition(&self, a: &BandView<'_, T>) -> bool {
        let n = self.nrows();
        assert_eq!((a.nrows(), a.ncols()), (n, n), "matrix shape does not match factorization");
        let l = self.l();
        let u = self.u().to_dense();
        let mut plu = &l * &u;
        self.permutation().apply_on_left(&mut plu);
        let target = if self.istrans {
            a.transpose().to_dense()
        } else {
            a.to_dense()
        };
        let residual = (&plu - &target).frobenius_norm();

        let eps = T::lepsilon();
        let nr = <T::Real as NumCast>::from(n.max(1)).unwrap_or_else(<T::Real as One>::one);
        let kappa = match self.inverse() {
            Ok(inv) => target.norm_inf() * inv.norm_inf(),
            Err(_) => <T::Real as One>::one(),
        };
        let kappa = if kappa < <T::Real as One>::one() {
            <T::Real as One>::one()
        } else {
            kappa
        };
        let tol = kappa * nr * eps * l.frobenius_norm() * u.frobenius_norm();
        log::debug!(
            target: "bandeq",
            "band LU check: residual {:?}, tolerance {:?}",
            residual,
            tol
        );
        residual <= tol
    }
}

// ── Convenience methods ─────────────────────────────────────────────

impl<'a, T: LinalgScalar> BandView<'a, T> {
    /// Band LU decomposition of a copy of this matrix.
    pub fn lu(&self) -> BandLu<T> {
        BandLu::new(self)
    }

    /// Solve `A x = b` by band LU. Returns `Err(Singular)` for a zero pivot.
    ///
    /// ```
    /// use bandeq::{BandMatrix, DynVector, StorageOrder};
    /// let a = BandMatrix::from_fn(3, 3, 1, 0, StorageOrder::ColMajor, |i, j| {
    ///     if i == j { 2.0_f64 } else { 1.0 }
    /// });
    /// let x = a.view().solve(&DynVector::from_slice(&[2.0, 3.0, 3.0])).unwrap();
    /// assert!((x[0] - 1.0).abs() < 1e-12);
    /// assert!((x[1] - 1.0).abs() < 1e-12);
    /// assert!((x[2] - 1.0).abs() < 1e-12);
    /// ```
    pub fn solve(&self, b: &DynVector<T>) -> Result<DynVector<T>, LinalgError> {
        let lu = self.lu();
        if lu.is_singular() {
            return Err(LinalgError::Singular);
        }
        Ok(lu.solve(b))
    }

    /// Determinant by band LU.
    pub fn det(&self) -> T {
        self.lu().det()
    }

    /// Inverse by band LU.
    pub fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        self.lu().inverse()
    }
}

impl<T: LinalgScalar> BandMatrix<T> {
    pub fn lu(&self) -> BandLu<T> {
        BandLu::new(&self.view())
    }

    pub fn solve(&self, b: &DynVector<T>) -> Result<DynVector<T>, LinalgError> {
        self.view().solve(b)
    }

    pub fn det(&self) -> T {
        self.view().det()
    }

    pub fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        self.view().inverse()
    }
}
