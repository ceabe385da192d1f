use alloc::vec::Vec;

use num_traits::{Float, NumCast, One, Zero};

use crate::band::{BandMatrix, BandView, StorageOrder};
use crate::dense::{DynMatrix, DynVector};
use crate::linalg::householder::{form_q, make_reflector, reflect, reflect_cols};
use crate::linalg::trisolve::{self, DiagKind, Uplo};
use crate::linalg::{LinalgError, Tuning};
use crate::traits::LinalgScalar;

/// Householder QR decomposition of a banded matrix.
///
/// The factorization is always computed on a tall matrix: a wide input
/// (`nrows < ncols`), or a square one with more sub- than super-diagonals,
/// is transposed first. For the stored `M x N` matrix with `lo`
/// sub-diagonals, the reflector for column `j` spans rows
/// `j..=min(j + lo, M - 1)`, its tail is kept below the diagonal, and `R`
/// fills at most `min(lo + hi, N - 1)` super-diagonals.
///
/// Left solves on a tall input return the least-squares solution; on a wide
/// input the minimum-norm solution.
///
/// ```
/// use bandeq::{BandMatrix, DynVector, StorageOrder};
///
/// // Overdetermined 4x2 system with an exact solution [1, 2].
/// let a = BandMatrix::from_fn(4, 2, 2, 1, StorageOrder::ColMajor, |i, j| {
///     (1 + i + 2 * j) as f64
/// });
/// let x_true = DynVector::from_slice(&[1.0, 2.0]);
/// let b = a.view().mul_vec(&x_true);
/// let qr = a.qr();
/// let x = qr.solve(&b);
/// assert!((x[0] - 1.0).abs() < 1e-12);
/// assert!((x[1] - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct BandQr<T: LinalgScalar> {
    qrx: BandMatrix<T>,
    lo: usize,
    hi: usize,
    beta: Vec<T>,
    nrows: usize,
    ncols: usize,
    istrans: bool,
    singular: bool,
    log_det: T::Real,
    phase: T,
    tuning: Tuning,
}

impl<T: LinalgScalar> BandQr<T> {
    /// Factor a copy of `a`.
    pub fn new(a: &BandView<'_, T>) -> Self {
        let (m, n) = (a.nrows(), a.ncols());
        let istrans = m < n || (m == n && a.nlo() > a.nhi());
        let src = if istrans { a.transpose() } else { *a };
        let (big_m, big_n) = (src.nrows(), src.ncols());
        let lo = src.nlo();
        let hi = src.nhi();
        let fill = (lo + hi).min(big_n.saturating_sub(1));

        let mut qrx = BandMatrix::zeros(big_m, big_n, lo, fill, StorageOrder::preferred(lo, fill));
        for j in 0..big_n {
            for i in src.col_range(j) {
                qrx[(i, j)] = src.at(i, j);
            }
        }
        log::debug!(
            target: "bandeq",
            "band QR: {}x{}, nlo={}, nhi={}, istrans={}, R nhi={}",
            m,
            n,
            a.nlo(),
            a.nhi(),
            istrans,
            fill
        );
        Self::from_reduced(qrx, lo, fill, m, n, istrans)
    }

    /// Factor `a` reusing its buffer.
    ///
    /// `data_nhi` is the number of super-diagonals holding data. Storage
    /// diagonals above it are zeroed before the reduction. The stored tall
    /// matrix needs `min(nlo + data_nhi, N - 1)` super-diagonals for `R`,
    /// where `N` is the smaller dimension. A square input whose preferred
    /// orientation lacks that room is factored the other way round; if
    /// neither fits, `BandwidthMismatch` is returned.
    pub fn in_place(a: BandMatrix<T>, data_nhi: usize) -> Result<Self, LinalgError> {
        if data_nhi > a.nhi() {
            return Err(LinalgError::BandwidthMismatch {
                expected: a.nhi(),
                got: data_nhi,
            });
        }
        let (m, n) = (a.nrows(), a.ncols());
        let data_nlo = a.nlo();
        let fill = (data_nlo + data_nhi).min(m.min(n).saturating_sub(1));
        let room = |trans: bool| if trans { a.nlo() } else { a.nhi() };
        let istrans = if m != n {
            m < n
        } else {
            let preferred = data_nlo > data_nhi;
            if room(preferred) >= fill {
                preferred
            } else {
                // A square input can be factored either way round.
                !preferred
            }
        };
        if room(istrans) < fill {
            return Err(LinalgError::BandwidthMismatch {
                expected: fill,
                got: room(istrans),
            });
        }
        let (a, lo, hi) = if istrans {
            (a.into_transpose(), data_nhi, data_nlo)
        } else {
            (a, data_nlo, data_nhi)
        };
        if a.storage().order() == StorageOrder::RowMajor {
            log::warn!(
                target: "bandeq_perf",
                "band QR prefers column-major or diagonal-major storage. Found row-major band."
            );
        }

        let mut a = a;
        if fill > hi {
            let mut scratch = a.view_mut().diag_range_mut(hi as isize + 1, fill as isize + 1);
            scratch.fill_zero();
        }
        log::debug!(
            target: "bandeq",
            "band QR in place: {}x{}, lo={}, hi={}, istrans={}",
            m,
            n,
            lo,
            hi,
            istrans
        );
        Ok(Self::from_reduced(a, lo, fill, m, n, istrans))
    }

    fn from_reduced(
        mut qrx: BandMatrix<T>,
        lo: usize,
        fill: usize,
        nrows: usize,
        ncols: usize,
        istrans: bool,
    ) -> Self {
        let (big_m, big_n) = (qrx.nrows(), qrx.ncols());
        let mut beta = Vec::with_capacity(big_n);
        let mut sign = T::one();
        let mut x = Vec::with_capacity(lo + 1);

        for j in 0..big_n {
            let end_row = (j + lo + 1).min(big_m);
            x.clear();
            x.extend((j..end_row).map(|i| qrx[(i, j)]));
            let b = make_reflector(&mut x, &mut sign);
            for (k, i) in (j..end_row).enumerate() {
                qrx[(i, j)] = x[k];
            }
            beta.push(b);
            if b == T::zero() {
                continue;
            }

            let end_col = (j + fill + 1).min(big_n);
            let mut y = Vec::with_capacity(x.len());
            for c in (j + 1)..end_col {
                y.clear();
                y.extend((j..end_row).map(|i| qrx[(i, c)]));
                reflect(&x[1..], b, &mut y);
                for (k, i) in (j..end_row).enumerate() {
                    qrx[(i, c)] = y[k];
                }
            }
        }

        let mut singular = false;
        let mut log_det = <T::Real as Zero>::zero();
        let mut phase = sign;
        for j in 0..big_n {
            let r = qrx[(j, j)];
            if r == T::zero() {
                singular = true;
                continue;
            }
            log_det = log_det + r.modulus().ln();
            phase = phase * r.phase();
        }
        if singular {
            log::debug!(target: "bandeq", "band QR: R has a zero on its diagonal");
        }

        Self {
            qrx,
            lo,
            hi: fill,
            beta,
            nrows,
            ncols,
            istrans,
            singular,
            log_det,
            phase,
            tuning: Tuning::default(),
        }
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Rows of the factored input.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Columns of the factored input.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Whether the transpose of the input was factored.
    #[inline]
    pub fn is_trans(&self) -> bool {
        self.istrans
    }

    /// Whether `R` has an exact zero on its diagonal.
    #[inline]
    pub fn is_singular(&self) -> bool {
        self.singular
    }

    /// Householder coefficients, one per column of the stored matrix.
    #[inline]
    pub fn beta(&self) -> &[T] {
        &self.beta
    }

    /// Packed factors: reflector tails below the diagonal, `R` on and above.
    pub fn qr(&self) -> BandView<'_, T> {
        self.qrx.view().diag_range(-(self.lo as isize), self.hi as isize + 1)
    }

    /// Square upper-triangular `R` of the stored matrix.
    pub fn r(&self) -> BandView<'_, T> {
        let n = self.qrx.ncols();
        self.qrx.view().sub_band(0, n, 0, n, 0, self.hi)
    }

    /// Thin `Q` of the stored matrix (`M x N`).
    pub fn q(&self) -> DynMatrix<T> {
        let (big_m, big_n) = (self.qrx.nrows(), self.qrx.ncols());
        form_q(big_m, big_n, big_n, |j, tail| {
            self.load_tail(j, tail);
            self.beta[j]
        })
    }

    fn load_tail(&self, j: usize, tail: &mut Vec<T>) {
        let end_row = (j + self.lo + 1).min(self.qrx.nrows());
        tail.extend(((j + 1)..end_row).map(|i| self.qrx[(i, j)]));
    }

    /// `w <- Q^H w` for the stored `Q`.
    fn apply_qh(&self, w: &mut DynMatrix<T>) {
        let k = w.ncols();
        let mut tail = Vec::with_capacity(self.lo);
        for j in 0..self.beta.len() {
            tail.clear();
            self.load_tail(j, &mut tail);
            reflect_cols(&tail, self.beta[j], w, j, 0..k);
        }
    }

    /// `w <- Q w` for the stored `Q`.
    fn apply_q(&self, w: &mut DynMatrix<T>) {
        let k = w.ncols();
        let mut tail = Vec::with_capacity(self.lo);
        for j in (0..self.beta.len()).rev() {
            tail.clear();
            self.load_tail(j, &mut tail);
            reflect_cols(&tail, self.beta[j], w, j, 0..k);
        }
    }

    pub fn log_det(&self) -> (T::Real, T) {
        if self.singular {
            (<T::Real as Float>::neg_infinity(), T::zero())
        } else {
            (self.log_det, self.phase)
        }
    }

    /// Determinant. Panics if the input is not square.
    pub fn det(&self) -> T {
        assert_eq!(
            self.nrows, self.ncols,
            "determinant of a non-square {}x{} matrix",
            self.nrows, self.ncols
        );
        if self.singular {
            return T::zero();
        }
        T::from_real(self.log_det.exp()) * self.phase
    }

    // ── Solves ──────────────────────────────────────────────────────

    /// Least squares `min |S x - b|` for the stored tall `S`.
    fn solve_s(&self, b: &DynMatrix<T>) -> DynMatrix<T> {
        let big_n = self.qrx.ncols();
        let mut w = b.clone();
        self.apply_qh(&mut w);
        let mut x = DynMatrix::from_fn(big_n, w.ncols(), |i, c| w[(i, c)]);
        trisolve::solve_in_place(&self.r(), Uplo::Upper, DiagKind::NonUnit, &mut x, &self.tuning);
        x
    }

    /// Minimum-norm solution of `S^T x = b`.
    fn solve_st(&self, b: &DynMatrix<T>) -> DynMatrix<T> {
        let (big_m, big_n) = (self.qrx.nrows(), self.qrx.ncols());
        let mut y = b.clone();
        trisolve::solve_in_place(
            &self.r().transpose(),
            Uplo::Lower,
            DiagKind::NonUnit,
            &mut y,
            &self.tuning,
        );
        // S^T = R^T Q^T, so x = conj(Q) y = conj(Q conj(y)).
        let mut z = DynMatrix::zeros(big_m, y.ncols(), T::zero());
        for c in 0..y.ncols() {
            for i in 0..big_n {
                z[(i, c)] = y[(i, c)].conj();
            }
        }
        self.apply_q(&mut z);
        z.conj_in_place();
        z
    }

    /// Solve `A X = B` (least squares when tall, minimum norm when wide).
    ///
    /// `b` is `nrows x k`; `x` must be `ncols x k`.
    pub fn solve_into(&self, b: &DynMatrix<T>, x: &mut DynMatrix<T>) {
        assert_eq!(
            b.nrows(),
            self.nrows,
            "right-hand side has {} rows, matrix has {}",
            b.nrows(),
            self.nrows
        );
        assert_eq!(
            (x.nrows(), x.ncols()),
            (self.ncols, b.ncols()),
            "output must be {}x{}",
            self.ncols,
            b.ncols()
        );
        *x = if self.istrans {
            self.solve_st(b)
        } else {
            self.solve_s(b)
        };
    }

    /// Solve `A X = B` in place. The input must be square.
    pub fn solve_in_place(&self, b: &mut DynMatrix<T>) {
        assert_eq!(self.nrows, self.ncols, "in-place solve needs a square matrix");
        let rhs = b.clone();
        self.solve_into(&rhs, b);
    }

    /// Solve `X A = B`. `b` is `k x ncols`; `x` must be `k x nrows`.
    pub fn solve_right_into(&self, b: &DynMatrix<T>, x: &mut DynMatrix<T>) {
        assert_eq!(
            b.ncols(),
            self.ncols,
            "right-hand side has {} columns, matrix has {}",
            b.ncols(),
            self.ncols
        );
        assert_eq!(
            (x.nrows(), x.ncols()),
            (b.nrows(), self.nrows),
            "output must be {}x{}",
            b.nrows(),
            self.nrows
        );
        // X A = B  <=>  A^T X^T = B^T
        let bt = b.transpose();
        let xt = if self.istrans {
            self.solve_s(&bt)
        } else {
            self.solve_st(&bt)
        };
        *x = xt.transpose();
    }

    /// Solve `X A = B` in place. The input must be square.
    pub fn solve_right_in_place(&self, b: &mut DynMatrix<T>) {
        assert_eq!(self.nrows, self.ncols, "in-place solve needs a square matrix");
        let rhs = b.clone();
        self.solve_right_into(&rhs, b);
    }

    pub fn solve(&self, b: &DynVector<T>) -> DynVector<T> {
        let mut x = DynMatrix::zeros(self.ncols, 1, T::zero());
        self.solve_into(&b.inner, &mut x);
        DynVector { inner: x }
    }

    // ── Inverses ────────────────────────────────────────────────────

    /// Inverse, or the pseudo-inverse `R^-1 Q^H` for a non-square input of
    /// full rank.
    pub fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let mut out = DynMatrix::zeros(self.ncols, self.nrows, T::zero());
        self.inverse_into(&mut out)?;
        Ok(out)
    }

    pub fn inverse_into(&self, out: &mut DynMatrix<T>) -> Result<(), LinalgError> {
        assert_eq!(
            (out.nrows(), out.ncols()),
            (self.ncols, self.nrows),
            "inverse output must be {}x{}",
            self.ncols,
            self.nrows
        );
        let (big_m, big_n) = (self.qrx.nrows(), self.qrx.ncols());
        let rinv = trisolve::invert(&self.r(), Uplo::Upper, DiagKind::NonUnit, &self.tuning)?;
        // S^+ = R^-1 Q^H, built as (Q R^-H)^H.
        let mut z = DynMatrix::zeros(big_m, big_n, T::zero());
        for j in 0..big_n {
            for i in 0..big_n {
                z[(i, j)] = rinv[(j, i)].conj();
            }
        }
        self.apply_q(&mut z);
        *out = if self.istrans {
            z.conj_in_place();
            z
        } else {
            z.adjoint()
        };
        Ok(())
    }

    /// `R^-1 R^-H` for the stored `R`.
    fn gram_inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let rinv = trisolve::invert(&self.r(), Uplo::Upper, DiagKind::NonUnit, &self.tuning)?;
        Ok(&rinv * &rinv.adjoint())
    }

    /// `(A^H A)^-1`. Needs `nrows >= ncols`; a wide input gives
    /// `Err(Singular)` since `A^H A` is rank deficient.
    pub fn inverse_ata(&self) -> Result<DynMatrix<T>, LinalgError> {
        if self.nrows < self.ncols {
            return Err(LinalgError::Singular);
        }
        if !self.istrans {
            return self.gram_inverse();
        }
        let x = self.inverse()?;
        Ok(&x * &x.adjoint())
    }

    pub fn inverse_ata_into(&self, out: &mut DynMatrix<T>) -> Result<(), LinalgError> {
        *out = self.inverse_ata()?;
        Ok(())
    }

    /// `(A A^H)^-1`. Needs `nrows <= ncols`.
    pub fn inverse_aat(&self) -> Result<DynMatrix<T>, LinalgError> {
        if self.nrows > self.ncols {
            return Err(LinalgError::Singular);
        }
        if self.istrans {
            // A A^H = conj(S^H S) with S = A^T.
            let mut g = self.gram_inverse()?;
            g.conj_in_place();
            return Ok(g);
        }
        let x = self.inverse()?;
        Ok(&x.adjoint() * &x)
    }

    pub fn inverse_aat_into(&self, out: &mut DynMatrix<T>) -> Result<(), LinalgError> {
        *out = self.inverse_aat()?;
        Ok(())
    }

    /// Rebuild `Q R`, compare with `a` (or its transpose) and check that `Q`
    /// has orthonormal columns.
    pub fn check_decomposition(&self, a: &BandView<'_, T>) -> bool {
        assert_eq!(
            (a.nrows(), a.ncols()),
            (self.nrows, self.ncols),
            "matrix shape does not match factorization"
        );
        let (big_m, big_n) = (self.qrx.nrows(), self.qrx.ncols());
        let q = self.q();
        let r = self.r().to_dense();
        let target = if self.istrans {
            a.transpose().to_dense()
        } else {
            a.to_dense()
        };
        let residual = (&(&q * &r) - &target).frobenius_norm();
        let ortho = (&(&q.adjoint() * &q) - &DynMatrix::eye(big_n, T::zero())).frobenius_norm();

        let one = <T::Real as One>::one();
        let scale = <T::Real as NumCast>::from(8 * (big_m * big_n).max(1)).unwrap_or(one) * T::lepsilon();
        let tol = scale * (one + target.frobenius_norm());
        log::debug!(
            target: "bandeq",
            "band QR check: residual {:?}, orthogonality {:?}, tolerance {:?}",
            residual,
            ortho,
            tol
        );
        residual <= tol && ortho <= scale
    }
}

impl<'a, T: LinalgScalar> BandView<'a, T> {
    /// Band QR decomposition of a copy of this matrix.
    pub fn qr(&self) -> BandQr<T> {
        BandQr::new(self)
    }

    /// Least-squares (tall) or minimum-norm (wide) solution of `A x = b`.
    /// Returns `Err(Singular)` for a rank-deficient `R`.
    pub fn least_squares(&self, b: &DynVector<T>) -> Result<DynVector<T>, LinalgError> {
        let qr = self.qr();
        if qr.is_singular() {
            return Err(LinalgError::Singular);
        }
        Ok(qr.solve(b))
    }
}

impl<T: LinalgScalar> BandMatrix<T> {
    pub fn qr(&self) -> BandQr<T> {
        BandQr::new(&self.view())
    }

    pub fn least_squares(&self, b: &DynVector<T>) -> Result<DynVector<T>, LinalgError> {
        self.view().least_squares(b)
    }
}
