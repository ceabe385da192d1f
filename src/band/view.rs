use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use num_traits::Zero;

use crate::dense::{DynMatrix, DynVector};
use crate::traits::LinalgScalar;

use super::storage::{BandStorage, StorageOrder};

/// Read-only view of a banded matrix stored in someone else's buffer.
///
/// Cheap to copy. Transposed, conjugated and sub-band views share the same
/// buffer and only differ in geometry and the conjugation flag.
///
/// ```
/// use bandeq::{BandMatrix, StorageOrder};
///
/// let a = BandMatrix::from_fn(4, 4, 1, 2, StorageOrder::ColMajor, |i, j| (10 * i + j) as f64);
/// let v = a.view();
/// assert_eq!(v.get(1, 3), 13.0);
/// assert_eq!(v.get(3, 0), 0.0); // outside the band
///
/// let t = v.transpose();
/// assert_eq!((t.nlo(), t.nhi()), (2, 1));
/// assert_eq!(t.get(3, 1), 13.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BandView<'a, T> {
    pub(crate) data: &'a [T],
    pub(crate) storage: BandStorage,
    pub(crate) conj: bool,
}

/// Mutable view of a banded matrix.
///
/// Writes through a conjugated view store the conjugate, so reading back
/// through the same view returns what was written.
#[derive(Debug)]
pub struct BandViewMut<'a, T> {
    pub(crate) data: &'a mut [T],
    pub(crate) storage: BandStorage,
    pub(crate) conj: bool,
}

/// Owned banded matrix.
///
/// Allocates exactly [`BandStorage::len`] elements.
#[derive(Debug, Clone, PartialEq)]
pub struct BandMatrix<T> {
    pub(crate) data: Vec<T>,
    pub(crate) storage: BandStorage,
}

/// One diagonal of a band, as a strided vector.
#[derive(Debug, Clone, Copy)]
pub struct DiagView<'a, T> {
    data: &'a [T],
    start: isize,
    step: isize,
    len: usize,
    conj: bool,
}

// ── BandView ────────────────────────────────────────────────────────

impl<'a, T: LinalgScalar> BandView<'a, T> {
    /// Wrap a caller-owned buffer.
    ///
    /// Panics if the buffer is shorter than `storage.len()`.
    pub fn new(data: &'a [T], storage: BandStorage) -> Self {
        assert!(
            data.len() >= storage.len(),
            "buffer of length {} too short for band layout needing {}",
            data.len(),
            storage.len()
        );
        Self {
            data,
            storage,
            conj: false,
        }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.storage.nrows()
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.storage.ncols()
    }

    /// Number of sub-diagonals.
    #[inline]
    pub fn nlo(&self) -> usize {
        self.storage.nlo()
    }

    /// Number of super-diagonals.
    #[inline]
    pub fn nhi(&self) -> usize {
        self.storage.nhi()
    }

    #[inline]
    pub fn storage(&self) -> &BandStorage {
        &self.storage
    }

    #[inline]
    pub fn storage_order(&self) -> StorageOrder {
        self.storage.order()
    }

    #[inline]
    pub fn is_conj(&self) -> bool {
        self.conj
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    /// Underlying buffer. Pair with [`offset_of`](Self::offset_of) and
    /// [`strides`](Self::strides) for direct access.
    #[inline]
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Buffer offset of in-band element `(i, j)`.
    #[inline]
    pub fn offset_of(&self, i: usize, j: usize) -> usize {
        self.storage.index(i, j)
    }

    /// `(stepi, stepj)` buffer strides.
    #[inline]
    pub fn strides(&self) -> (isize, isize) {
        (self.storage.stepi(), self.storage.stepj())
    }

    /// Element `(i, j)`; zero outside the band.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        assert!(
            i < self.nrows() && j < self.ncols(),
            "index ({}, {}) out of bounds for {}x{} band",
            i,
            j,
            self.nrows(),
            self.ncols()
        );
        if self.storage.in_band(i, j) {
            self.at(i, j)
        } else {
            T::zero()
        }
    }

    /// Element `(i, j)`, which must be in the band.
    #[inline]
    pub(crate) fn at(&self, i: usize, j: usize) -> T {
        let v = self.data[self.storage.raw_offset(i, j) as usize];
        if self.conj {
            v.conj()
        } else {
            v
        }
    }

    #[inline]
    pub fn row_range(&self, i: usize) -> core::ops::Range<usize> {
        self.storage.row_range(i)
    }

    #[inline]
    pub fn col_range(&self, j: usize) -> core::ops::Range<usize> {
        self.storage.col_range(j)
    }

    /// Rows `i1..i2`, columns `j1..j2`, with bandwidths `lo`/`hi`.
    pub fn sub_band(&self, i1: usize, i2: usize, j1: usize, j2: usize, lo: usize, hi: usize) -> Self {
        Self {
            data: self.data,
            storage: self.storage.sub_band(i1, i2, j1, j2, lo, hi),
            conj: self.conj,
        }
    }

    /// Diagonals `k1 <= d < k2` as a band.
    pub fn diag_range(&self, k1: isize, k2: isize) -> Self {
        Self {
            data: self.data,
            storage: self.storage.diag_range(k1, k2),
            conj: self.conj,
        }
    }

    /// Upper triangle including the diagonal.
    pub fn upper_band(&self) -> Self {
        self.diag_range(0, self.nhi() as isize + 1)
    }

    /// Lower triangle including the diagonal.
    pub fn lower_band(&self) -> Self {
        self.diag_range(-(self.nlo() as isize), 1)
    }

    /// Diagonal `k` (`0` main, positive above, negative below).
    pub fn diag(&self, k: isize) -> DiagView<'a, T> {
        let (start, step, len) = self.storage.diag_span(k);
        DiagView {
            data: self.data,
            start,
            step,
            len,
            conj: self.conj,
        }
    }

    pub fn transpose(&self) -> Self {
        Self {
            data: self.data,
            storage: self.storage.transpose(),
            conj: self.conj,
        }
    }

    /// Flip the conjugation flag. No data moves.
    pub fn conjugate(&self) -> Self {
        Self {
            data: self.data,
            storage: self.storage,
            conj: !self.conj,
        }
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> Self {
        self.transpose().conjugate()
    }

    /// Copy into a dense matrix.
    pub fn to_dense(&self) -> DynMatrix<T> {
        let mut out = DynMatrix::zeros(self.nrows(), self.ncols(), T::zero());
        for j in 0..self.ncols() {
            for i in self.col_range(j) {
                out[(i, j)] = self.at(i, j);
            }
        }
        out
    }

    /// Copy into a freshly allocated band with the given storage order.
    pub fn to_band(&self, order: StorageOrder) -> BandMatrix<T> {
        let mut out = BandMatrix::zeros(self.nrows(), self.ncols(), self.nlo(), self.nhi(), order);
        for j in 0..self.ncols() {
            for i in self.col_range(j) {
                out[(i, j)] = self.at(i, j);
            }
        }
        out
    }

    /// Band × dense product.
    ///
    /// ```
    /// use bandeq::{BandMatrix, DynMatrix, StorageOrder};
    /// let a = BandMatrix::from_fn(3, 3, 1, 1, StorageOrder::DiagMajor, |i, j| {
    ///     if i == j { 2.0_f64 } else { -1.0 }
    /// });
    /// let x = DynMatrix::from_rows(3, 1, &[1.0, 1.0, 1.0]);
    /// let y = a.view().mul_dense(&x);
    /// assert_eq!(y.as_slice(), &[1.0, 0.0, 1.0]);
    /// ```
    pub fn mul_dense(&self, b: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(
            self.ncols(),
            b.nrows(),
            "dimension mismatch: {}x{} band * {}x{}",
            self.nrows(),
            self.ncols(),
            b.nrows(),
            b.ncols()
        );
        let mut out = DynMatrix::zeros(self.nrows(), b.ncols(), T::zero());
        for c in 0..b.ncols() {
            for j in 0..self.ncols() {
                let bj = b[(j, c)];
                if bj == T::zero() {
                    continue;
                }
                for i in self.col_range(j) {
                    out[(i, c)] = out[(i, c)] + self.at(i, j) * bj;
                }
            }
        }
        out
    }

    /// Band × vector product.
    pub fn mul_vec(&self, x: &DynVector<T>) -> DynVector<T> {
        DynVector {
            inner: self.mul_dense(&x.inner),
        }
    }

    /// Frobenius norm over the band.
    pub fn norm_frobenius(&self) -> T::Real {
        let mut sum = <T::Real as Zero>::zero();
        for j in 0..self.ncols() {
            for i in self.col_range(j) {
                sum = sum + self.at(i, j).modulus_sq();
            }
        }
        sum.lsqrt()
    }

    /// Infinity norm (maximum row sum of moduli).
    pub fn norm_inf(&self) -> T::Real {
        let mut max = <T::Real as Zero>::zero();
        for i in 0..self.nrows() {
            let mut s = <T::Real as Zero>::zero();
            for j in self.row_range(i) {
                s = s + self.at(i, j).modulus();
            }
            if s > max {
                max = s;
            }
        }
        max
    }

    /// One norm (maximum column sum of moduli).
    pub fn norm_one(&self) -> T::Real {
        self.transpose().norm_inf()
    }
}

// ── BandViewMut ─────────────────────────────────────────────────────

impl<'a, T: LinalgScalar> BandViewMut<'a, T> {
    /// Wrap a caller-owned mutable buffer.
    pub fn new(data: &'a mut [T], storage: BandStorage) -> Self {
        assert!(
            data.len() >= storage.len(),
            "buffer of length {} too short for band layout needing {}",
            data.len(),
            storage.len()
        );
        Self {
            data,
            storage,
            conj: false,
        }
    }

    /// Read-only view of the same band.
    #[inline]
    pub fn as_ref(&self) -> BandView<'_, T> {
        BandView {
            data: &*self.data,
            storage: self.storage,
            conj: self.conj,
        }
    }

    /// Reborrow with a shorter lifetime.
    #[inline]
    pub fn rb_mut(&mut self) -> BandViewMut<'_, T> {
        BandViewMut {
            data: &mut *self.data,
            storage: self.storage,
            conj: self.conj,
        }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.storage.nrows()
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.storage.ncols()
    }

    #[inline]
    pub fn nlo(&self) -> usize {
        self.storage.nlo()
    }

    #[inline]
    pub fn nhi(&self) -> usize {
        self.storage.nhi()
    }

    #[inline]
    pub fn storage(&self) -> &BandStorage {
        &self.storage
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.as_ref().get(i, j)
    }

    /// Write element `(i, j)`. Panics outside the band.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        let k = self.storage.index(i, j);
        self.data[k] = if self.conj { value.conj() } else { value };
    }

    /// Zero every in-band element.
    pub fn fill_zero(&mut self) {
        for j in 0..self.ncols() {
            for i in self.storage.col_range(j) {
                let k = self.storage.raw_offset(i, j) as usize;
                self.data[k] = T::zero();
            }
        }
    }

    pub fn sub_band_mut(
        self,
        i1: usize,
        i2: usize,
        j1: usize,
        j2: usize,
        lo: usize,
        hi: usize,
    ) -> Self {
        let storage = self.storage.sub_band(i1, i2, j1, j2, lo, hi);
        Self {
            data: self.data,
            storage,
            conj: self.conj,
        }
    }

    pub fn diag_range_mut(self, k1: isize, k2: isize) -> Self {
        let storage = self.storage.diag_range(k1, k2);
        Self {
            data: self.data,
            storage,
            conj: self.conj,
        }
    }

    pub fn transpose_mut(self) -> Self {
        let storage = self.storage.transpose();
        Self {
            data: self.data,
            storage,
            conj: self.conj,
        }
    }

    pub fn conjugate_mut(self) -> Self {
        Self {
            data: self.data,
            storage: self.storage,
            conj: !self.conj,
        }
    }
}

// ── BandMatrix ──────────────────────────────────────────────────────

impl<T: LinalgScalar> BandMatrix<T> {
    /// Zero-filled `nrows x ncols` band.
    ///
    /// ```
    /// use bandeq::{BandMatrix, StorageOrder};
    /// let a = BandMatrix::<f64>::zeros(5, 5, 1, 1, StorageOrder::DiagMajor);
    /// assert_eq!(a.as_slice().len(), 13);
    /// ```
    pub fn zeros(nrows: usize, ncols: usize, nlo: usize, nhi: usize, order: StorageOrder) -> Self {
        let storage = BandStorage::new(nrows, ncols, nlo, nhi, order);
        Self {
            data: vec![T::zero(); storage.len()],
            storage,
        }
    }

    /// Band filled by calling `f(i, j)` for each in-band element.
    pub fn from_fn(
        nrows: usize,
        ncols: usize,
        nlo: usize,
        nhi: usize,
        order: StorageOrder,
        mut f: impl FnMut(usize, usize) -> T,
    ) -> Self {
        let mut out = Self::zeros(nrows, ncols, nlo, nhi, order);
        for j in 0..ncols {
            for i in out.storage.col_range(j) {
                let k = out.storage.raw_offset(i, j) as usize;
                out.data[k] = f(i, j);
            }
        }
        out
    }

    /// Copy the `[-nlo, nhi]` band of a dense matrix. Entries outside the
    /// band are ignored.
    pub fn from_dense(a: &DynMatrix<T>, nlo: usize, nhi: usize, order: StorageOrder) -> Self {
        Self::from_fn(a.nrows(), a.ncols(), nlo, nhi, order, |i, j| a[(i, j)])
    }

    /// Wrap an existing buffer laid out according to `storage`.
    pub fn from_vec(data: Vec<T>, storage: BandStorage) -> Self {
        assert!(
            data.len() >= storage.len(),
            "buffer of length {} too short for band layout needing {}",
            data.len(),
            storage.len()
        );
        Self { data, storage }
    }

    #[inline]
    pub fn view(&self) -> BandView<'_, T> {
        BandView {
            data: &self.data,
            storage: self.storage,
            conj: false,
        }
    }

    #[inline]
    pub fn view_mut(&mut self) -> BandViewMut<'_, T> {
        BandViewMut {
            data: &mut self.data,
            storage: self.storage,
            conj: false,
        }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.storage.nrows()
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.storage.ncols()
    }

    #[inline]
    pub fn nlo(&self) -> usize {
        self.storage.nlo()
    }

    #[inline]
    pub fn nhi(&self) -> usize {
        self.storage.nhi()
    }

    #[inline]
    pub fn storage(&self) -> &BandStorage {
        &self.storage
    }

    /// Element `(i, j)`; zero outside the band.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.view().get(i, j)
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn to_dense(&self) -> DynMatrix<T> {
        self.view().to_dense()
    }

    /// Transpose by swapping strides. No data moves.
    pub fn into_transpose(self) -> Self {
        Self {
            data: self.data,
            storage: self.storage.transpose(),
        }
    }

    /// Release the buffer and its layout.
    pub fn into_parts(self) -> (Vec<T>, BandStorage) {
        (self.data, self.storage)
    }
}

impl<T> Index<(usize, usize)> for BandMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.data[self.storage.index(i, j)]
    }
}

impl<T> IndexMut<(usize, usize)> for BandMatrix<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        let k = self.storage.index(i, j);
        &mut self.data[k]
    }
}

// ── DiagView ────────────────────────────────────────────────────────

impl<'a, T: LinalgScalar> DiagView<'a, T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, k: usize) -> T {
        assert!(k < self.len, "diagonal index {} out of bounds ({})", k, self.len);
        let v = self.data[(self.start + k as isize * self.step) as usize];
        if self.conj {
            v.conj()
        } else {
            v
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).map(move |k| self.get(k))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}
