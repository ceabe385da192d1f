/// Physical layout of a banded matrix buffer.
///
/// - `RowMajor`: the in-band part of each row is contiguous.
/// - `ColMajor`: the in-band part of each column is contiguous.
/// - `DiagMajor`: each diagonal is contiguous. Cheapest for tridiagonal bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOrder {
    RowMajor,
    ColMajor,
    DiagMajor,
}

impl StorageOrder {
    /// Layout chosen for freshly allocated bands with the given bandwidths.
    ///
    /// ```
    /// use bandeq::StorageOrder;
    /// assert_eq!(StorageOrder::preferred(1, 1), StorageOrder::DiagMajor);
    /// assert_eq!(StorageOrder::preferred(2, 3), StorageOrder::ColMajor);
    /// ```
    pub fn preferred(nlo: usize, nhi: usize) -> Self {
        if nlo == 1 && nhi == 1 {
            StorageOrder::DiagMajor
        } else {
            StorageOrder::ColMajor
        }
    }

    /// Layout seen through a transposed view.
    #[inline]
    pub fn transposed(self) -> Self {
        match self {
            StorageOrder::RowMajor => StorageOrder::ColMajor,
            StorageOrder::ColMajor => StorageOrder::RowMajor,
            StorageOrder::DiagMajor => StorageOrder::DiagMajor,
        }
    }
}

/// Geometry of a banded matrix inside a 1-D buffer.
///
/// Element `(i, j)` with `-nlo <= j - i <= nhi` lives at
/// `base + i * stepi + j * stepj`. Strides are signed because the
/// diagonal-major layout walks rows backwards.
///
/// For an `M x N` band with `L = M`:
///
/// | order       | stepi    | stepj    | base          |
/// |-------------|----------|----------|---------------|
/// | `ColMajor`  | 1        | nlo+nhi  | 0             |
/// | `RowMajor`  | nlo+nhi  | 1        | 0             |
/// | `DiagMajor` | 1-L      | L        | nlo*(L-1)     |
///
/// ```
/// use bandeq::{BandStorage, StorageOrder};
///
/// let s = BandStorage::new(5, 5, 1, 1, StorageOrder::ColMajor);
/// assert_eq!(s.len(), 13);
/// assert_eq!(s.index(0, 0), 0);
/// assert_eq!(s.index(1, 0), 1);
/// assert_eq!(s.index(0, 1), 2);
/// assert_eq!(s.diagstep(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandStorage {
    nrows: usize,
    ncols: usize,
    nlo: usize,
    nhi: usize,
    stepi: isize,
    stepj: isize,
    base: isize,
    order: StorageOrder,
}

impl BandStorage {
    /// Compact layout for an `nrows x ncols` band.
    ///
    /// Panics unless `nlo < nrows` and `nhi < ncols` (an empty matrix must
    /// have zero bandwidths).
    pub fn new(nrows: usize, ncols: usize, nlo: usize, nhi: usize, order: StorageOrder) -> Self {
        if nrows == 0 || ncols == 0 {
            assert!(
                nlo == 0 && nhi == 0,
                "empty band matrix must have nlo = nhi = 0 (got {}, {})",
                nlo,
                nhi
            );
        } else {
            assert!(nlo < nrows, "nlo = {} must be less than nrows = {}", nlo, nrows);
            assert!(nhi < ncols, "nhi = {} must be less than ncols = {}", nhi, ncols);
        }
        let w = (nlo + nhi) as isize;
        let (stepi, stepj, base) = match order {
            StorageOrder::ColMajor => (1, w, 0),
            StorageOrder::RowMajor => (w, 1, 0),
            StorageOrder::DiagMajor => {
                let l = nrows as isize;
                (1 - l, l, nlo as isize * (l - 1))
            }
        };
        Self {
            nrows,
            ncols,
            nlo,
            nhi,
            stepi,
            stepj,
            base,
            order,
        }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn nlo(&self) -> usize {
        self.nlo
    }

    #[inline]
    pub fn nhi(&self) -> usize {
        self.nhi
    }

    #[inline]
    pub fn order(&self) -> StorageOrder {
        self.order
    }

    /// Buffer offset step when moving down one row.
    #[inline]
    pub fn stepi(&self) -> isize {
        self.stepi
    }

    /// Buffer offset step when moving right one column.
    #[inline]
    pub fn stepj(&self) -> isize {
        self.stepj
    }

    /// Buffer offset step along a diagonal.
    #[inline]
    pub fn diagstep(&self) -> isize {
        self.stepi + self.stepj
    }

    /// Offset of the (possibly virtual) element `(0, 0)`.
    #[inline]
    pub fn base(&self) -> isize {
        self.base
    }

    /// Whether `(i, j)` lies inside the matrix and inside the band.
    #[inline]
    pub fn in_band(&self, i: usize, j: usize) -> bool {
        i < self.nrows && j < self.ncols && j + self.nlo >= i && i + self.nhi >= j
    }

    /// Buffer offset of `(i, j)` without any band check.
    #[inline]
    pub(crate) fn raw_offset(&self, i: usize, j: usize) -> isize {
        self.base + i as isize * self.stepi + j as isize * self.stepj
    }

    /// Buffer offset of the in-band element `(i, j)`.
    ///
    /// Panics if `(i, j)` is outside the band.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        assert!(
            self.in_band(i, j),
            "element ({}, {}) outside {}x{} band [-{}, {}]",
            i,
            j,
            self.nrows,
            self.ncols,
            self.nlo,
            self.nhi
        );
        self.raw_offset(i, j) as usize
    }

    /// Range of in-band columns in row `i`.
    #[inline]
    pub fn row_range(&self, i: usize) -> core::ops::Range<usize> {
        let start = i.saturating_sub(self.nlo);
        let end = (i + self.nhi + 1).min(self.ncols);
        start..end.max(start)
    }

    /// Range of in-band rows in column `j`.
    #[inline]
    pub fn col_range(&self, j: usize) -> core::ops::Range<usize> {
        let start = j.saturating_sub(self.nhi);
        let end = (j + self.nlo + 1).min(self.nrows);
        start..end.max(start)
    }

    /// Minimum buffer length needed to hold every in-band element.
    pub fn len(&self) -> usize {
        if self.nrows == 0 || self.ncols == 0 {
            return 0;
        }
        let (m, n) = (self.nrows, self.ncols);
        let last = match self.order {
            StorageOrder::DiagMajor => {
                // Highest diagonal, last element.
                let d = self.nhi;
                let i = (m - 1).min(n - 1 - d);
                self.raw_offset(i, i + d)
            }
            StorageOrder::ColMajor => {
                let j = (n - 1).min(m - 1 + self.nhi);
                let i = (m - 1).min(j + self.nlo);
                self.raw_offset(i, j)
            }
            StorageOrder::RowMajor => {
                let i = (m - 1).min(n - 1 + self.nlo);
                let j = (n - 1).min(i + self.nhi);
                self.raw_offset(i, j)
            }
        };
        last as usize + 1
    }

    /// Whether the layout addresses no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Geometry of a sub-band: rows `i1..i2`, columns `j1..j2`, bandwidths
    /// `lo`/`hi` (clamped to the sub-matrix size).
    ///
    /// Panics if the ranges leave the matrix or if any requested diagonal
    /// falls outside the parent band.
    pub fn sub_band(
        &self,
        i1: usize,
        i2: usize,
        j1: usize,
        j2: usize,
        lo: usize,
        hi: usize,
    ) -> Self {
        assert!(
            i1 <= i2 && i2 <= self.nrows,
            "row range {}..{} out of bounds for {} rows",
            i1,
            i2,
            self.nrows
        );
        assert!(
            j1 <= j2 && j2 <= self.ncols,
            "column range {}..{} out of bounds for {} columns",
            j1,
            j2,
            self.ncols
        );
        let (rows, cols) = (i2 - i1, j2 - j1);
        let lo = if rows == 0 { 0 } else { lo.min(rows - 1) };
        let hi = if cols == 0 { 0 } else { hi.min(cols - 1) };
        let shift = j1 as isize - i1 as isize;
        if rows > 0 && cols > 0 {
            assert!(
                shift - lo as isize >= -(self.nlo as isize)
                    && shift + hi as isize <= self.nhi as isize,
                "sub-band diagonals [{}, {}] outside parent band [-{}, {}]",
                shift - lo as isize,
                shift + hi as isize,
                self.nlo,
                self.nhi
            );
        }
        Self {
            nrows: rows,
            ncols: cols,
            nlo: lo,
            nhi: hi,
            stepi: self.stepi,
            stepj: self.stepj,
            base: self.raw_offset(i1, j1),
            order: self.order,
        }
    }

    /// Geometry of the transposed band. No data moves.
    pub fn transpose(&self) -> Self {
        Self {
            nrows: self.ncols,
            ncols: self.nrows,
            nlo: self.nhi,
            nhi: self.nlo,
            stepi: self.stepj,
            stepj: self.stepi,
            base: self.base,
            order: self.order.transposed(),
        }
    }

    /// Diagonals `k1 <= d < k2` as a band.
    ///
    /// When the range straddles the main diagonal the shape is unchanged;
    /// otherwise the result is the sub-matrix whose main diagonal is the
    /// nearest diagonal of the range.
    pub fn diag_range(&self, k1: isize, k2: isize) -> Self {
        assert!(k1 < k2, "empty diagonal range {}..{}", k1, k2);
        assert!(
            k1 >= -(self.nlo as isize) && k2 <= self.nhi as isize + 1,
            "diagonal range {}..{} outside band [-{}, {}]",
            k1,
            k2,
            self.nlo,
            self.nhi
        );
        if k1 <= 0 && k2 > 0 {
            let mut out = *self;
            out.nlo = (-k1) as usize;
            out.nhi = (k2 - 1) as usize;
            out
        } else if k1 > 0 {
            let j1 = k1 as usize;
            let rows = self.nrows.min(self.ncols - j1);
            self.sub_band(0, rows, j1, self.ncols, 0, (k2 - 1 - k1) as usize)
        } else {
            let i1 = (1 - k2) as usize;
            let cols = self.ncols.min(self.nrows - i1);
            self.sub_band(i1, self.nrows, 0, cols, (k2 - 1 - k1) as usize, 0)
        }
    }

    /// `(start offset, step, length)` of diagonal `k`.
    pub(crate) fn diag_span(&self, k: isize) -> (isize, isize, usize) {
        assert!(
            k >= -(self.nlo as isize) && k <= self.nhi as isize,
            "diagonal {} outside band [-{}, {}]",
            k,
            self.nlo,
            self.nhi
        );
        let (i0, j0) = if k >= 0 { (0, k as usize) } else { ((-k) as usize, 0) };
        let len = if i0 >= self.nrows || j0 >= self.ncols {
            0
        } else {
            (self.nrows - i0).min(self.ncols - j0)
        };
        (self.raw_offset(i0, j0), self.diagstep(), len)
    }
}
