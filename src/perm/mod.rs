//! Row/column permutations stored as interchange lists.
//!
//! A [`Permutation`] built from `ipiv` stands for the matrix obtained by
//! swapping rows `k` and `ipiv[k]` for `k = 0, 1, ...` in order. The inverse
//! replays the same swaps backwards, so inverting never allocates a new list.

use alloc::vec::Vec;

use crate::dense::DynMatrix;
use crate::traits::Scalar;

/// Permutation as a sequence of pairwise interchanges.
///
/// ```
/// use bandeq::{DynMatrix, Permutation};
///
/// // Swap rows 0 and 2, then rows 1 and 2.
/// let p = Permutation::from_interchanges(vec![2, 2, 2]);
/// assert_eq!(p.to_indices(), vec![2, 0, 1]);
/// assert_eq!(p.det(), 1);
///
/// let mut m = DynMatrix::from_rows(3, 1, &[10.0, 20.0, 30.0]);
/// p.apply_on_left(&mut m);
/// assert_eq!(m.as_slice(), &[30.0, 10.0, 20.0]);
///
/// p.inverse().apply_on_left(&mut m);
/// assert_eq!(m.as_slice(), &[10.0, 20.0, 30.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    ipiv: Vec<usize>,
    reversed: bool,
    det: i8,
}

impl Permutation {
    /// Identity permutation of size `n`.
    pub fn identity(n: usize) -> Self {
        Self {
            ipiv: (0..n).collect(),
            reversed: false,
            det: 1,
        }
    }

    /// Build from an interchange list, computing the sign.
    ///
    /// Panics if any entry is out of range.
    pub fn from_interchanges(ipiv: Vec<usize>) -> Self {
        let n = ipiv.len();
        let mut det = 1;
        for (k, &p) in ipiv.iter().enumerate() {
            assert!(p < n, "interchange {} -> {} out of range for size {}", k, p, n);
            if p != k {
                det = -det;
            }
        }
        Self {
            ipiv,
            reversed: false,
            det,
        }
    }

    /// Build from an interchange list whose sign is already known.
    pub fn from_interchanges_with_det(ipiv: Vec<usize>, det: i8) -> Self {
        debug_assert!(det == 1 || det == -1);
        debug_assert_eq!(Self::from_interchanges(ipiv.clone()).det, det);
        Self {
            ipiv,
            reversed: false,
            det,
        }
    }

    /// Build the permutation `P` with `(P x)[i] = x[sigma[i]]`.
    ///
    /// Panics if `sigma` is not a permutation of `0..n`.
    pub fn from_indices(sigma: &[usize]) -> Self {
        let n = sigma.len();
        let mut cur: Vec<usize> = (0..n).collect();
        let mut pos: Vec<usize> = (0..n).collect();
        let mut seen = alloc::vec![false; n];
        let mut ipiv = Vec::with_capacity(n);
        let mut det = 1;
        for k in 0..n {
            let want = sigma[k];
            assert!(want < n && !seen[want], "not a permutation: {:?}", sigma);
            seen[want] = true;
            let p = pos[want];
            ipiv.push(p);
            if p != k {
                det = -det;
                let displaced = cur[k];
                cur.swap(k, p);
                pos[displaced] = p;
                pos[want] = k;
            }
        }
        Self {
            ipiv,
            reversed: false,
            det,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ipiv.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ipiv.is_empty()
    }

    /// Raw interchange list.
    #[inline]
    pub fn interchanges(&self) -> &[usize] {
        &self.ipiv
    }

    /// Whether swaps are replayed back to front.
    #[inline]
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Determinant, `+1` or `-1`.
    #[inline]
    pub fn det(&self) -> i8 {
        self.det
    }

    pub fn is_identity(&self) -> bool {
        self.ipiv.iter().enumerate().all(|(k, &p)| k == p)
    }

    /// Inverse (also the transpose). No allocation beyond the clone.
    pub fn inverse(&self) -> Self {
        Self {
            ipiv: self.ipiv.clone(),
            reversed: !self.reversed,
            det: self.det,
        }
    }

    /// Visit the interchanges in application order, or backwards.
    fn for_each_swap(&self, backwards: bool, mut f: impl FnMut(usize, usize)) {
        if self.reversed != backwards {
            for k in (0..self.ipiv.len()).rev() {
                f(k, self.ipiv[k]);
            }
        } else {
            for (k, &p) in self.ipiv.iter().enumerate() {
                f(k, p);
            }
        }
    }

    /// Apply only interchange `k` to `x`.
    ///
    /// Factorizations that interleave row swaps with elimination replay the
    /// interchanges one step at a time through this.
    #[inline]
    pub fn apply_step<T>(&self, k: usize, x: &mut [T]) {
        let p = self.ipiv[k];
        if p != k {
            x.swap(k, p);
        }
    }

    /// `x <- P x`.
    pub fn apply_to_slice<T>(&self, x: &mut [T]) {
        assert_eq!(x.len(), self.len(), "permutation size mismatch");
        self.for_each_swap(false, |k, p| x.swap(k, p));
    }

    /// `m <- P m` (row permutation).
    pub fn apply_on_left<T: Scalar>(&self, m: &mut DynMatrix<T>) {
        assert_eq!(
            m.nrows(),
            self.len(),
            "permutation of size {} applied to {} rows",
            self.len(),
            m.nrows()
        );
        self.for_each_swap(false, |k, p| m.swap_rows(k, p));
    }

    /// `m <- m P` (column permutation).
    pub fn apply_on_right<T: Scalar>(&self, m: &mut DynMatrix<T>) {
        assert_eq!(
            m.ncols(),
            self.len(),
            "permutation of size {} applied to {} columns",
            self.len(),
            m.ncols()
        );
        // m P = (Pᵀ mᵀ)ᵀ, and Pᵀ replays the swaps in the opposite order.
        self.for_each_swap(true, |k, p| m.swap_cols(k, p));
    }

    /// `sigma` with `(P x)[i] = x[sigma[i]]`.
    pub fn to_indices(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.len()).collect();
        self.apply_to_slice(&mut idx);
        idx
    }

    /// Product `self * other`.
    pub fn compose(&self, other: &Self) -> Self {
        assert_eq!(self.len(), other.len(), "permutation size mismatch");
        let a = other.to_indices();
        let b = self.to_indices();
        let sigma: Vec<usize> = b.iter().map(|&bi| a[bi]).collect();
        let out = Self::from_indices(&sigma);
        debug_assert_eq!(out.det, self.det * other.det);
        out
    }

    /// Dense permutation matrix.
    pub fn to_dense<T: Scalar>(&self) -> DynMatrix<T> {
        let mut m = DynMatrix::eye(self.len(), T::zero());
        self.apply_on_left(&mut m);
        m
    }
}
