//! Banded decompositions and the triangular kernels they share.
//!
//! - [`BandLu`]: LU with partial pivoting confined to the band.
//! - [`BandQr`]: Householder QR for least-squares and minimum-norm solves.
//! - [`BandCholesky`]: `L L^H` for Hermitian positive-definite bands.
//!
//! Each factorization owns its packed factors, exposes `solve`, `det`,
//! `inverse` and friends, and holds a [`Tuning`] that controls how the
//! triangular kernels in [`trisolve`] are dispatched.

mod band_cholesky;
mod band_lu;
mod band_qr;
pub mod householder;
pub mod trisolve;
mod tuning;

pub use band_cholesky::BandCholesky;
pub use band_lu::BandLu;
pub use band_qr::BandQr;
pub use trisolve::{DiagKind, Uplo};
pub use tuning::{Parallelism, Tuning};

/// Errors from band decompositions.
///
/// ```
/// use bandeq::{BandMatrix, StorageOrder};
/// use bandeq::linalg::LinalgError;
///
/// let singular = BandMatrix::from_fn(2, 2, 1, 1, StorageOrder::ColMajor, |_, _| 1.0_f64);
/// assert_eq!(singular.inverse().unwrap_err(), LinalgError::Singular);
///
/// let not_pd = BandMatrix::from_fn(2, 2, 1, 1, StorageOrder::ColMajor, |i, j| {
///     if i == j { 1.0_f64 } else { 5.0 }
/// });
/// assert_eq!(not_pd.cholesky().unwrap_err(), LinalgError::NotPositiveDefinite);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinalgError {
    /// Matrix is singular, or a triangular factor has a zero on its diagonal.
    Singular,
    /// Matrix is not positive definite (required for Cholesky).
    NotPositiveDefinite,
    /// A buffer handed over for in-place factorization is too narrow.
    BandwidthMismatch { expected: usize, got: usize },
}

impl core::fmt::Display for LinalgError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinalgError::Singular => write!(f, "matrix is singular"),
            LinalgError::NotPositiveDefinite => write!(f, "matrix is not positive definite"),
            LinalgError::BandwidthMismatch { expected, got } => {
                write!(f, "band storage too narrow: need {}, got {}", expected, got)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LinalgError {}
