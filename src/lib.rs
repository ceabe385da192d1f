//! # bandeq
//!
//! Pure-Rust banded direct solvers, no-std compatible. A band matrix is
//! stored compactly in row-, column- or diagonal-major order and read
//! through lightweight views; LU, QR and Cholesky factorizations keep the
//! band structure (and its fill-in) instead of densifying.
//!
//! ## Quick start
//!
//! ```
//! use bandeq::{BandMatrix, DynVector, StorageOrder};
//!
//! // Tridiagonal system with solution [1, 1, 1, 1].
//! let a = BandMatrix::from_fn(4, 4, 1, 1, StorageOrder::DiagMajor, |i, j| {
//!     if i == j { 2.0_f64 } else { -1.0 }
//! });
//! let b = DynVector::from_slice(&[1.0, 0.0, 0.0, 1.0]);
//! let x = a.solve(&b).unwrap();
//! for i in 0..4 {
//!     assert!((x[i] - 1.0).abs() < 1e-12);
//! }
//! assert!((a.det() - 5.0).abs() < 1e-12);
//! ```
//!
//! ## Modules
//!
//! - [`band`]: [`BandStorage`] layouts, borrowed [`BandView`] /
//!   [`BandViewMut`] handles and the owning [`BandMatrix`]. Sub-band,
//!   diagonal-range, transpose and conjugate views never move data.
//!
//! - [`linalg`]: [`BandLu`](linalg::BandLu) (partial pivoting inside the
//!   band), [`BandQr`](linalg::BandQr) (Householder, least squares and
//!   minimum norm), [`BandCholesky`](linalg::BandCholesky), and the banded
//!   triangular kernels in [`linalg::trisolve`]. Convenience methods on
//!   views and owned bands: `a.lu()`, `a.qr()`, `a.cholesky()`,
//!   `a.solve(&b)`, `a.det()`, `a.inverse()`.
//!
//! - [`perm`]: [`Permutation`] stored as an interchange list.
//!
//! - [`dense`]: column-major [`DynMatrix`] / [`DynVector`] used for
//!   right-hand sides, explicit factors and inverses.
//!
//! - [`traits`]: element traits.
//!   - [`Scalar`]: all matrix elements (`Copy + PartialEq + Debug + Zero + One + Num`)
//!   - [`FloatScalar`]: real floats
//!   - [`LinalgScalar`]: real floats and complex numbers, used by decompositions and norms
//!   - [`MatrixRef`] / [`MatrixMut`]: column-slice access for the reflector helpers
//!
//! ## Complex matrices
//!
//! Enable the `complex` feature to factor `Complex<f32>` / `Complex<f64>`
//! bands. Cholesky generalizes to Hermitian (`A = L L^H`), QR uses complex
//! Householder reflections with real `beta`, and norms return real values.
//!
//! ## Logging
//!
//! Algorithm decisions are logged through the `log` facade at `debug` level
//! under the `bandeq` target. Performance notices (for example in-place
//! factorization of row-major storage) go to `warn` under `bandeq_perf`.
//!
//! ## Cargo features
//!
//! | Feature   | Default  | Description |
//! |-----------|----------|-------------|
//! | `std`     | yes      | Hardware FPU via system libm, `std::error::Error` |
//! | `libm`    | baseline | Pure-Rust software float fallback |
//! | `complex` | no       | `Complex<f32>` / `Complex<f64>` support via `num-complex` |
//! | `rayon`   | no       | Split triangular solves over right-hand-side columns |
//! | `all`     | no       | All features: `std` + `complex` + `rayon` |

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod band;
pub mod dense;
pub mod linalg;
pub mod perm;
pub mod traits;

pub use band::{BandMatrix, BandStorage, BandView, BandViewMut, DiagView, StorageOrder};
pub use dense::{DynMatrix, DynVector};
pub use linalg::LinalgError;
pub use perm::Permutation;
pub use traits::{FloatScalar, LinalgScalar, MatrixMut, MatrixRef, Scalar};

#[cfg(feature = "complex")]
pub use num_complex::Complex;
