//! Banded matrix storage and views.
//!
//! [`BandStorage`] maps `(row, col)` to a buffer offset for row-, column- or
//! diagonal-major layouts. [`BandView`] and [`BandViewMut`] borrow a buffer;
//! [`BandMatrix`] owns one. Every factorization in [`crate::linalg`] reads
//! its input through a [`BandView`].

mod storage;
mod view;

pub use storage::{BandStorage, StorageOrder};
pub use view::{BandMatrix, BandView, BandViewMut, DiagView};
