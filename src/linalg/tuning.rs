/// Parallelism strategy for the triangular-solve kernels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parallelism {
    /// Run on the calling thread.
    None,
    /// Split right-hand-side columns across the active rayon pool.
    ///
    /// The value is a hint for the number of threads; `0` means
    /// `rayon::current_num_threads()`.
    #[cfg(feature = "rayon")]
    Rayon(usize),
}

/// Kernel dispatch thresholds held by each factorization.
///
/// ```
/// use bandeq::linalg::{Parallelism, Tuning};
///
/// let t = Tuning::default().with_recursion_threshold(64);
/// assert_eq!(t.recursion_threshold, 64);
/// assert_eq!(t.parallelism, Parallelism::None);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tuning {
    /// Triangles up to this size are inverted explicitly (at most 4).
    pub small: usize,
    /// Triangles up to this size use a plain substitution loop; larger
    /// ones are split recursively.
    pub recursion_threshold: usize,
    /// Minimum `n * n * ncols` before right-hand-side columns are split
    /// across threads.
    pub par_min_work: usize,
    /// Column splits are rounded to a multiple of this.
    pub par_block: usize,
    pub parallelism: Parallelism,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            small: 4,
            recursion_threshold: 32,
            par_min_work: 1 << 18,
            par_block: 16,
            parallelism: Parallelism::None,
        }
    }
}

impl Tuning {
    pub fn with_small(mut self, small: usize) -> Self {
        assert!(small <= 4, "explicit small-triangle inverse supports at most 4x4");
        self.small = small;
        self
    }

    pub fn with_recursion_threshold(mut self, n: usize) -> Self {
        self.recursion_threshold = n.max(1);
        self
    }

    pub fn with_par_min_work(mut self, work: usize) -> Self {
        self.par_min_work = work;
        self
    }

    pub fn with_par_block(mut self, block: usize) -> Self {
        self.par_block = block.max(1);
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }
}

/// Run both operations, possibly in parallel, splitting the thread hint
/// between them.
#[inline]
pub(crate) fn join_raw(
    op_a: impl Send + FnOnce(Parallelism),
    op_b: impl Send + FnOnce(Parallelism),
    parallelism: Parallelism,
) {
    match parallelism {
        Parallelism::None => {
            op_a(parallelism);
            op_b(parallelism);
        }
        #[cfg(feature = "rayon")]
        Parallelism::Rayon(n_threads) => {
            if n_threads == 1 {
                op_a(Parallelism::None);
                op_b(Parallelism::None);
            } else {
                let n_threads = if n_threads > 0 {
                    n_threads
                } else {
                    rayon::current_num_threads()
                };
                let parallelism = Parallelism::Rayon(n_threads - n_threads / 2);
                rayon::join(|| op_a(parallelism), || op_b(parallelism));
            }
        }
    }
}

/// Size of the leading block when splitting a triangle of size `n`, chosen
/// so the trailing block is a multiple of a register-friendly width.
#[inline]
pub(crate) fn blocksize(n: usize) -> usize {
    let base_rem = n / 2;
    n - if n >= 32 {
        (base_rem + 15) / 16 * 16
    } else if n >= 16 {
        (base_rem + 7) / 8 * 8
    } else if n >= 8 {
        (base_rem + 3) / 4 * 4
    } else {
        base_rem
    }
}
