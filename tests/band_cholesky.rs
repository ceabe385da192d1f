use bandeq::linalg::LinalgError;
use bandeq::{BandMatrix, DynMatrix, DynVector, StorageOrder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOL: f64 = 1e-10;

/// `B B^T` for a random lower-banded `B`, which has `lo` sub- and
/// super-diagonals.
fn random_spd(rng: &mut StdRng, n: usize, lo: usize) -> BandMatrix<f64> {
    let b = BandMatrix::from_fn(n, n, lo, 0, StorageOrder::ColMajor, |i, j| {
        let v: f64 = rng.gen_range(-1.0..1.0);
        if i == j {
            v.abs() + lo as f64 + 1.0
        } else {
            v
        }
    })
    .to_dense();
    let a = &b * &b.transpose();
    BandMatrix::from_dense(&a, lo, lo, StorageOrder::ColMajor)
}

#[test]
fn reconstructs_random_spd() {
    let mut rng = StdRng::seed_from_u64(31);
    for &(n, lo) in &[(1, 0), (5, 1), (12, 3), (20, 6)] {
        let a = random_spd(&mut rng, n, lo);
        let chol = a.cholesky().unwrap();
        assert!(chol.check_decomposition(&a.view()), "n={} lo={}", n, lo);
        let l = chol.l().to_dense();
        assert!((&(&l * &l.transpose()) - &a.to_dense()).max_abs() < TOL);
    }
}

#[test]
fn lower_only_storage() {
    let mut rng = StdRng::seed_from_u64(32);
    let full = random_spd(&mut rng, 9, 2);
    let lower = full.view().lower_band();
    assert_eq!(lower.nhi(), 0);
    let c_full = full.cholesky().unwrap();
    let c_lower = lower.cholesky().unwrap();
    assert_eq!(c_full.l().to_dense(), c_lower.l().to_dense());
}

#[test]
fn solve_and_determinant_match_lu() {
    let mut rng = StdRng::seed_from_u64(33);
    let a = random_spd(&mut rng, 16, 3);
    let chol = a.cholesky().unwrap();
    let lu = a.lu();

    let b = DynVector::from_vec((0..16).map(|i| 1.0 / (1.0 + i as f64)).collect());
    let x_c = DynMatrix::from(chol.solve(&b));
    let x_l = DynMatrix::from(lu.solve(&b));
    assert!((&x_c - &x_l).max_abs() < 1e-8);

    assert!((chol.ln_det() - lu.log_det().0).abs() < 1e-9);

    let mut inv = DynMatrix::zeros(16, 16, 0.0);
    chol.inverse_into(&mut inv);
    assert!((&(&a.to_dense() * &inv) - &DynMatrix::eye(16, 0.0)).max_abs() < 1e-8);
}

#[test]
fn indefinite_is_rejected() {
    let a = BandMatrix::from_fn(4, 4, 1, 1, StorageOrder::DiagMajor, |i, j| {
        if i == j {
            if i == 2 {
                -1.0
            } else {
                2.0
            }
        } else {
            0.5
        }
    });
    assert_eq!(a.cholesky().unwrap_err(), LinalgError::NotPositiveDefinite);
}
