use bandeq::linalg::{BandQr, LinalgError};
use bandeq::{BandMatrix, DynMatrix, DynVector, StorageOrder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOL: f64 = 1e-10;

fn random_band(
    rng: &mut StdRng,
    m: usize,
    n: usize,
    lo: usize,
    hi: usize,
    order: StorageOrder,
) -> BandMatrix<f64> {
    BandMatrix::from_fn(m, n, lo, hi, order, |i, j| {
        let v: f64 = rng.gen_range(-1.0..1.0);
        if i == j {
            v + 3.0
        } else {
            v
        }
    })
}

fn orthonormality_error(q: &DynMatrix<f64>) -> f64 {
    let qtq = &q.transpose() * q;
    (&qtq - &DynMatrix::eye(q.ncols(), 0.0)).max_abs()
}

#[test]
fn q_is_orthonormal_and_reconstructs() {
    let mut rng = StdRng::seed_from_u64(1);
    for &(m, n, lo, hi) in &[(6, 6, 1, 1), (10, 6, 3, 1), (6, 10, 1, 3), (8, 8, 3, 2), (7, 7, 0, 2)] {
        let a = random_band(&mut rng, m, n, lo, hi, StorageOrder::ColMajor);
        let qr = a.qr();
        assert!(qr.check_decomposition(&a.view()), "{}x{} lo={} hi={}", m, n, lo, hi);

        let q = qr.q();
        assert!(orthonormality_error(&q) < 1e-12);
        let r = qr.r().to_dense();
        let rebuilt = &q * &r;
        let target = if qr.is_trans() {
            a.to_dense().transpose()
        } else {
            a.to_dense()
        };
        assert!((&rebuilt - &target).max_abs() < 1e-12);
    }
}

#[test]
fn r_fill_bound() {
    let mut rng = StdRng::seed_from_u64(2);
    let a = random_band(&mut rng, 12, 9, 2, 3, StorageOrder::ColMajor);
    let qr = a.qr();
    assert!(!qr.is_trans());
    assert_eq!(qr.r().nhi(), 5);
    assert_eq!(qr.qr().nlo(), 2);
    assert_eq!(qr.beta().len(), 9);
}

#[test]
fn least_squares_residual_is_orthogonal() {
    let mut rng = StdRng::seed_from_u64(3);
    let a = random_band(&mut rng, 15, 8, 4, 2, StorageOrder::DiagMajor);
    let b = DynMatrix::from_fn(15, 2, |_, _| rng.gen_range(-1.0..1.0));
    let qr = a.qr();
    let mut x = DynMatrix::zeros(8, 2, 0.0);
    qr.solve_into(&b, &mut x);

    let d = a.to_dense();
    let resid = &(&d * &x) - &b;
    let normal = &d.transpose() * &resid;
    assert!(normal.max_abs() < TOL);
}

#[test]
fn minimum_norm_right_solve() {
    // X A = B with a tall A: X has as many columns as A has rows.
    let mut rng = StdRng::seed_from_u64(4);
    let a = random_band(&mut rng, 9, 5, 2, 1, StorageOrder::ColMajor);
    let d = a.to_dense();
    let x_seed = DynMatrix::from_fn(2, 9, |_, _| rng.gen_range(-1.0..1.0));
    let b = &x_seed * &d;

    let qr = a.qr();
    let mut x = DynMatrix::zeros(2, 9, 0.0);
    qr.solve_right_into(&b, &mut x);
    assert!((&(&x * &d) - &b).max_abs() < TOL);

    // The minimum-norm solution lies in the column space of A^T, i.e.
    // x = y A^T for some y.
    let pinv = qr.inverse().unwrap();
    let x_min = &b * &pinv;
    assert!((&x - &x_min).max_abs() < TOL);
}

#[test]
fn square_solves_match_lu() {
    let mut rng = StdRng::seed_from_u64(5);
    for &(lo, hi) in &[(1, 2), (2, 1), (3, 3)] {
        let a = random_band(&mut rng, 11, 11, lo, hi, StorageOrder::ColMajor);
        let qr = a.qr();
        let lu = a.lu();
        let b = DynVector::from_vec((0..11).map(|i| (i as f64).sin()).collect());
        let x_qr = DynMatrix::from(qr.solve(&b));
        let x_lu = DynMatrix::from(lu.solve(&b));
        assert!((&x_qr - &x_lu).max_abs() < TOL);

        let mut m = DynMatrix::from_fn(3, 11, |i, j| (i + j) as f64);
        let mut m_lu = m.clone();
        qr.solve_right_in_place(&mut m);
        lu.solve_right_in_place(&mut m_lu);
        assert!((&m - &m_lu).max_abs() < TOL);
    }
}

#[test]
fn rank_deficient_is_singular() {
    // Second column is zero.
    let a = BandMatrix::from_fn(4, 4, 1, 1, StorageOrder::ColMajor, |i, j| {
        if j == 1 {
            0.0
        } else {
            (i + j + 1) as f64
        }
    });
    let qr = a.qr();
    assert!(qr.is_singular());
    assert_eq!(qr.det(), 0.0);
    assert_eq!(qr.inverse().unwrap_err(), LinalgError::Singular);
    assert_eq!(
        a.least_squares(&DynVector::from_slice(&[1.0; 4])).unwrap_err(),
        LinalgError::Singular
    );
}

#[test]
fn in_place_reuses_storage() {
    let mut rng = StdRng::seed_from_u64(6);
    let src = random_band(&mut rng, 10, 7, 2, 1, StorageOrder::ColMajor);
    let mut roomy = BandMatrix::zeros(10, 7, 2, 3, StorageOrder::ColMajor);
    for j in 0..7 {
        for i in src.view().col_range(j) {
            roomy[(i, j)] = src[(i, j)];
        }
    }
    let reused = BandQr::in_place(roomy, 1).unwrap();
    assert!(reused.check_decomposition(&src.view()));

    let b = DynVector::from_vec((0..10).map(|i| i as f64).collect());
    let x1 = DynMatrix::from(reused.solve(&b));
    let x2 = DynMatrix::from(src.qr().solve(&b));
    assert!((&x1 - &x2).max_abs() < TOL);
}

#[test]
fn in_place_orientation_follows_available_room() {
    let mut rng = StdRng::seed_from_u64(7);
    // (m, n, data nlo, data nhi, storage nhi, factored transposed)
    for &(m, n, lo, hi, room, trans) in &[(7, 7, 2, 1, 3, false), (5, 8, 3, 0, 0, true)] {
        let src = random_band(&mut rng, m, n, lo, hi, StorageOrder::ColMajor);
        let mut roomy = BandMatrix::zeros(m, n, lo, room, StorageOrder::ColMajor);
        for j in 0..n {
            for i in src.view().col_range(j) {
                roomy[(i, j)] = src[(i, j)];
            }
        }
        let reused = BandQr::in_place(roomy, hi).unwrap();
        assert_eq!(reused.is_trans(), trans);
        assert!(reused.check_decomposition(&src.view()));

        let b = DynVector::from_vec((0..m).map(|i| 1.0 + i as f64).collect());
        let x1 = DynMatrix::from(reused.solve(&b));
        let x2 = DynMatrix::from(src.qr().solve(&b));
        assert!((&x1 - &x2).max_abs() < TOL);
    }

    let tight = BandMatrix::<f64>::zeros(5, 8, 1, 2, StorageOrder::ColMajor);
    assert_eq!(
        BandQr::in_place(tight, 2).unwrap_err(),
        LinalgError::BandwidthMismatch { expected: 3, got: 1 }
    );
}
