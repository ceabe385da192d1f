use bandeq::linalg::{BandLu, LinalgError, Tuning};
use bandeq::{BandMatrix, DynMatrix, DynVector, StorageOrder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOL: f64 = 1e-10;

fn random_band(
    rng: &mut StdRng,
    n: usize,
    lo: usize,
    hi: usize,
    order: StorageOrder,
) -> BandMatrix<f64> {
    BandMatrix::from_fn(n, n, lo, hi, order, |i, j| {
        let v: f64 = rng.gen_range(-1.0..1.0);
        if i == j {
            v + 3.0
        } else {
            v
        }
    })
}

fn assert_solves(a: &BandMatrix<f64>, lu: &BandLu<f64>, rng: &mut StdRng) {
    let n = a.nrows();
    let x_true = DynMatrix::from_fn(n, 3, |_, _| rng.gen_range(-1.0..1.0));
    let mut b = a.view().mul_dense(&x_true);
    lu.solve_in_place(&mut b);
    assert!(
        (&b - &x_true).max_abs() < TOL,
        "solve error {} for n={} lo={} hi={}",
        (&b - &x_true).max_abs(),
        n,
        a.nlo(),
        a.nhi()
    );
}

/// Reference tridiagonal solver.
fn thomas(sub: &[f64], diag: &[f64], sup: &[f64], d: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut cp = vec![0.0; n];
    let mut dp = vec![0.0; n];
    cp[0] = sup[0] / diag[0];
    dp[0] = d[0] / diag[0];
    for i in 1..n {
        let m = diag[i] - sub[i - 1] * cp[i - 1];
        if i < n - 1 {
            cp[i] = sup[i] / m;
        }
        dp[i] = (d[i] - sub[i - 1] * dp[i - 1]) / m;
    }
    let mut x = vec![0.0; n];
    x[n - 1] = dp[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = dp[i] - cp[i] * x[i + 1];
    }
    x
}

#[test]
fn tridiagonal_matches_thomas() {
    let a = BandMatrix::from_fn(5, 5, 1, 1, StorageOrder::DiagMajor, |i, j| {
        if i == j {
            4.0
        } else {
            1.0
        }
    });
    let d = [1.0, 2.0, 3.0, 4.0, 5.0];
    let expected = thomas(&[1.0; 4], &[4.0; 5], &[1.0; 4], &d);

    let lu = a.lu();
    assert!(lu.permutation().is_identity());
    let x = lu.solve(&DynVector::from_slice(&d));
    for i in 0..5 {
        assert!(
            (x[i] - expected[i]).abs() < TOL,
            "x[{}] = {} vs {}",
            i,
            x[i],
            expected[i]
        );
    }
}

#[test]
fn fill_in_bound_and_reconstruction() {
    let mut rng = StdRng::seed_from_u64(7);
    for &(n, lo, hi) in &[(1, 0, 0), (6, 1, 1), (9, 2, 3), (9, 3, 2), (12, 4, 0), (12, 0, 4), (5, 4, 4)] {
        for &order in &[StorageOrder::ColMajor, StorageOrder::RowMajor, StorageOrder::DiagMajor] {
            let a = random_band(&mut rng, n, lo, hi, order);
            let lu = a.lu();
            let packed = lu.lu();
            assert_eq!(packed.nlo(), lo.min(hi));
            assert_eq!(packed.nhi(), (lo + hi).min(n - 1));
            assert!(lu.check_decomposition(&a.view()), "n={} lo={} hi={}", n, lo, hi);
            assert_solves(&a, &lu, &mut rng);
        }
    }
}

#[test]
fn upper_triangular_needs_no_interchanges() {
    let mut rng = StdRng::seed_from_u64(11);
    let a = random_band(&mut rng, 8, 0, 3, StorageOrder::ColMajor);
    let lu = a.lu();
    assert!(lu.permutation().is_identity());
    assert_eq!(lu.l(), DynMatrix::eye(8, 0.0));
    let mut det = 1.0;
    for i in 0..8 {
        det *= a[(i, i)];
    }
    assert!((lu.det() - det).abs() < TOL * det.abs());
}

#[test]
fn diagonal_matrix() {
    let a = BandMatrix::from_fn(4, 4, 0, 0, StorageOrder::ColMajor, |i, _| (i + 1) as f64);
    let lu = a.lu();
    assert!((lu.det() - 24.0).abs() < 1e-12);
    let x = lu.solve(&DynVector::from_slice(&[1.0, 1.0, 1.0, 1.0]));
    for i in 0..4 {
        assert!((x[i] - 1.0 / (i + 1) as f64).abs() < 1e-15);
    }
    let inv = lu.inverse().unwrap();
    assert!((inv[(3, 3)] - 0.25).abs() < 1e-15);
    assert_eq!(inv[(0, 3)], 0.0);
}

#[test]
fn repeated_solves_are_identical() {
    let mut rng = StdRng::seed_from_u64(3);
    let a = random_band(&mut rng, 20, 3, 2, StorageOrder::ColMajor);
    let lu = a.lu();
    let b = DynVector::from_vec((0..20).map(|i| i as f64).collect());
    let x1 = lu.solve(&b);
    let x2 = lu.solve(&b);
    assert_eq!(x1, x2);

    let mut into = DynMatrix::zeros(20, 1, 0.0);
    lu.solve_into(&DynMatrix::from(&b), &mut into);
    assert_eq!(into.as_slice(), x1.as_slice());
}

#[test]
fn transposed_and_conjugated_views() {
    let mut rng = StdRng::seed_from_u64(5);
    let a = random_band(&mut rng, 10, 2, 1, StorageOrder::ColMajor);
    let at = a.view().transpose();
    let lu_t = at.lu();
    let x_true = DynMatrix::from_fn(10, 2, |i, j| (i as f64) * 0.1 - j as f64);
    let mut b = at.mul_dense(&x_true);
    lu_t.solve_in_place(&mut b);
    assert!((&b - &x_true).max_abs() < TOL);

    // Conjugation is the identity on reals.
    let lu_c = a.view().conjugate().lu();
    assert!((lu_c.det() - a.det()).abs() < TOL * a.det().abs().max(1.0));
}

#[test]
fn right_solve_matches_dense() {
    let mut rng = StdRng::seed_from_u64(9);
    for &(lo, hi) in &[(1, 3), (3, 1), (2, 2)] {
        let a = random_band(&mut rng, 12, lo, hi, StorageOrder::ColMajor);
        let lu = a.lu();
        let x_true = DynMatrix::from_fn(4, 12, |_, _| rng.gen_range(-1.0..1.0));
        let mut b = &x_true * &a.to_dense();
        lu.solve_right_in_place(&mut b);
        assert!((&b - &x_true).max_abs() < TOL);
    }
}

#[test]
fn determinant_agrees_with_qr() {
    let mut rng = StdRng::seed_from_u64(21);
    for &(n, lo, hi) in &[(5, 1, 1), (9, 2, 3), (9, 3, 2), (15, 4, 1)] {
        let a = random_band(&mut rng, n, lo, hi, StorageOrder::ColMajor);
        let d_lu = a.lu().det();
        let d_qr = a.qr().det();
        assert!(
            (d_lu - d_qr).abs() < TOL * (1.0 + d_lu.abs()),
            "lu {} vs qr {}",
            d_lu,
            d_qr
        );
        let (ln_lu, s_lu) = a.lu().log_det();
        let (ln_qr, s_qr) = a.qr().log_det();
        assert!((ln_lu - ln_qr).abs() < TOL);
        assert_eq!(s_lu, s_qr);
    }
}

#[test]
fn in_place_matches_copy() {
    let mut rng = StdRng::seed_from_u64(13);
    let src = random_band(&mut rng, 10, 2, 2, StorageOrder::ColMajor);
    // Same data in storage with room for two extra super-diagonals.
    let mut roomy = BandMatrix::zeros(10, 10, 2, 4, StorageOrder::ColMajor);
    for j in 0..10 {
        for i in src.view().col_range(j) {
            roomy[(i, j)] = src[(i, j)];
        }
    }
    let copy = src.lu();
    let reused = BandLu::in_place(roomy, 2).unwrap();
    assert!(!reused.is_trans());
    assert!((copy.det() - reused.det()).abs() < TOL * copy.det().abs());
    let b = DynVector::from_slice(&[1.0; 10]);
    assert!((&DynMatrix::from(copy.solve(&b)) - &DynMatrix::from(reused.solve(&b))).max_abs() < TOL);
}

/// Copy `src` into storage with `lo` sub- and `hi` super-diagonals.
fn restore(src: &BandMatrix<f64>, lo: usize, hi: usize, order: StorageOrder) -> BandMatrix<f64> {
    let n = src.nrows();
    let mut out = BandMatrix::zeros(n, n, lo, hi, order);
    for j in 0..n {
        for i in src.view().col_range(j) {
            out[(i, j)] = src[(i, j)];
        }
    }
    out
}

#[test]
fn in_place_uses_whichever_orientation_fits() {
    let mut rng = StdRng::seed_from_u64(14);
    // (n, data nlo, data nhi, storage nhi, order, factored transposed)
    let cases = [
        (6, 1, 1, 2, StorageOrder::RowMajor, false),
        (8, 2, 1, 3, StorageOrder::ColMajor, false),
        (8, 3, 1, 4, StorageOrder::DiagMajor, false),
        (8, 2, 0, 0, StorageOrder::ColMajor, true),
        (2, 1, 1, 1, StorageOrder::RowMajor, true),
    ];
    for &(n, lo, hi, room, order, trans) in &cases {
        let src = random_band(&mut rng, n, lo, hi, order);
        let copy = src.lu();
        let reused = BandLu::in_place(restore(&src, lo, room, order), hi).unwrap();
        assert_eq!(reused.is_trans(), trans, "lo={} hi={} room={}", lo, hi, room);
        assert!(reused.check_decomposition(&src.view()));
        assert!((copy.det() - reused.det()).abs() < TOL * (1.0 + copy.det().abs()));
        assert_solves(&src, &reused, &mut rng);
    }
}

#[test]
fn in_place_without_room_either_way() {
    let a = BandMatrix::<f64>::zeros(6, 6, 2, 1, StorageOrder::RowMajor);
    assert_eq!(
        BandLu::in_place(a, 1).unwrap_err(),
        LinalgError::BandwidthMismatch { expected: 3, got: 2 }
    );
}

#[test]
fn inverse_products() {
    let mut rng = StdRng::seed_from_u64(17);
    let a = random_band(&mut rng, 8, 1, 2, StorageOrder::DiagMajor);
    let lu = a.lu();
    let d = a.to_dense();
    let id = DynMatrix::eye(8, 0.0);
    assert!((&(&d * &lu.inverse().unwrap()) - &id).max_abs() < TOL);

    let mut out = DynMatrix::zeros(8, 8, 0.0);
    lu.inverse_ata_into(&mut out).unwrap();
    assert!((&(&(&d.transpose() * &d) * &out) - &id).max_abs() < 1e-8);
    lu.inverse_aat_into(&mut out).unwrap();
    assert!((&(&(&d * &d.transpose()) * &out) - &id).max_abs() < 1e-8);
}

#[test]
fn tuning_does_not_change_results() {
    let mut rng = StdRng::seed_from_u64(23);
    let a = random_band(&mut rng, 150, 3, 4, StorageOrder::ColMajor);
    let b = DynMatrix::from_fn(150, 5, |_, _| rng.gen_range(-1.0..1.0));
    let mut reference = b.clone();
    a.lu().solve_in_place(&mut reference);

    let tunings = [
        Tuning::default().with_small(0).with_recursion_threshold(1),
        Tuning::default().with_recursion_threshold(1000),
        Tuning::default().with_small(2).with_recursion_threshold(8),
    ];
    for tuning in tunings {
        let mut x = b.clone();
        a.lu().with_tuning(tuning).solve_in_place(&mut x);
        assert!((&x - &reference).max_abs() < 1e-9);
    }
}

#[cfg(feature = "rayon")]
#[test]
fn parallel_solve_matches_sequential() {
    use bandeq::linalg::Parallelism;

    let mut rng = StdRng::seed_from_u64(29);
    let a = random_band(&mut rng, 200, 2, 2, StorageOrder::ColMajor);
    let b = DynMatrix::from_fn(200, 64, |_, _| rng.gen_range(-1.0..1.0));
    let lu = a.lu();

    let mut seq = b.clone();
    lu.solve_in_place(&mut seq);

    let tuning = Tuning::default()
        .with_par_min_work(0)
        .with_parallelism(Parallelism::Rayon(0));
    let mut par = b.clone();
    lu.clone().with_tuning(tuning).solve_in_place(&mut par);
    assert_eq!(seq, par);
}
