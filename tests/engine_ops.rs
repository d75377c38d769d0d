//! End-to-end operation tests: multiply methods, semirings, masks,
//! scaling, and reductions

use sparr::algebra::boolean;
use sparr::prelude::*;

// Small deterministic generator for sparse test data.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

fn random_matrix_i64(ctx: &Context, nrows: usize, ncols: usize, nnz: usize, seed: u64) -> SparseMatrix<i64> {
    let mut rng = Lcg(seed);
    let mut rows = Vec::with_capacity(nnz);
    let mut cols = Vec::with_capacity(nnz);
    let mut vals = Vec::with_capacity(nnz);
    for _ in 0..nnz {
        rows.push(rng.next() as usize % nrows);
        cols.push(rng.next() as usize % ncols);
        vals.push((rng.next() % 19) as i64 - 9);
    }
    SparseMatrix::from_tuples(ctx, nrows, ncols, &rows, &cols, &vals, &BinaryOp::plus()).unwrap()
}

const ALL_METHODS: [Method; 5] = [
    Method::Gustavson,
    Method::Hash,
    Method::Heap,
    Method::Dot,
    Method::Saxpy,
];

#[test]
fn all_methods_agree_exactly_for_integers() {
    let ctx = Context::new();
    let a = random_matrix_i64(&ctx, 17, 23, 60, 1);
    let b = random_matrix_i64(&ctx, 23, 19, 70, 2);
    let reference = {
        let c = SparseMatrix::<i64>::new(&ctx, 17, 19);
        mxm(&c, None, None, &Semiring::plus_times(), &a, &b, &Descriptor::default()).unwrap();
        c.extract_tuples().unwrap()
    };
    assert!(!reference.0.is_empty());
    for method in ALL_METHODS {
        let c = SparseMatrix::<i64>::new(&ctx, 17, 19);
        let desc = Descriptor { method, ..Descriptor::default() };
        let ran = mxm(&c, None, None, &Semiring::plus_times(), &a, &b, &desc).unwrap();
        assert_eq!(ran, method);
        assert_eq!(c.extract_tuples().unwrap(), reference, "{method:?}");
    }
}

#[test]
fn all_methods_agree_within_tolerance_for_floats() {
    let ctx = Context::new();
    let a_int = random_matrix_i64(&ctx, 11, 13, 40, 7);
    let b_int = random_matrix_i64(&ctx, 13, 9, 40, 8);
    let a: SparseMatrix<f64> = a_int.cast().unwrap();
    let b: SparseMatrix<f64> = b_int.cast().unwrap();
    let mut patterns = Vec::new();
    let mut values = Vec::new();
    for method in ALL_METHODS {
        let c = SparseMatrix::<f64>::new(&ctx, 11, 9);
        let desc = Descriptor { method, ..Descriptor::default() };
        mxm(&c, None, None, &Semiring::plus_times(), &a, &b, &desc).unwrap();
        let (rows, cols, vals) = c.extract_tuples().unwrap();
        patterns.push((rows, cols));
        values.push(vals);
    }
    for k in 1..ALL_METHODS.len() {
        assert_eq!(patterns[k], patterns[0], "{:?}", ALL_METHODS[k]);
        for (x, y) in values[k].iter().zip(&values[0]) {
            assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0));
        }
    }
}

#[test]
fn all_methods_agree_under_min_plus() {
    let ctx = Context::new();
    let a = random_matrix_i64(&ctx, 12, 12, 30, 11);
    let reference = {
        let c = SparseMatrix::<i64>::new(&ctx, 12, 12);
        mxm(&c, None, None, &Semiring::min_plus(), &a, &a, &Descriptor::default()).unwrap();
        c.extract_tuples().unwrap()
    };
    for method in ALL_METHODS {
        let c = SparseMatrix::<i64>::new(&ctx, 12, 12);
        let desc = Descriptor { method, ..Descriptor::default() };
        mxm(&c, None, None, &Semiring::min_plus(), &a, &a, &desc).unwrap();
        assert_eq!(c.extract_tuples().unwrap(), reference, "{method:?}");
    }
}

#[test]
fn boolean_cycle_times_ones_is_all_ones() {
    // scenario: C3 cycle adjacency over the (||, &&) boolean semiring;
    // every node reaches exactly one neighbor, so A*x = ones
    let ctx = Context::new();
    let a = SparseMatrix::pattern_from_tuples(&ctx, 3, 3, &[0, 1, 2], &[1, 2, 0], true).unwrap();
    let x = SparseVector::from_dense(&ctx, &[true, true, true]);
    let y = SparseVector::<bool>::new(&ctx, 3);
    mxv(&y, None, None, &boolean::lor_land(), &a, &x, &Descriptor::default()).unwrap();
    assert_eq!(y.nvals().unwrap(), 3);
    for i in 0..3 {
        assert_eq!(y.extract_element(i).unwrap(), Some(true));
    }
}

#[test]
fn row_reduction_of_cycle_matrix_is_all_ones() {
    let ctx = Context::new();
    let a = SparseMatrix::from_tuples(
        &ctx,
        3,
        3,
        &[0, 1, 2],
        &[1, 2, 0],
        &[1.0, 1.0, 1.0],
        &BinaryOp::plus(),
    )
    .unwrap();
    let v = reduce_rows(&Monoid::plus(), &a).unwrap();
    assert_eq!(v.to_dense().unwrap(), vec![1.0, 1.0, 1.0]);
}

#[test]
fn row_scaling_by_diagonal() {
    let ctx = Context::new();
    let a = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    let d = SparseVector::from_dense(&ctx, &[10.0, 100.0]);
    let c = scale_rows(&d, &a, &BinaryOp::times()).unwrap();
    assert_eq!(c.to_dense().unwrap(), vec![10.0, 20.0, 300.0, 400.0]);
}

#[test]
fn specialized_and_generic_paths_match_everywhere() {
    let ctx = Context::new();
    let a = random_matrix_i64(&ctx, 10, 10, 35, 21);
    let b = random_matrix_i64(&ctx, 10, 10, 35, 22);

    let product_fast = {
        let c = SparseMatrix::<i64>::new(&ctx, 10, 10);
        mxm(&c, None, None, &Semiring::plus_times(), &a, &b, &Descriptor::default()).unwrap();
        c.extract_tuples().unwrap()
    };
    let applied_fast = {
        let c = SparseMatrix::<i64>::new(&ctx, 10, 10);
        apply(&c, None, None, &UnaryOp::abs(), &a).unwrap();
        c.extract_tuples().unwrap()
    };
    let reduced_fast = reduce_scalar(&Monoid::plus(), &a).unwrap();

    ctx.set_kernel_specialization(false);
    let product_slow = {
        let c = SparseMatrix::<i64>::new(&ctx, 10, 10);
        mxm(&c, None, None, &Semiring::plus_times(), &a, &b, &Descriptor::default()).unwrap();
        c.extract_tuples().unwrap()
    };
    let applied_slow = {
        let c = SparseMatrix::<i64>::new(&ctx, 10, 10);
        apply(&c, None, None, &UnaryOp::abs(), &a).unwrap();
        c.extract_tuples().unwrap()
    };
    let reduced_slow = reduce_scalar(&Monoid::plus(), &a).unwrap();
    ctx.set_kernel_specialization(true);

    assert_eq!(product_fast, product_slow);
    assert_eq!(applied_fast, applied_slow);
    assert_eq!(reduced_fast, reduced_slow);
}

#[test]
fn masked_multiply_agrees_across_methods() {
    let ctx = Context::new();
    let a = random_matrix_i64(&ctx, 14, 14, 50, 31);
    let b = random_matrix_i64(&ctx, 14, 14, 50, 32);
    let mask = SparseMatrix::pattern_from_tuples(
        &ctx,
        14,
        14,
        &[0, 3, 3, 7, 12],
        &[1, 2, 9, 7, 0],
        1i64,
    )
    .unwrap();
    let mut outputs = Vec::new();
    for method in ALL_METHODS {
        let c = SparseMatrix::<i64>::new(&ctx, 14, 14);
        let desc = Descriptor { method, ..Descriptor::default() };
        mxm(&c, Some(&mask), None, &Semiring::plus_times(), &a, &b, &desc).unwrap();
        outputs.push(c.extract_tuples().unwrap());
    }
    for k in 1..outputs.len() {
        assert_eq!(outputs[k], outputs[0], "{:?}", ALL_METHODS[k]);
    }
    // every produced entry sits inside the mask
    let (rows, cols, _) = &outputs[0];
    for (&i, &j) in rows.iter().zip(cols) {
        assert_eq!(mask.extract_element(i, j).unwrap(), Some(1));
    }
}

#[test]
fn transpose_descriptor_matches_explicit_transpose() {
    let ctx = Context::new();
    let a = random_matrix_i64(&ctx, 9, 12, 30, 41);
    let b = random_matrix_i64(&ctx, 9, 10, 30, 42);
    let c_desc = SparseMatrix::<i64>::new(&ctx, 12, 10);
    let desc = Descriptor { transpose_a: true, ..Descriptor::default() };
    mxm(&c_desc, None, None, &Semiring::plus_times(), &a, &b, &desc).unwrap();

    let at = transpose(&a, None).unwrap();
    let c_explicit = SparseMatrix::<i64>::new(&ctx, 12, 10);
    mxm(&c_explicit, None, None, &Semiring::plus_times(), &at, &b, &Descriptor::default()).unwrap();
    assert_eq!(
        c_desc.extract_tuples().unwrap(),
        c_explicit.extract_tuples().unwrap()
    );
}

#[test]
fn accumulator_folds_repeated_products() {
    let ctx = Context::new();
    let a = SparseMatrix::from_dense(&ctx, 2, 2, &[1i64, 0, 0, 1]).unwrap();
    let b = SparseMatrix::from_dense(&ctx, 2, 2, &[2i64, 3, 4, 5]).unwrap();
    let c = SparseMatrix::<i64>::new(&ctx, 2, 2);
    for _ in 0..3 {
        mxm(
            &c,
            None,
            Some(&BinaryOp::plus()),
            &Semiring::plus_times(),
            &a,
            &b,
            &Descriptor::default(),
        )
        .unwrap();
    }
    // identity * B accumulated three times
    assert_eq!(c.to_dense().unwrap(), vec![6, 9, 12, 15]);
}

#[test]
fn domain_mismatch_rejected_before_any_work() {
    let ctx = Context::new();
    let a = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, 0.0, 0.0, 1.0]).unwrap();
    let c = SparseMatrix::from_dense(&ctx, 2, 2, &[9.0, 9.0, 9.0, 9.0]).unwrap();
    let r = mxm(
        &c,
        None,
        None,
        &Semiring::<f64>::lor_land(),
        &a,
        &a,
        &Descriptor::default(),
    );
    assert!(matches!(r, Err(Error::DomainMismatch { .. })));
    // destination untouched
    assert_eq!(c.to_dense().unwrap(), vec![9.0, 9.0, 9.0, 9.0]);
}

#[test]
fn hypersparse_operands_multiply_correctly() {
    let ctx = Context::new();
    // 2 entries in a 10000-line space forces hypersparse storage
    let a = SparseMatrix::from_tuples(
        &ctx,
        10_000,
        10_000,
        &[5, 9_000],
        &[9_000, 42],
        &[2i64, 3],
        &BinaryOp::plus(),
    )
    .unwrap();
    for method in ALL_METHODS {
        let c = SparseMatrix::<i64>::new(&ctx, 10_000, 10_000);
        let desc = Descriptor { method, ..Descriptor::default() };
        mxm(&c, None, None, &Semiring::plus_times(), &a, &a, &desc).unwrap();
        assert_eq!(c.nvals().unwrap(), 1, "{method:?}");
        assert_eq!(c.extract_element(5, 42).unwrap(), Some(6), "{method:?}");
    }
}

#[test]
fn auto_heuristic_is_deterministic() {
    let ctx = Context::new();
    let a = random_matrix_i64(&ctx, 20, 20, 80, 51);
    let first = {
        let c = SparseMatrix::<i64>::new(&ctx, 20, 20);
        mxm(&c, None, None, &Semiring::plus_times(), &a, &a, &Descriptor::default()).unwrap()
    };
    for _ in 0..3 {
        let c = SparseMatrix::<i64>::new(&ctx, 20, 20);
        let ran =
            mxm(&c, None, None, &Semiring::plus_times(), &a, &a, &Descriptor::default()).unwrap();
        assert_eq!(ran, first);
    }
    assert_ne!(first, Method::Auto);
}
