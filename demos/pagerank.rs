//! PageRank over a user-defined element type
//!
//! Demonstrates the fully generic path: a custom `Copy` element carrying
//! each page's rank and inverse outdegree, custom operators composed into
//! a monoid and a semiring at runtime, and the iteration driven through
//! `mxv` until the ranks stop moving. None of the built-in kernels apply;
//! everything runs through boxed callables.

use sparr::prelude::*;

const DAMPING: f64 = 0.85;
const TOLERANCE: f64 = 1e-10;
const MAX_ITERS: usize = 100;

/// Rank plus inverse outdegree, the working element of the iteration
#[derive(Debug, Clone, Copy, PartialEq)]
struct Page {
    rank: f64,
    inv_degree: f64,
}

impl Scalar for Page {
    const CODE: TypeCode = TypeCode::Custom;
}

fn main() -> Result<()> {
    // a small directed web: edge (src, dst) means src links to dst;
    // node 6 is dangling, node 7 has no inbound links
    let edges: &[(usize, usize)] = &[
        (0, 1),
        (0, 2),
        (1, 3),
        (2, 1),
        (2, 3),
        (3, 0),
        (3, 4),
        (4, 5),
        (5, 3),
        (5, 6),
        (7, 0),
        (7, 3),
    ];
    let n = 8;

    let ctx = Context::new();
    ctx.set_mode(Mode::NonBlocking);

    let mut out_degree = vec![0usize; n];
    for &(src, _) in edges {
        out_degree[src] += 1;
    }
    let dangling: Vec<usize> = (0..n).filter(|&i| out_degree[i] == 0).collect();

    // the adjacency structure: entries are structural only, the multiply
    // reads nothing but the vector operand
    let srcs: Vec<usize> = edges.iter().map(|e| e.0).collect();
    let dsts: Vec<usize> = edges.iter().map(|e| e.1).collect();
    let links = SparseMatrix::pattern_from_tuples(
        &ctx,
        n,
        n,
        &srcs,
        &dsts,
        Page {
            rank: 1.0,
            inv_degree: 0.0,
        },
    )?;

    // z = sum of incoming (rank * 1/outdegree) contributions
    let add = Monoid::new(
        BinaryOp::custom(|x: Page, y: Page| Page {
            rank: x.rank + y.rank,
            inv_degree: 0.0,
        }),
        Page {
            rank: 0.0,
            inv_degree: 0.0,
        },
    );
    let multiply = BinaryOp::custom(|_link: Page, page: Page| Page {
        rank: page.rank * page.inv_degree,
        inv_degree: 0.0,
    });
    let import = Semiring::new(add, multiply);

    let make_rank_vector = |ranks: &[f64]| -> SparseVector<Page> {
        let pages: Vec<Page> = ranks
            .iter()
            .enumerate()
            .map(|(i, &rank)| Page {
                rank,
                inv_degree: if out_degree[i] > 0 {
                    1.0 / out_degree[i] as f64
                } else {
                    0.0
                },
            })
            .collect();
        SparseVector::from_dense(&ctx, &pages)
    };

    let teleport = (1.0 - DAMPING) / n as f64;
    let mut ranks = vec![1.0 / n as f64; n];
    let desc = Descriptor {
        transpose_a: true,
        ..Descriptor::default()
    };

    for iteration in 0..MAX_ITERS {
        let r = make_rank_vector(&ranks);
        let incoming = SparseVector::<Page>::new(&ctx, n);
        mxv(&incoming, None, None, &import, &links, &r, &desc)?;

        // dangling pages spread their rank over every page
        let lost: f64 = dangling.iter().map(|&i| ranks[i]).sum();
        let dense = incoming.to_dense_with(Page {
            rank: 0.0,
            inv_degree: 0.0,
        })?;
        let next: Vec<f64> = dense
            .iter()
            .map(|p| teleport + DAMPING * (p.rank + lost / n as f64))
            .collect();

        let moved: Vec<f64> = next
            .iter()
            .zip(&ranks)
            .map(|(a, b)| (a - b).abs())
            .collect();
        let delta = reduce_vector(&Monoid::plus(), &SparseVector::from_dense(&ctx, &moved))?;
        ranks = next;
        if delta < TOLERANCE {
            println!("converged after {} iterations", iteration + 1);
            break;
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| ranks[b].total_cmp(&ranks[a]));
    println!("page     rank");
    for &i in &order {
        println!("{i:>4}  {:.6}", ranks[i]);
    }
    let total: f64 = ranks.iter().sum();
    println!("total rank: {total:.6}");
    Ok(())
}
