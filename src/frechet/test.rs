use crate::config::QueryConfig;
use crate::error::PathError;
use crate::frechet::*;
use crate::index::QueryContext;
use crate::test_utils::{degrees, edge, grid, vertex, walk};

use approx::assert_relative_eq;
use geo::Point;

fn metres(points: &[(f64, f64)]) -> Vec<Point> {
    points
        .iter()
        .map(|(x, y)| Point::new(degrees(*x), degrees(*y)))
        .collect()
}

#[test]
fn identical_sequences_coincide() {
    let p = metres(&[(0.0, 0.0), (10.0, 5.0), (20.0, 0.0), (35.0, -5.0)]);
    assert_eq!(discrete_frechet(&p, &p), Ok(0.0));
}

#[test]
fn parallel_offset() {
    let p = metres(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
    let q = metres(&[(0.0, 7.0), (10.0, 7.0), (20.0, 7.0)]);

    let distance = discrete_frechet(&p, &q).expect("sequences are not empty");
    assert_relative_eq!(distance, 7.0, epsilon = 1e-6);
}

#[test]
fn couples_uneven_sequences() {
    // A single point is coupled with every point of the other sequence.
    let p = metres(&[(0.0, 0.0)]);
    let q = metres(&[(3.0, 0.0), (0.0, 4.0), (-2.0, 0.0)]);

    let distance = discrete_frechet(&p, &q).expect("sequences are not empty");
    assert_relative_eq!(distance, 4.0, epsilon = 1e-6);

    // Going back and forth costs the furthest excursion, not the sum.
    let p = metres(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0)]);
    let q = metres(&[(0.0, 0.0), (20.0, 0.0), (10.0, 0.0), (30.0, 0.0)]);
    let distance = discrete_frechet(&p, &q).expect("sequences are not empty");
    assert_relative_eq!(distance, 10.0, epsilon = 1e-6);
}

#[test]
fn rejects_empty_sequences() {
    let p = metres(&[(0.0, 0.0)]);

    assert_eq!(discrete_frechet(&[], &p), Err(PathError::EmptyTrajectory));
    assert_eq!(discrete_frechet(&p, &[]), Err(PathError::EmptyTrajectory));
}

#[test]
fn sweep_reports_every_prefix() {
    let p = metres(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
    let q = metres(&[(0.0, 1.0), (10.0, 2.0), (20.0, 3.0), (30.0, 4.0)]);

    let mut sweep = FrechetSweep::new(&p).expect("rows are not empty");
    for j in 0..q.len() {
        let swept = sweep.advance_to(&q, j);
        let direct = discrete_frechet(&p, &q[..=j]).expect("sequences are not empty");
        assert_eq!(swept, direct);
        assert_eq!(sweep.columns(), j + 1);
    }

    // The sweep does not move backwards.
    assert_eq!(sweep.advance_to(&q, 0), sweep.value());
}

#[test]
fn long_sequences_do_not_recurse() {
    let p = (0..3000)
        .map(|i| Point::new(degrees(i as f64), 0.0))
        .collect::<Vec<_>>();
    let q = (0..2500)
        .map(|i| Point::new(degrees(i as f64 * 1.2), degrees(1.0)))
        .collect::<Vec<_>>();

    let distance = discrete_frechet(&p, &q).expect("sequences are not empty");
    assert!(distance >= 1.0);
}

#[test]
fn path_level_distances() {
    let graph = grid(4, 2, 95.0);
    let reference = walk(&graph, &[0, 1, 2, 3]);
    let context = QueryContext::new(&graph, &reference, &QueryConfig::default());
    let origin = reference.initial();

    let distance = path_distance(&context, origin, &reference.edges).expect("path is not empty");
    assert_eq!(distance, 0.0);

    // Following the reference from vertex 1 onwards reproduces it.
    let partial = [edge(&graph, 0, 1)];
    let completion = completion_distance(&context, origin, &partial, vertex(&graph, 1))
        .expect("path is not empty")
        .expect("vertex 1 is on the reference");
    assert_eq!(completion.edges, reference.edges);
    assert_eq!(completion.distance, 0.0);

    let off = completion_distance(&context, origin, &partial, vertex(&graph, 5)).expect("path is not empty");
    assert_eq!(off, None);
}

#[test]
fn local_detours() {
    let graph = grid(3, 2, 40.0);
    let start = vertex(&graph, 0);

    let straight = walk(&graph, &[0, 1, 2]);
    let detour = walk(&graph, &[0, 3, 4, 5, 2]);

    let same = local_distance(&graph, &straight.edges, &straight.edges, start, 10.0).expect("not empty");
    assert_eq!(same, 0.0);

    let apart = local_distance(&graph, &detour.edges, &straight.edges, start, 10.0).expect("not empty");
    assert_relative_eq!(apart, 40.0, epsilon = 1e-6);
}
