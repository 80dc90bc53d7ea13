use crate::config::QueryConfig;
use crate::frechet::path_distance;
use crate::graph::{Graph, VertexId};
use crate::index::QueryContext;
use crate::search::*;
use crate::test_utils::{grid, line, network, vertex, walk};

use approx::assert_relative_eq;
use std::collections::BinaryHeap;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

fn config(delta: f64) -> QueryConfig {
    QueryConfig::default()
        .with_delta(delta)
        .with_section_length(10.0)
}

/// Two routes from 0 to 2: straight along the reference, or through
/// vertex 3 raised `offset` metres above its midpoint.
fn raised_detour(offset: f64) -> Graph {
    network(
        &[(0, 0.0, 0.0), (1, 95.0, 0.0), (2, 190.0, 0.0), (3, 95.0, offset)],
        &[(0, 1), (1, 2), (0, 3), (3, 2)],
    )
}

#[test_log::test]
fn identical_path_is_accepted() {
    let graph = line(4, 95.0);
    let reference = walk(&graph, &[0, 1, 2, 3]);
    let context = QueryContext::new(&graph, &reference, &config(50.0));

    for policy in [SearchPolicy::simple(), SearchPolicy { bfs_shortcut: false, ..SearchPolicy::simple() }] {
        let report = BranchAndBound::new(&context, TIMEOUT)
            .search(&reference.prefix(1), policy)
            .expect("inputs are well formed");

        let SearchOutcome::Found(completion) = report.outcome else {
            panic!("expected a match, got {:?}", report.outcome);
        };
        assert_eq!(completion.edges, reference.edges);
        assert_eq!(completion.distance, 0.0);
    }
}

#[test_log::test]
fn offset_beyond_delta_is_rejected() {
    let graph = raised_detour(50.5);
    let reference = walk(&graph, &[0, 1, 2]);
    let complete = walk(&graph, &[0, 3, 2]);
    let context = QueryContext::new(&graph, &reference, &config(50.0));

    let search = BranchAndBound::new(&context, TIMEOUT);
    for policy in [SearchPolicy::simple(), SearchPolicy::looping(4990)] {
        let report = search.search(&complete.prefix(1), policy).expect("inputs are well formed");
        assert_eq!(report.outcome, SearchOutcome::Rejected);
    }
}

#[test]
fn offset_within_delta_is_accepted() {
    let graph = raised_detour(49.5);
    let reference = walk(&graph, &[0, 1, 2]);
    let complete = walk(&graph, &[0, 3, 2]);
    let context = QueryContext::new(&graph, &reference, &config(50.0));

    let report = BranchAndBound::new(&context, TIMEOUT)
        .search(&complete.prefix(1), SearchPolicy::simple())
        .expect("inputs are well formed");

    let SearchOutcome::Found(completion) = report.outcome else {
        panic!("expected a match, got {:?}", report.outcome);
    };
    assert_eq!(completion.edges, complete.edges);
    assert_relative_eq!(completion.distance, 49.5, epsilon = 1e-3);
}

#[test]
fn expired_deadline_is_not_a_rejection() {
    let graph = raised_detour(50.5);
    let reference = walk(&graph, &[0, 1, 2]);
    let complete = walk(&graph, &[0, 3, 2]);
    let context = QueryContext::new(&graph, &reference, &config(50.0));

    let report = BranchAndBound::new(&context, Duration::ZERO)
        .search(&complete.prefix(1), SearchPolicy::looping(4990))
        .expect("inputs are well formed");

    assert!(matches!(report.outcome, SearchOutcome::TimedOut { .. }));
    assert_eq!(report.stats.pops, 0);
}

#[test_log::test]
fn finds_a_way_back_to_the_reference() {
    // The vehicle drifted onto the row above the reference.
    let graph = grid(5, 2, 40.0);
    let reference = walk(&graph, &[0, 1, 2, 3, 4]);
    let complete = walk(&graph, &[0, 5, 6, 7, 2, 3, 4]);
    let context = QueryContext::new(&graph, &reference, &config(45.0));

    for policy in [SearchPolicy::simple(), SearchPolicy { bfs_shortcut: false, ..SearchPolicy::simple() }] {
        let report = BranchAndBound::new(&context, TIMEOUT)
            .search(&complete.prefix(2), policy)
            .expect("inputs are well formed");

        let SearchOutcome::Found(completion) = report.outcome else {
            panic!("expected a match, got {:?}", report.outcome);
        };

        assert!(completion.distance <= 45.0);
        assert_eq!(&completion.edges[..2], complete.prefix(2).edges);
        let measured = path_distance(&context, complete.initial(), &completion.edges).expect("path is not empty");
        assert_relative_eq!(measured, completion.distance);
    }
}

/// A reference edge with an unconnected ring of `size` vertices of
/// radius 5m floating above it, every vertex within δ of the reference.
fn ring_above_reference(size: usize) -> Graph {
    let mut vertices = vec![(0, 0.0, 0.0), (1, 40.0, 0.0)];
    let mut edges = vec![(0, 1)];

    for i in 0..size {
        let angle = std::f64::consts::TAU * i as f64 / size as f64;
        vertices.push(((i + 2) as VertexId, 20.0 + 5.0 * angle.cos(), 10.0 + 5.0 * angle.sin()));
        edges.push(((i + 2) as VertexId, ((i + 1) % size + 2) as VertexId));
    }

    network(&vertices, &edges)
}

#[test]
fn long_cycles_terminate() {
    let graph = ring_above_reference(5000);
    let reference = walk(&graph, &[0, 1]);
    let complete = walk(&graph, &[2, 3]);
    let context = QueryContext::new(&graph, &reference, &config(50.0));
    assert_eq!(context.safe_count(), 5002);

    let search = BranchAndBound::new(&context, TIMEOUT);

    let capped = SearchPolicy {
        boundary_pruning: false,
        ..SearchPolicy::looping(100)
    };
    let report = search.search(&complete.prefix(1), capped).expect("inputs are well formed");
    assert_eq!(report.outcome, SearchOutcome::Rejected);
    assert!(report.stats.pops <= 100, "cap let {} candidates through", report.stats.pops);

    let report = search
        .search(&complete.prefix(1), SearchPolicy::looping(4990))
        .expect("inputs are well formed");
    assert_eq!(report.outcome, SearchOutcome::Rejected);
}

#[test]
fn extension_tightens_the_window() {
    let graph = grid(4, 3, 40.0);
    let reference = walk(&graph, &[0, 1, 2, 3]);
    let context = QueryContext::new(&graph, &reference, &config(45.0));

    let route = walk(&graph, &[0, 4, 5, 1, 2, 6, 7, 3]);
    let mut path = TraversingPath::seed(&context, &route.prefix(0));

    for (edge, next) in route.edges.iter().zip(&route.vertices[1..]) {
        let extended = path.extend(&context, *next, *edge);

        assert!(extended.min_pos >= path.min_pos);
        assert!(extended.dist_to_refer >= path.dist_to_refer);
        assert_eq!(extended.max_pos, context.state(*next).max_pos);
        assert!(extended.visits(&graph, *next) && extended.visits(&graph, route.initial()));

        path = extended;
    }

    assert_relative_eq!(path.dist_to_refer, 40.0, epsilon = 1e-6);
    assert!(!path.visits(&graph, vertex(&graph, 11)));
}

#[test]
fn pops_smallest_priority_first() {
    let graph = line(2, 40.0);
    let reference = walk(&graph, &[0, 1]);
    let context = QueryContext::new(&graph, &reference, &config(45.0));

    let seed = TraversingPath::seed(&context, &reference.prefix(0));
    let mut queue = BinaryHeap::new();
    for (bound, weight) in [(3.0, 0.0), (1.0, 5.0), (1.0, 2.0), (2.0, 0.0)] {
        queue.push(SmallestHolder(seed.clone().ranked(bound, weight)));
    }

    let order = std::iter::from_fn(|| queue.pop().map(|SmallestHolder(path)| path.priority)).collect::<Vec<_>>();
    assert_eq!(order, vec![100_002.0, 100_005.0, 200_000.0, 300_000.0]);
}
