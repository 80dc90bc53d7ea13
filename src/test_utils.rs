//! Synthetic road networks shared by the unit tests.
//!
//! Every fixture sits on the equator, where one degree spans the same
//! distance along both axes, so coordinates can be written in metres.

use crate::graph::{EdgeIx, Graph, VertexId, VertexIx};
use crate::path::RoadPath;
use crate::spatial::METRES_PER_DEGREE;

pub fn degrees(metres: f64) -> f64 {
    metres / METRES_PER_DEGREE
}

/// Builds a graph from `(id, x, y)` vertices given in metres and
/// `(first, second)` edges, in that insertion order.
pub fn network(vertices: &[(VertexId, f64, f64)], edges: &[(VertexId, VertexId)]) -> Graph {
    let mut builder = Graph::builder();
    for (id, x, y) in vertices {
        builder
            .vertex(*id, degrees(*x), degrees(*y))
            .expect("fixture vertices are unique");
    }

    for (first, second) in edges {
        builder
            .edge(*first, *second)
            .expect("fixture edges reference declared vertices");
    }

    builder.build()
}

/// `count` vertices on a horizontal line, `spacing` metres apart,
/// joined in order. Vertex `i` sits at `x = i * spacing`.
pub fn line(count: usize, spacing: f64) -> Graph {
    let vertices = (0..count)
        .map(|i| (i as VertexId, i as f64 * spacing, 0.0))
        .collect::<Vec<_>>();
    let edges = (1..count)
        .map(|i| ((i - 1) as VertexId, i as VertexId))
        .collect::<Vec<_>>();

    network(&vertices, &edges)
}

/// A `width` by `height` lattice with `spacing` metres between
/// neighbours. Vertex `row * width + col` sits at
/// `(col * spacing, row * spacing)`.
pub fn grid(width: usize, height: usize, spacing: f64) -> Graph {
    let id = |col: usize, row: usize| (row * width + col) as VertexId;

    let mut vertices = vec![];
    for row in 0..height {
        for col in 0..width {
            vertices.push((id(col, row), col as f64 * spacing, row as f64 * spacing));
        }
    }

    let mut edges = vec![];
    for row in 0..height {
        for col in 1..width {
            edges.push((id(col - 1, row), id(col, row)));
        }
    }
    for row in 1..height {
        for col in 0..width {
            edges.push((id(col, row - 1), id(col, row)));
        }
    }

    network(&vertices, &edges)
}

pub fn vertex(graph: &Graph, id: VertexId) -> VertexIx {
    graph.resolve(id).expect("fixture vertex exists")
}

pub fn edge(graph: &Graph, first: VertexId, second: VertexId) -> EdgeIx {
    graph
        .find_edge(vertex(graph, first), vertex(graph, second))
        .expect("fixture vertices are adjacent")
}

/// The path visiting the given vertex ids in order.
pub fn walk(graph: &Graph, ids: &[VertexId]) -> RoadPath {
    let edges = ids
        .windows(2)
        .map(|pair| edge(graph, pair[0], pair[1]))
        .collect();

    RoadPath::new(graph, edges).expect("fixture walk is connected")
}
