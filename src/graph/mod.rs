//! The spatial road network.
//!
//! Vertices and edges live in a [`petgraph`] arena, addressed by the
//! integer [`VertexIx`] / [`EdgeIx`] handles. External vertex identifiers
//! are resolved once, at ingestion, through [`Graph::resolve`]. Edge
//! identifiers are their insertion order, matching the flat-file layout
//! where edges are numbered by appearance.

use geo::Point;
use log::{debug, info};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use std::fmt::{Debug, Formatter};

use crate::error::GraphError;
use crate::spatial;


/// Identifier of a vertex as given by the input data.
pub type VertexId = i64;

/// Arena handle of a vertex.
pub type VertexIx = NodeIndex;

/// Arena handle of an edge, equal to its insertion order.
pub type EdgeIx = EdgeIndex;

pub type GraphStructure = UnGraph<Vertex, Edge>;

/// A road network vertex. Only identity and position are stored here,
/// everything relative to a reference path belongs to the query round.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub position: Point,
}

/// An undirected road segment.
///
/// `first` and `second` keep the orientation the edge was declared
/// with, which path construction uses to derive endpoints.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Edge {
    pub first: VertexIx,
    pub second: VertexIx,

    /// Planar length, in degrees.
    pub length: f64,
    /// Real-world length, in metres.
    pub real_length: f64,
}

impl Edge {
    /// Whether `vertex` is one of the edge endpoints.
    #[inline]
    pub fn touches(&self, vertex: VertexIx) -> bool {
        self.first == vertex || self.second == vertex
    }

    /// The endpoint opposite to `vertex`. Assumes `vertex` touches the edge.
    #[inline]
    pub fn other(&self, vertex: VertexIx) -> VertexIx {
        if self.first == vertex {
            self.second
        } else {
            self.first
        }
    }
}

/// Routing graph, ingested from vertex and edge lists through
/// [`GraphBuilder`]. It is immutable once built.
pub struct Graph {
    pub(crate) graph: GraphStructure,
    pub(crate) lookup: FxHashMap<VertexId, VertexIx>,
}

impl Debug for Graph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Graph with Vertices: {}, Edges: {}",
            self.graph.node_count(),
            self.graph.edge_count()
        )
    }
}

impl Graph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Resolves an external vertex identifier into its arena handle.
    pub fn resolve(&self, id: VertexId) -> Result<VertexIx, GraphError> {
        self.lookup
            .get(&id)
            .copied()
            .ok_or(GraphError::UnknownVertex(id))
    }

    /// Resolves an edge identifier (its insertion order) into its handle.
    pub fn resolve_edge(&self, id: usize) -> Result<EdgeIx, GraphError> {
        let index = EdgeIndex::new(id);
        self.graph
            .edge_weight(index)
            .map(|_| index)
            .ok_or(GraphError::UnknownEdge(id))
    }

    #[inline]
    pub fn vertex(&self, vertex: VertexIx) -> &Vertex {
        &self.graph[vertex]
    }

    #[inline]
    pub fn edge(&self, edge: EdgeIx) -> &Edge {
        &self.graph[edge]
    }

    #[inline]
    pub fn position(&self, vertex: VertexIx) -> Point {
        self.graph[vertex].position
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexIx> + '_ {
        self.graph.node_indices()
    }

    /// The neighbours of a vertex along with the edge reaching them.
    pub fn neighbours(&self, vertex: VertexIx) -> impl Iterator<Item = (VertexIx, EdgeIx)> + '_ {
        self.graph
            .edges(vertex)
            .map(move |edge| (edge.weight().other(vertex), edge.id()))
    }

    /// Finds the edge connecting two vertices.
    ///
    /// Path construction only ever asks for adjacent pairs, so a miss
    /// indicates a corrupted graph or path and is surfaced as an error.
    pub fn find_edge(&self, a: VertexIx, b: VertexIx) -> Result<EdgeIx, GraphError> {
        self.graph
            .find_edge(a, b)
            .ok_or(GraphError::NotAdjacent(a, b))
    }

    /// Total real-world length of an edge sequence, in metres.
    pub fn length_of(&self, edges: &[EdgeIx]) -> f64 {
        edges.iter().map(|edge| self.edge(*edge).real_length).sum()
    }
}

/// Computes the planar and real-world lengths of the segment `a -> b`.
///
/// The real-world length applies the flat-earth approximation,
/// correcting longitude by the cosine of the first endpoint's latitude.
pub fn edge_length(a: Point, b: Point) -> (f64, f64) {
    let (x, y) = (a.x() - b.x(), a.y() - b.y());
    (spatial::planar(a, b), spatial::real_distance(x, y, a.y()))
}

/// Incrementally ingests vertices and edges. Adjacency is derived
/// while edges are added.
#[derive(Default)]
pub struct GraphBuilder {
    graph: GraphStructure,
    lookup: FxHashMap<VertexId, VertexIx>,
}

impl GraphBuilder {
    pub fn vertex(&mut self, id: VertexId, longitude: f64, latitude: f64) -> Result<VertexIx, GraphError> {
        if self.lookup.contains_key(&id) {
            return Err(GraphError::DuplicateVertex(id));
        }

        let index = self.graph.add_node(Vertex {
            id,
            position: Point::new(longitude, latitude),
        });

        self.lookup.insert(id, index);
        Ok(index)
    }

    /// Adds an edge between two previously declared vertices,
    /// returning its handle. Handles are assigned sequentially.
    pub fn edge(&mut self, first: VertexId, second: VertexId) -> Result<EdgeIx, GraphError> {
        let a = *self
            .lookup
            .get(&first)
            .ok_or(GraphError::UnknownVertex(first))?;
        let b = *self
            .lookup
            .get(&second)
            .ok_or(GraphError::UnknownVertex(second))?;

        let (length, real_length) = edge_length(self.graph[a].position, self.graph[b].position);

        Ok(self.graph.add_edge(
            a,
            b,
            Edge {
                first: a,
                second: b,
                length,
                real_length,
            },
        ))
    }

    pub fn build(self) -> Graph {
        info!(
            "Finished. Ingested {} vertices and {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        );

        if self.graph.node_count() > 0 && self.graph.edge_count() == 0 {
            debug!("Graph has no edges, every query will be trivially rejected");
        }

        Graph {
            graph: self.graph,
            lookup: self.lookup,
        }
    }
}
