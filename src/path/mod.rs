//! Edge sequences interpreted as walks through the road network.
//!
//! Both the reference trajectory and the vehicle's complete route are
//! a [`RoadPath`]. The route is consumed one edge at a time through
//! [`RoadPath::prefix`], which yields the [`CurrentPath`] travelled so far.

use log::trace;

use crate::error::PathError;
use crate::graph::{EdgeIx, Graph, VertexIx};


/// An oriented, connected edge sequence.
///
/// The walk order of the vertices is derived from the endpoints the
/// edges share, so `vertices` always holds one more entry than `edges`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadPath {
    pub edges: Vec<EdgeIx>,
    pub vertices: Vec<VertexIx>,

    /// Real-world length of the whole path, in metres.
    pub length: f64,
}

/// The trajectory a vehicle is expected to follow.
pub type ReferencePath = RoadPath;

/// The full route a vehicle actually takes.
pub type CompletePath = RoadPath;

impl RoadPath {
    /// Interprets `edges` as a walk.
    ///
    /// The initial vertex is the endpoint of the first edge that the
    /// second edge does not share. A single edge is walked from its
    /// declared `first` endpoint to its `second`.
    pub fn new(graph: &Graph, edges: Vec<EdgeIx>) -> Result<Self, PathError> {
        let initial = match edges.as_slice() {
            [] => return Err(PathError::TooShort { required: 1, given: 0 }),
            [only] => graph.edge(*only).first,
            [first, second, ..] => {
                let (head, next) = (graph.edge(*first), graph.edge(*second));
                if next.touches(head.first) {
                    head.second
                } else {
                    head.first
                }
            }
        };

        let mut vertices = Vec::with_capacity(edges.len() + 1);
        vertices.push(initial);

        let mut cursor = initial;
        for (index, edge) in edges.iter().enumerate() {
            let weight = graph.edge(*edge);
            if !weight.touches(cursor) {
                return Err(PathError::Disconnected { index, edge: *edge });
            }

            cursor = weight.other(cursor);
            vertices.push(cursor);
        }

        let length = graph.length_of(&edges);
        trace!("Walked path of {} edges ({length:.1}m)", edges.len());

        Ok(RoadPath {
            edges,
            vertices,
            length,
        })
    }

    /// Builds a path from edge identifiers, as found in the flat files.
    pub fn from_ids(graph: &Graph, ids: &[usize]) -> Result<Self, PathError> {
        let edges = ids
            .iter()
            .map(|id| graph.resolve_edge(*id))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(graph, edges)
    }

    #[inline]
    pub fn initial(&self) -> VertexIx {
        self.vertices[0]
    }

    #[inline]
    pub fn terminal(&self) -> VertexIx {
        self.vertices[self.vertices.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// The first `count` edges of the path, clamped to its length.
    pub fn prefix(&self, count: usize) -> CurrentPath<'_> {
        let count = count.min(self.edges.len());
        CurrentPath {
            edges: &self.edges[..count],
            vertices: &self.vertices[..=count],
        }
    }
}

/// The portion of a route travelled so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentPath<'a> {
    pub edges: &'a [EdgeIx],
    pub vertices: &'a [VertexIx],
}

impl CurrentPath<'_> {
    /// The vertex the route started from.
    #[inline]
    pub fn origin(&self) -> VertexIx {
        self.vertices[0]
    }

    /// The vertex the vehicle currently stands on.
    #[inline]
    pub fn vertex(&self) -> VertexIx {
        self.vertices[self.vertices.len() - 1]
    }

    /// The vertex the vehicle stood on before its latest edge.
    pub fn previous(&self) -> Option<VertexIx> {
        self.vertices.len().checked_sub(2).map(|i| self.vertices[i])
    }

    pub fn contains(&self, vertex: VertexIx) -> bool {
        self.vertices.contains(&vertex)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
