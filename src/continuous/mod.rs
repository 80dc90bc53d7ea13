//! State carried between the steps of a continuous query.
//!
//! Road queries remember the last path found within δ (`last_path`)
//! together with an upper bound of its distance to the reference
//! (`bound_distance`). When the vehicle leaves that path, the detour it
//! takes is spliced in if the bound, grown by the detour's local distance,
//! stays within δ. Only otherwise is a full search needed.
//!
//! Euclidean queries only remember the reference position they last
//! matched, see [`ReferenceCursor`].

use itertools::Itertools;
use log::{debug, trace};
use pathfinding::prelude::bfs;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::bound::Bound;
use crate::error::{GraphError, PathError};
use crate::frechet::{local_distance, Completion};
use crate::graph::{EdgeIx, VertexIx};
use crate::index::QueryContext;
use crate::path::{CurrentPath, ReferencePath};


/// A detour leaving the last path and joining it again further on.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    /// Starts with the edge the vehicle deviated on.
    pub detour: Vec<EdgeIx>,
    /// Where the detour meets the last path again.
    pub rejoin: VertexIx,
}

/// What a step of the continuous road query made of the last path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reuse {
    /// The vehicle is still on the last path.
    OnPath,
    /// The detour was spliced into the last path.
    Spliced { local: f64 },
    /// Splicing would let the bound exceed δ.
    Exceeded { bound: f64 },
    /// No detour back onto the last path exists.
    NoOverlap,
}

impl Reuse {
    /// Whether the step was answered without a search.
    pub fn is_answered(&self) -> bool {
        matches!(self, Reuse::OnPath | Reuse::Spliced { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousState {
    pub last_path: Vec<EdgeIx>,
    /// Upper bound of the distance between `last_path` and the reference.
    pub bound_distance: f64,
}

impl ContinuousState {
    /// The reference itself is the first path known to be similar.
    pub fn new(reference: &ReferencePath) -> Self {
        ContinuousState {
            last_path: reference.edges.clone(),
            bound_distance: 0.0,
        }
    }

    /// Replaces the last path with one found by a full search.
    pub fn adopt(&mut self, completion: Completion) {
        debug!(
            "Adopting path of {} edges, bound reset from {:.2}m to {:.2}m",
            completion.edges.len(),
            self.bound_distance,
            completion.distance
        );

        self.last_path = completion.edges;
        self.bound_distance = completion.distance;
    }

    /// Tries to answer the latest step of `current` from the last path.
    ///
    /// The accumulated bound is grown even when the splice is refused. A
    /// full search follows in that case and resets it on success.
    pub fn reuse(&mut self, context: &QueryContext, current: &CurrentPath) -> Result<Reuse, PathError> {
        let (Some(latest), Some(first)) = (current.edges.last(), current.previous()) else {
            return Ok(Reuse::OnPath);
        };

        let step = current.len() - 1;
        if self.last_path.get(step) == Some(latest) {
            return Ok(Reuse::OnPath);
        }

        if self.last_path.get(..step) != Some(&current.edges[..step]) {
            debug!("Last path no longer shares the travelled prefix");
            return Ok(Reuse::NoOverlap);
        }

        let Some(overlap) = maximal_overlap_path(context, &self.last_path, first, *latest)? else {
            return Ok(Reuse::NoOverlap);
        };

        let graph = context.graph();
        let Some(rejoined) = (step..self.last_path.len()).find(|k| graph.edge(self.last_path[*k]).touches(overlap.rejoin))
        else {
            debug!("Detour rejoins before the deviation");
            return Ok(Reuse::NoOverlap);
        };

        let replaced = &self.last_path[step..=rejoined];
        let local = local_distance(graph, &overlap.detour, replaced, first, context.section_length())?;

        self.bound_distance += local;
        if self.bound_distance > context.delta() {
            debug!("Splicing would reach {:.2}m", self.bound_distance);
            return Ok(Reuse::Exceeded {
                bound: self.bound_distance,
            });
        }

        trace!(
            "Splicing {} detour edges over {} at {local:.2}m",
            overlap.detour.len(),
            replaced.len()
        );
        self.last_path.splice(step..=rejoined, overlap.detour);

        Ok(Reuse::Spliced { local })
    }
}

/// Finds the shortest detour that leaves `last_path` at `first` over the
/// travelled edge `deviation` and joins `last_path` again, walking only
/// through the safe area.
///
/// The detour starts with `deviation` itself, never with another edge
/// joining the same vertices. The part of `last_path` already behind
/// `first` may not be used to rejoin. Returns `None` when no such detour
/// exists.
pub fn maximal_overlap_path(
    context: &QueryContext,
    last_path: &[EdgeIx],
    first: VertexIx,
    deviation: EdgeIx,
) -> Result<Option<Overlap>, GraphError> {
    let graph = context.graph();
    let second = graph.edge(deviation).other(first);

    let mut behind = FxHashSet::default();
    behind.insert(first);
    for edge in last_path.iter().map(|edge| graph.edge(*edge)) {
        behind.insert(edge.first);
        behind.insert(edge.second);

        if edge.touches(first) {
            break;
        }
    }

    let on_path = last_path
        .iter()
        .flat_map(|edge| {
            let edge = graph.edge(*edge);
            [edge.first, edge.second]
        })
        .collect::<FxHashSet<_>>();

    let successors = |vertex: &VertexIx| {
        graph
            .neighbours(*vertex)
            .map(|(next, _)| next)
            .filter(|next| !behind.contains(next) && context.is_safe(*next))
            .collect::<SmallVec<[VertexIx; 8]>>()
    };

    let Some(walk) = bfs(&second, successors, |vertex| on_path.contains(vertex)) else {
        return Ok(None);
    };

    let mut detour = Vec::with_capacity(walk.len());
    detour.push(deviation);
    for (from, to) in walk.iter().tuple_windows() {
        detour.push(graph.find_edge(*from, *to)?);
    }

    let rejoin = walk[walk.len() - 1];
    Ok(Some(Overlap { detour, rejoin }))
}

/// The reference position a continuous Euclidean query last matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCursor {
    pub position: usize,
}

impl ReferenceCursor {
    /// Whether `vertex` is still within δ of the matched position.
    pub fn covers(&self, context: &QueryContext, vertex: VertexIx) -> bool {
        self.position < context.points().len() && context.distance_to_point(vertex, self.position) <= context.delta()
    }

    /// Moves to wherever a fresh bound evaluation matched.
    pub fn advance(&mut self, bound: &Bound) {
        self.position = bound.position;
    }
}
