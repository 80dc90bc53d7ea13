//! Per-round index of a reference path.
//!
//! A [`QueryContext`] is built once per reference path and holds
//! everything the search needs to know about the network relative to that
//! reference: the discretized reference trajectory, the safe area, each
//! vertex's admissible window of reference positions, and the
//! traversal-order heuristic.
//!
//! The context borrows the graph immutably. Nothing is written back onto
//! the network, so dropping the context is all it takes to reset a round.

use geo::Point;
use log::{debug, info, warn};
use measure_time::debug_time;
use rstar::{RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;
use std::ops::RangeInclusive;

use crate::config::QueryConfig;
use crate::discrete::Trajectory;
use crate::graph::{EdgeIx, Graph, VertexIx};
use crate::path::ReferencePath;
use crate::spatial::{bounding, euc, point_to_segment};


/// Tolerance under which two distances are considered equal when
/// locating the peak of a window.
const PEAK_TOLERANCE: f64 = 1e-6;

/// A reference path segment, indexed for the safe-area filter.
#[derive(Debug, Clone, Copy)]
struct ReferenceSegment {
    from: Point,
    to: Point,
}

impl RTreeObject for ReferenceSegment {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.from, self.to)
    }
}

/// What a round knows about a single vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexState {
    /// The vertex lies on the reference path.
    pub refer: bool,
    /// The vertex lies within δ of some reference segment.
    pub safe: bool,

    /// First discretized reference position within δ of the vertex.
    pub min_pos: usize,
    /// Last discretized reference position within δ of the vertex.
    pub max_pos: usize,

    /// Shortest distance to any reference segment. Only tracked for safe
    /// vertices, see [`QueryContext::distance_to_reference`].
    pub dist_to_refer: f64,
    pub euc_to_final: f64,
    pub weight: f64,
}

impl VertexState {
    /// A vertex outside the safe area, whose window is empty.
    fn outside(points: usize) -> Self {
        VertexState {
            refer: false,
            safe: false,
            min_pos: points,
            max_pos: 0,
            dist_to_refer: f64::INFINITY,
            euc_to_final: f64::INFINITY,
            weight: f64::INFINITY,
        }
    }

    /// The admissible reference positions, if any.
    pub fn window(&self) -> Option<RangeInclusive<usize>> {
        (self.min_pos <= self.max_pos).then_some(self.min_pos..=self.max_pos)
    }
}

pub struct QueryContext<'a> {
    graph: &'a Graph,
    reference: &'a ReferencePath,

    delta: f64,
    section_length: f64,

    points: Vec<Point>,
    states: Vec<VertexState>,
    positions: FxHashMap<VertexIx, usize>,
    endpoint_matches: bool,
}

impl<'a> QueryContext<'a> {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, level = tracing::Level::INFO))]
    pub fn new(graph: &'a Graph, reference: &'a ReferencePath, config: &QueryConfig) -> Self {
        debug_time!("reference indexing");

        let (delta, section_length) = (config.delta, config.section_length);
        let points = Trajectory::new(graph, &reference.edges, reference.initial(), section_length).to_vec();

        let mut states = vec![VertexState::outside(points.len()); graph.vertex_count()];
        let mut positions = FxHashMap::default();

        for (position, vertex) in reference.vertices.iter().enumerate() {
            positions.insert(*vertex, position);
            states[vertex.index()] = VertexState {
                refer: true,
                safe: true,
                dist_to_refer: 0.0,
                ..VertexState::outside(points.len())
            };
        }

        let segments = reference
            .edges
            .iter()
            .map(|edge| {
                let weight = graph.edge(*edge);
                ReferenceSegment {
                    from: graph.position(weight.first),
                    to: graph.position(weight.second),
                }
            })
            .collect::<Vec<_>>();
        let tree = RTree::bulk_load(segments);

        for vertex in graph.vertices() {
            let state = &mut states[vertex.index()];
            if state.refer {
                continue;
            }

            let position = graph.position(vertex);
            let nearest = tree
                .locate_in_envelope_intersecting(&bounding(position, delta))
                .map(|segment| point_to_segment(position, segment.from, segment.to))
                .fold(f64::INFINITY, f64::min);

            if nearest <= delta {
                state.safe = true;
                state.dist_to_refer = nearest;
            }
        }

        let mut context = QueryContext {
            graph,
            reference,
            delta,
            section_length,
            points,
            states,
            positions,
            endpoint_matches: false,
        };

        context.locate_windows();
        context.endpoint_matches = context.window_within_delta(reference.terminal());
        context.assign_weights();

        info!(
            "Indexed reference of {} edges: {} points, {} safe vertices, endpoint matches: {}",
            reference.len(),
            context.points.len(),
            context.safe_count(),
            context.endpoint_matches
        );

        context
    }

    fn locate_windows(&mut self) {
        for vertex in self.graph.vertices() {
            if !self.states[vertex.index()].safe {
                continue;
            }

            let position = self.graph.position(vertex);
            let within = |point: &Point| euc(position, *point) <= self.delta;
            let bounds = (
                self.points.iter().position(within),
                self.points.iter().rposition(within),
            );

            match bounds {
                (Some(min_pos), Some(max_pos)) => {
                    let state = &mut self.states[vertex.index()];
                    state.min_pos = min_pos;
                    state.max_pos = max_pos;
                }
                _ => warn!(
                    "Vertex {} is within {}m of the reference but of none of its points",
                    self.graph.vertex(vertex).id,
                    self.delta
                ),
            }
        }
    }

    /// Whether every reference position in the vertex's window lies
    /// within δ of it. False for an empty window.
    fn window_within_delta(&self, vertex: VertexIx) -> bool {
        self.state(vertex)
            .window()
            .is_some_and(|mut window| window.all(|j| self.distance_to_point(vertex, j) <= self.delta))
    }

    fn assign_weights(&mut self) {
        let terminal = self.graph.position(self.reference.terminal());

        let mut max_euc: f64 = 0.0;
        for vertex in self.graph.vertices() {
            let state = &mut self.states[vertex.index()];
            if state.safe {
                state.euc_to_final = euc(terminal, self.graph.position(vertex));
                max_euc = max_euc.max(state.euc_to_final);
            }
        }

        // Normalise the remaining distance into [0, δ].
        let scale = if max_euc > 0.0 { self.delta / max_euc } else { 0.0 };
        for state in self.states.iter_mut().filter(|state| state.safe) {
            state.weight = 0.5 * state.dist_to_refer + 0.5 * state.euc_to_final * scale;
        }

        debug!("Traversal weights normalised against {max_euc:.1}m");
    }

    #[inline]
    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    #[inline]
    pub fn reference(&self) -> &'a ReferencePath {
        self.reference
    }

    #[inline]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    #[inline]
    pub fn section_length(&self) -> f64 {
        self.section_length
    }

    /// The discretized reference trajectory.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn state(&self, vertex: VertexIx) -> &VertexState {
        &self.states[vertex.index()]
    }

    #[inline]
    pub fn is_safe(&self, vertex: VertexIx) -> bool {
        self.states[vertex.index()].safe
    }

    #[inline]
    pub fn is_reference(&self, vertex: VertexIx) -> bool {
        self.states[vertex.index()].refer
    }

    /// Whether the reference final vertex, on its own, stays within δ of
    /// every reference position in its window.
    #[inline]
    pub fn endpoint_matches(&self) -> bool {
        self.endpoint_matches
    }

    pub fn safe_count(&self) -> usize {
        self.states.iter().filter(|state| state.safe).count()
    }

    /// A trajectory over the network, discretized like the reference.
    pub fn trajectory<'p>(&self, origin: VertexIx, edges: &'p [EdgeIx]) -> Trajectory<'p>
    where
        'a: 'p,
    {
        Trajectory::new(self.graph, edges, origin, self.section_length)
    }

    /// Distance between a vertex and the `j`th reference point.
    #[inline]
    pub fn distance_to_point(&self, vertex: VertexIx, j: usize) -> f64 {
        euc(self.graph.position(vertex), self.points[j])
    }

    /// Shortest distance between a vertex and the reference path.
    ///
    /// Safe vertices answer from the index. Anything else is necessarily
    /// further than δ and is measured against every reference segment.
    pub fn distance_to_reference(&self, vertex: VertexIx) -> f64 {
        let state = self.state(vertex);
        if state.safe {
            return state.dist_to_refer;
        }

        let position = self.graph.position(vertex);
        self.reference
            .edges
            .iter()
            .map(|edge| {
                let weight = self.graph.edge(*edge);
                point_to_segment(
                    position,
                    self.graph.position(weight.first),
                    self.graph.position(weight.second),
                )
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// The reference edges remaining after `vertex`, when the vertex is
    /// part of the reference. Empty for the reference final vertex.
    pub fn tail_from(&self, vertex: VertexIx) -> Option<&'a [EdgeIx]> {
        let reference = self.reference;
        self.positions
            .get(&vertex)
            .map(|position| &reference.edges[*position..])
    }

    /// Whether the furthest in-δ reference point of the vertex's window
    /// sits on one of the window's boundaries. Vertices with an empty
    /// window report true.
    ///
    /// This is a pruning heuristic for loop-tolerant searches and does not
    /// preserve completeness.
    pub fn peaks_at_window_boundary(&self, vertex: VertexIx) -> bool {
        let Some(window) = self.state(vertex).window() else {
            return true;
        };

        let (start, stop) = (*window.start(), *window.end());
        let peak = window
            .map(|j| self.distance_to_point(vertex, j))
            .filter(|distance| *distance <= self.delta)
            .fold(0.0, f64::max);

        (peak - self.distance_to_point(vertex, start)).abs() < PEAK_TOLERANCE
            || (peak - self.distance_to_point(vertex, stop)).abs() < PEAK_TOLERANCE
    }
}
