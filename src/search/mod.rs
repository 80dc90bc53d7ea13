//! Best-first branch and bound over simple paths leaving the vehicle's
//! current position.
//!
//! Candidates are extended one safe vertex at a time and ordered by the
//! lower bound of their best completion, broken by the vertex traversal
//! weight. A candidate whose frontier lands on the reference is completed
//! along the reference and measured exactly.

use itertools::Itertools;
use log::{debug, info, warn};
use measure_time::debug_time;
use pathfinding::prelude::bfs;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use crate::bound::{lower_bound, Bound};
use crate::error::PathError;
use crate::frechet::{completion_distance, path_distance, Completion};
use crate::graph::{EdgeIx, Graph, VertexIx};
use crate::index::QueryContext;
use crate::path::CurrentPath;

#[doc(hidden)]
#[cfg(test)]
mod test;

/// Scale applied to a candidate's bound so that the traversal weight only
/// breaks ties between near-equal bounds.
const BOUND_SCALE: f64 = 100_000.0;

/// A simple path explored by the search, with the aggregate window and
/// distance of every vertex it visits.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversingPath {
    pub origin: VertexIx,
    pub edges: Vec<EdgeIx>,
    pub frontier: VertexIx,

    pub min_pos: usize,
    pub max_pos: usize,
    pub dist_to_refer: f64,

    /// Lower bound of the best completion.
    pub bound: f64,
    /// Queue key, smaller is explored first.
    pub priority: f64,
}

impl TraversingPath {
    /// Collapses the travelled prefix into a single candidate.
    pub fn seed(context: &QueryContext, current: &CurrentPath) -> Self {
        let frontier = current.vertex();
        let min_pos = current
            .vertices
            .iter()
            .map(|vertex| context.state(*vertex).min_pos)
            .max()
            .unwrap_or_default();
        let dist_to_refer = current
            .vertices
            .iter()
            .map(|vertex| context.distance_to_reference(*vertex))
            .fold(0.0, f64::max);

        TraversingPath {
            origin: current.origin(),
            edges: current.edges.to_vec(),
            frontier,
            min_pos,
            max_pos: context.state(frontier).max_pos,
            dist_to_refer,
            bound: 0.0,
            priority: 0.0,
        }
    }

    /// The path continued over `edge` onto `next`.
    pub fn extend(&self, context: &QueryContext, next: VertexIx, edge: EdgeIx) -> Self {
        let state = context.state(next);

        let mut edges = Vec::with_capacity(self.edges.len() + 1);
        edges.extend_from_slice(&self.edges);
        edges.push(edge);

        TraversingPath {
            origin: self.origin,
            edges,
            frontier: next,
            min_pos: self.min_pos.max(state.min_pos),
            max_pos: state.max_pos,
            dist_to_refer: self.dist_to_refer.max(context.distance_to_reference(next)),
            bound: self.bound,
            priority: self.priority,
        }
    }

    /// Whether the path already passes through `vertex`.
    pub fn visits(&self, graph: &Graph, vertex: VertexIx) -> bool {
        self.origin == vertex || self.edges.iter().any(|edge| graph.edge(*edge).touches(vertex))
    }

    fn ranked(mut self, bound: f64, weight: f64) -> Self {
        self.bound = bound;
        self.priority = BOUND_SCALE * bound + weight;
        self
    }
}

/// Queue entry whose ordering is reversed, so the [`BinaryHeap`] pops the
/// smallest priority first.
#[derive(Debug)]
struct SmallestHolder(TraversingPath);

impl PartialEq for SmallestHolder {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SmallestHolder {}

impl PartialOrd for SmallestHolder {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallestHolder {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.priority.total_cmp(&self.0.priority)
    }
}

/// Knobs distinguishing the search variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPolicy {
    /// Try a breadth-first walk back onto the reference before searching.
    pub bfs_shortcut: bool,
    /// Skip neighbours whose furthest in-δ reference point sits on a
    /// boundary of their window. This prunes aggressively and may miss
    /// similar paths.
    pub boundary_pruning: bool,
    /// Candidates reaching this many edges are dropped.
    pub max_edges: Option<usize>,
}

impl SearchPolicy {
    /// The first attempt made at every step.
    pub const fn simple() -> Self {
        SearchPolicy {
            bfs_shortcut: true,
            boundary_pruning: false,
            max_edges: None,
        }
    }

    /// The fallback tried once the simple search rejects.
    pub const fn looping(cap: usize) -> Self {
        SearchPolicy {
            bfs_shortcut: false,
            boundary_pruning: true,
            max_edges: Some(cap),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// A complete path within δ of the reference.
    Found(Completion),
    /// No path within δ exists under the policy.
    Rejected,
    /// The deadline expired first. Nothing can be concluded.
    TimedOut { elapsed: Duration },
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }
}

/// Work performed by a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Candidates taken off the queue.
    pub pops: usize,
    /// Exact distances plus lower-bound evaluations.
    pub dfd_evaluations: usize,
    /// Points of the latest partial path discretized for a bound.
    pub discretized: usize,
    /// Reference position of the latest bound.
    pub location: Option<usize>,
}

impl SearchStats {
    fn absorb(&mut self, bound: &Bound) {
        self.dfd_evaluations += bound.evaluations;
        self.discretized = bound.discretized;
        self.location = Some(bound.position);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    pub stats: SearchStats,
}

/// Searches for a completion of the travelled prefix within δ of the
/// reference.
pub struct BranchAndBound<'c, 'a> {
    context: &'c QueryContext<'a>,
    timeout: Duration,
}

impl<'c, 'a> BranchAndBound<'c, 'a> {
    pub fn new(context: &'c QueryContext<'a>, timeout: Duration) -> Self {
        BranchAndBound { context, timeout }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, level = tracing::Level::DEBUG))]
    pub fn search(&self, current: &CurrentPath, policy: SearchPolicy) -> Result<SearchReport, PathError> {
        debug_time!("branch and bound");

        let mut stats = SearchStats::default();
        if policy.bfs_shortcut {
            if let Some(completion) = self.bfs_shortcut(current, &mut stats)? {
                debug!("Breadth-first shortcut matched at {:.2}m", completion.distance);
                return Ok(SearchReport {
                    outcome: SearchOutcome::Found(completion),
                    stats,
                });
            }
        }

        let outcome = self.best_first(current, policy, &mut stats)?;
        match &outcome {
            SearchOutcome::Found(completion) => info!(
                "Found path of {} edges at {:.2}m after {} pops",
                completion.edges.len(),
                completion.distance,
                stats.pops
            ),
            SearchOutcome::Rejected => debug!("Exhausted the frontier after {} pops", stats.pops),
            SearchOutcome::TimedOut { elapsed } => {
                warn!("Search timed out after {elapsed:?} and {} pops", stats.pops)
            }
        }

        Ok(SearchReport { outcome, stats })
    }

    fn best_first(
        &self,
        current: &CurrentPath,
        policy: SearchPolicy,
        stats: &mut SearchStats,
    ) -> Result<SearchOutcome, PathError> {
        let context = self.context;
        let (graph, delta) = (context.graph(), context.delta());
        let (origin, terminal) = (current.origin(), context.reference().terminal());

        let started = Instant::now();
        let mut queue = BinaryHeap::new();
        queue.push(SmallestHolder(TraversingPath::seed(context, current)));

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                return Ok(SearchOutcome::TimedOut { elapsed });
            }

            let Some(SmallestHolder(path)) = queue.pop() else {
                return Ok(SearchOutcome::Rejected);
            };
            stats.pops += 1;

            if policy.max_edges.is_some_and(|cap| path.edges.len() >= cap) {
                continue;
            }

            if path.frontier == terminal {
                let distance = path_distance(context, origin, &path.edges)?;
                stats.dfd_evaluations += 1;

                if distance <= delta {
                    return Ok(SearchOutcome::Found(Completion {
                        edges: path.edges,
                        distance,
                    }));
                }

                continue;
            }

            for (next, edge) in graph.neighbours(path.frontier) {
                if !context.is_safe(next) || path.visits(graph, next) {
                    continue;
                }

                if policy.boundary_pruning && context.peaks_at_window_boundary(next) {
                    continue;
                }

                let extended = path.extend(context, next, edge);
                if context.is_reference(next) {
                    if let Some(completion) = completion_distance(context, origin, &extended.edges, next)? {
                        stats.dfd_evaluations += 1;
                        if completion.distance <= delta {
                            return Ok(SearchOutcome::Found(completion));
                        }
                    }

                    if next == terminal && !context.endpoint_matches() {
                        continue;
                    }
                }

                let bound = lower_bound(
                    context,
                    origin,
                    &extended.edges,
                    next,
                    extended.min_pos,
                    extended.max_pos,
                )?;

                if let Some(bound) = bound {
                    stats.absorb(&bound);
                    if bound.within(delta) {
                        let weight = context.state(next).weight;
                        queue.push(SmallestHolder(extended.ranked(bound.value, weight)));
                    }
                }
            }
        }
    }

    /// Walks breadth-first through safe vertices off the travelled prefix
    /// until the reference is reached, then completes along the reference.
    fn bfs_shortcut(&self, current: &CurrentPath, stats: &mut SearchStats) -> Result<Option<Completion>, PathError> {
        let context = self.context;
        let graph = context.graph();

        let successors = |vertex: &VertexIx| {
            graph
                .neighbours(*vertex)
                .map(|(next, _)| next)
                .filter(|next| context.is_safe(*next) && !current.contains(*next))
                .collect::<SmallVec<[VertexIx; 8]>>()
        };

        let Some(walk) = bfs(&current.vertex(), successors, |vertex| context.is_reference(*vertex)) else {
            return Ok(None);
        };

        let Some(tail) = walk.last().and_then(|joined| context.tail_from(*joined)) else {
            return Ok(None);
        };

        let mut edges = current.edges.to_vec();
        for (from, to) in walk.iter().tuple_windows() {
            edges.push(graph.find_edge(*from, *to)?);
        }
        edges.extend_from_slice(tail);

        let distance = path_distance(context, current.origin(), &edges)?;
        stats.dfd_evaluations += 1;

        Ok((distance <= context.delta()).then_some(Completion { edges, distance }))
    }
}
