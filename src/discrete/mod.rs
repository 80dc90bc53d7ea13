//! Arc-length discretization of edge sequences.
//!
//! A [`Trajectory`] is a cheap, copyable description of a walk. Calling
//! [`Trajectory::points`] produces a fresh iterator over its samples, so
//! a trajectory can be replayed any number of times with identical output.

use geo::Point;

use crate::graph::{EdgeIx, Graph, VertexIx};


#[derive(Debug, Clone, Copy)]
pub struct Trajectory<'a> {
    graph: &'a Graph,
    edges: &'a [EdgeIx],
    start: VertexIx,
    section_length: f64,
}

impl<'a> Trajectory<'a> {
    /// Describes the walk over `edges` beginning at `start`. The start
    /// vertex resolves the direction each edge is traversed in.
    pub fn new(graph: &'a Graph, edges: &'a [EdgeIx], start: VertexIx, section_length: f64) -> Self {
        Self {
            graph,
            edges,
            start,
            section_length,
        }
    }

    pub fn points(&self) -> Points<'a> {
        Points {
            graph: self.graph,
            edges: self.edges.iter(),
            cursor: self.start,
            step: self.section_length,
            section: None,
            terminal: Some(self.graph.position(self.start)),
        }
    }

    /// Collects the samples into a vector.
    pub fn to_vec(&self) -> Vec<Point> {
        self.points().collect()
    }
}

/// Sampling state within a single edge.
#[derive(Debug, Clone, Copy)]
struct Section {
    from: Point,
    to: Point,
    real_length: f64,
    taken: usize,
}

impl Section {
    fn sample(&mut self, step: f64) -> Option<Point> {
        let travelled = self.taken as f64 * step;
        if travelled >= self.real_length || (step <= 0.0 && self.taken > 0) {
            return None;
        }

        self.taken += 1;
        let ratio = travelled / self.real_length;
        Some(Point::new(
            self.from.x() + (self.to.x() - self.from.x()) * ratio,
            self.from.y() + (self.to.y() - self.from.y()) * ratio,
        ))
    }
}

/// Samples of a [`Trajectory`].
///
/// Each edge is sampled from its start every `section_length` metres,
/// stopping before its end. The far end of the final edge is emitted
/// last, exactly once.
pub struct Points<'a> {
    graph: &'a Graph,
    edges: std::slice::Iter<'a, EdgeIx>,
    cursor: VertexIx,
    step: f64,
    section: Option<Section>,
    terminal: Option<Point>,
}

impl Iterator for Points<'_> {
    type Item = Point;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(point) = self.section.as_mut().and_then(|s| s.sample(self.step)) {
                return Some(point);
            }

            match self.edges.next() {
                Some(edge) => {
                    let weight = self.graph.edge(*edge);
                    let next = weight.other(self.cursor);

                    let (from, to) = (self.graph.position(self.cursor), self.graph.position(next));
                    self.section = Some(Section {
                        from,
                        to,
                        real_length: weight.real_length,
                        taken: 0,
                    });

                    self.cursor = next;
                    self.terminal = Some(to);
                }
                None => return self.terminal.take(),
            }
        }
    }
}
