//! Discrete Fréchet Distance.
//!
//! The coupling table is filled bottom-up, one column at a time, keeping
//! only the latest column alive. [`FrechetSweep`] exposes that sweep so
//! callers can extend the second sequence incrementally and read the
//! distance of every prefix along the way, which is what the lower bound
//! relies on.

use geo::Point;
use log::trace;

use crate::discrete::Trajectory;
use crate::error::PathError;
use crate::graph::{EdgeIx, Graph, VertexIx};
use crate::index::QueryContext;
use crate::spatial::euc;

#[doc(hidden)]
#[cfg(test)]
mod test;

/// Column-wise evaluation of the coupling table between a fixed sequence
/// (the rows) and a sequence fed one point at a time (the columns).
///
/// After `j + 1` pushes, [`FrechetSweep::value`] is the distance between
/// all rows and the first `j + 1` columns.
#[derive(Debug, Clone)]
pub struct FrechetSweep<'p> {
    rows: &'p [Point],
    column: Vec<f64>,
    columns: usize,
}

impl<'p> FrechetSweep<'p> {
    pub fn new(rows: &'p [Point]) -> Result<Self, PathError> {
        if rows.is_empty() {
            return Err(PathError::EmptyTrajectory);
        }

        Ok(FrechetSweep {
            rows,
            column: vec![f64::INFINITY; rows.len()],
            columns: 0,
        })
    }

    /// Appends a column and returns the distance over every row.
    pub fn push(&mut self, point: Point) -> f64 {
        let column = &mut self.column;

        if self.columns == 0 {
            column[0] = euc(self.rows[0], point);
            for i in 1..self.rows.len() {
                column[i] = column[i - 1].max(euc(self.rows[i], point));
            }
        } else {
            let mut diagonal = column[0];
            column[0] = column[0].max(euc(self.rows[0], point));

            for i in 1..self.rows.len() {
                let left = column[i];
                let reachable = left.min(diagonal).min(column[i - 1]);
                column[i] = reachable.max(euc(self.rows[i], point));
                diagonal = left;
            }
        }

        self.columns += 1;
        self.value()
    }

    /// Pushes columns until `columns[j]` has been consumed, returning the
    /// distance over the first `j + 1` of them.
    ///
    /// The sweep only moves forward: asking for a column already passed
    /// returns the latest value.
    pub fn advance_to(&mut self, columns: &[Point], j: usize) -> f64 {
        if self.columns <= j {
            for point in &columns[self.columns..=j] {
                self.push(*point);
            }
        }

        self.value()
    }

    /// Distance between all rows and the columns pushed so far.
    #[inline]
    pub fn value(&self) -> f64 {
        self.column[self.column.len() - 1]
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }
}

/// The Discrete Fréchet Distance between two point sequences, in metres.
pub fn discrete_frechet(p: &[Point], q: &[Point]) -> Result<f64, PathError> {
    if q.is_empty() {
        return Err(PathError::EmptyTrajectory);
    }

    let mut sweep = FrechetSweep::new(p)?;
    for point in q {
        sweep.push(*point);
    }

    Ok(sweep.value())
}

/// A candidate path completed along the remainder of the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub edges: Vec<EdgeIx>,
    pub distance: f64,
}

/// DFD between a full candidate path walked from `origin` and the reference.
pub fn path_distance(context: &QueryContext, origin: VertexIx, edges: &[EdgeIx]) -> Result<f64, PathError> {
    let points = context.trajectory(origin, edges).to_vec();
    let distance = discrete_frechet(&points, context.points())?;

    trace!("Path of {} edges ({} points) at {distance:.2}m", edges.len(), points.len());
    Ok(distance)
}

/// Completes a partial path whose frontier lies on the reference by
/// following the reference from the frontier onwards, and measures the
/// result against the reference.
///
/// Returns `None` when the frontier is not a reference vertex.
pub fn completion_distance(
    context: &QueryContext,
    origin: VertexIx,
    partial: &[EdgeIx],
    frontier: VertexIx,
) -> Result<Option<Completion>, PathError> {
    let Some(tail) = context.tail_from(frontier) else {
        return Ok(None);
    };

    let edges = [partial, tail].concat();
    let distance = path_distance(context, origin, &edges)?;

    Ok(Some(Completion { edges, distance }))
}

/// DFD between two local paths leaving the same `start` vertex.
pub fn local_distance(
    graph: &Graph,
    first: &[EdgeIx],
    second: &[EdgeIx],
    start: VertexIx,
    section_length: f64,
) -> Result<f64, PathError> {
    let p = Trajectory::new(graph, first, start, section_length).to_vec();
    let q = Trajectory::new(graph, second, start, section_length).to_vec();

    discrete_frechet(&p, &q)
}
