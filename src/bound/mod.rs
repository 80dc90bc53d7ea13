//! Admissible lower bound on the distance any completion of a partial
//! path can reach.
//!
//! Any completion couples the partial path's last point with some
//! reference position `j` inside the path's window, so the DFD of the
//! partial path against the reference prefix ending at `j` bounds it from
//! below. The bound only has to decide whether that minimum over `j` can
//! stay within δ, which [`lower_bound`] answers without filling the whole
//! table:
//!
//! The distances from the frontier to the window's reference points are
//! split into monotone runs. Within a non-increasing run the prefix
//! distance is non-increasing too, so only the run's last position is
//! evaluated. Within a non-decreasing run positions are evaluated in order
//! until the frontier's distance to the next point alone exceeds the
//! value found, after which the run cannot improve.

use smallvec::SmallVec;

use crate::error::PathError;
use crate::frechet::FrechetSweep;
use crate::graph::{EdgeIx, VertexIx};
use crate::index::QueryContext;


/// An inclusive interval of reference positions over which the
/// frontier's distance is monotone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    pub start: usize,
    pub stop: usize,
    pub increasing: bool,
}

/// The result of a bound evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    /// The smallest prefix distance found, or the first one below δ.
    pub value: f64,
    /// The reference position `value` was found at.
    pub position: usize,
    /// Number of runs evaluated.
    pub evaluations: usize,
    /// Number of points the partial path was discretized into.
    pub discretized: usize,
}

impl Bound {
    pub fn within(&self, delta: f64) -> bool {
        self.value < delta
    }

    fn consider(&mut self, value: f64, position: usize) {
        if value < self.value {
            self.value = value;
            self.position = position;
        }
    }
}

/// Splits `distances` into maximal monotone runs. Entries set to `None`
/// separate runs, as does any change of trend. Equal neighbours continue
/// the current trend. Positions are offset by `offset`.
pub fn monotone_runs(distances: &[Option<f64>], offset: usize) -> SmallVec<[Sequence; 8]> {
    struct Open {
        start: usize,
        stop: usize,
        last: f64,
        trend: Option<bool>,
    }

    let close = |run: Open| Sequence {
        start: run.start,
        stop: run.stop,
        increasing: run.trend == Some(true),
    };

    let mut runs = SmallVec::new();
    let mut open: Option<Open> = None;

    for (i, distance) in distances.iter().enumerate() {
        let j = offset + i;

        let Some(value) = *distance else {
            if let Some(run) = open.take() {
                runs.push(close(run));
            }
            continue;
        };

        let Some(run) = open.as_mut() else {
            open = Some(Open {
                start: j,
                stop: j,
                last: value,
                trend: None,
            });
            continue;
        };

        let trend = if value > run.last {
            Some(true)
        } else if value < run.last {
            Some(false)
        } else {
            None
        };

        match (run.trend, trend) {
            (Some(current), Some(next)) if current != next => {
                if let Some(finished) = open.replace(Open {
                    start: j,
                    stop: j,
                    last: value,
                    trend: Some(next),
                }) {
                    runs.push(close(finished));
                }
            }
            (None, Some(next)) => {
                run.trend = Some(next);
                run.stop = j;
                run.last = value;
            }
            _ => {
                run.stop = j;
                run.last = value;
            }
        }
    }

    if let Some(run) = open {
        runs.push(close(run));
    }

    runs
}

/// Lower-bounds the distance of every completion of the partial path
/// `edges`, walked from `origin` and ending at `frontier`, whose window of
/// admissible reference positions is `min_pos..=max_pos`.
///
/// Returns `None` when the window is empty or no position in it lies
/// within δ of the frontier: no completion can be accepted. Otherwise
/// evaluation stops at the first value strictly below δ, the same test
/// [`Bound::within`] applies. A value of exactly δ keeps the scan going.
pub fn lower_bound(
    context: &QueryContext,
    origin: VertexIx,
    edges: &[EdgeIx],
    frontier: VertexIx,
    min_pos: usize,
    max_pos: usize,
) -> Result<Option<Bound>, PathError> {
    let references = context.points();
    let max_pos = max_pos.min(references.len().saturating_sub(1));
    if min_pos > max_pos {
        return Ok(None);
    }

    let delta = context.delta();
    let distances = (min_pos..=max_pos)
        .map(|j| Some(context.distance_to_point(frontier, j)).filter(|distance| *distance <= delta))
        .collect::<SmallVec<[Option<f64>; 64]>>();

    let runs = monotone_runs(&distances, min_pos);
    if runs.is_empty() {
        return Ok(None);
    }

    let rows = context.trajectory(origin, edges).to_vec();
    let mut sweep = FrechetSweep::new(&rows)?;

    let mut bound = Bound {
        value: f64::INFINITY,
        position: min_pos,
        evaluations: 0,
        discretized: rows.len(),
    };

    for run in runs {
        bound.evaluations += 1;

        if !run.increasing {
            let value = sweep.advance_to(references, run.stop);
            bound.consider(value, run.stop);
            if bound.within(delta) {
                return Ok(Some(bound));
            }

            continue;
        }

        for j in run.start..=run.stop {
            let value = sweep.advance_to(references, j);
            bound.consider(value, j);
            if bound.within(delta) {
                return Ok(Some(bound));
            }

            if j < run.stop && context.distance_to_point(frontier, j + 1) >= value {
                break;
            }
        }
    }

    Ok(Some(bound))
}

/// The bound used by Euclidean queries, which additionally require the
/// frontier to lie in the safe area.
pub fn euclidean_bound(
    context: &QueryContext,
    origin: VertexIx,
    edges: &[EdgeIx],
    frontier: VertexIx,
    min_pos: usize,
    max_pos: usize,
) -> Result<Option<Bound>, PathError> {
    if !context.is_safe(frontier) {
        return Ok(None);
    }

    lower_bound(context, origin, edges, frontier, min_pos, max_pos)
}
