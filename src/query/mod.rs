//! Query rounds over one reference path and one complete path.
//!
//! A round replays the complete path one edge at a time and asks, at
//! every step, whether the route travelled so far can still be completed
//! within δ of the reference. Four drivers exist, in Euclidean or
//! road-network space, answering each step independently or carrying
//! state from one step to the next.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::bound::{euclidean_bound, Bound};
use crate::config::{QueryConfig, QueryMode};
use crate::continuous::{ContinuousState, ReferenceCursor};
use crate::error::{PathError, QueryError};
use crate::frechet::path_distance;
use crate::graph::Graph;
use crate::index::QueryContext;
use crate::path::{CompletePath, CurrentPath, ReferencePath};
use crate::search::{BranchAndBound, SearchOutcome, SearchPolicy, SearchStats, TraversingPath};

#[doc(hidden)]
#[cfg(test)]
mod test;

/// Measurements taken at a single step of a round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub num_dfd_cal: usize,
    pub num_tem_discrete: usize,
    pub num_refer_discrete: usize,
    pub location_of_refer: Option<usize>,
    pub num_of_out_pri_queue: usize,
    pub com_path_size: usize,
    pub refer_path_size: usize,
    pub euc_con_query_pos: usize,
    /// Seconds spent answering the step.
    pub run_time: f64,
    pub curr_path_length: f64,
    pub com_path_length: f64,
    pub ratio_num_edge: f64,
    pub ratio_path_length: f64,
    pub refer_path_length: f64,
}

impl Record {
    fn absorb(&mut self, stats: &SearchStats) {
        self.num_of_out_pri_queue += stats.pops;
        self.num_dfd_cal += stats.dfd_evaluations;

        if stats.location.is_some() {
            self.num_tem_discrete = stats.discretized;
            self.location_of_refer = stats.location;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    /// Every step evaluated was within δ.
    Similar,
    /// The first step found to be beyond δ.
    Diverged { step: usize },
    /// A search ran out of time at `step`. Nothing is known past it.
    Indeterminate { step: usize, elapsed: Duration },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub mode: QueryMode,
    pub verdict: Verdict,
    pub records: Vec<Record>,
    /// Steps found beyond δ. Only single-point road queries carry on
    /// past the first one.
    pub rejected: Vec<usize>,
    pub run_time: Duration,
    /// The last path of a continuous road query, for inspection.
    pub state: Option<ContinuousState>,
}

impl RoundReport {
    fn new(mode: QueryMode) -> Self {
        RoundReport {
            mode,
            verdict: Verdict::Similar,
            records: vec![],
            rejected: vec![],
            run_time: Duration::ZERO,
            state: None,
        }
    }

    fn reject(&mut self, step: usize) {
        self.rejected.push(step);
        if self.verdict == Verdict::Similar {
            self.verdict = Verdict::Diverged { step };
        }
    }

    /// Turns an indeterminate round into a [`QueryError::Timeout`].
    pub fn conclusive(self) -> Result<Self, QueryError> {
        match self.verdict {
            Verdict::Indeterminate { elapsed, .. } => Err(QueryError::Timeout { elapsed }),
            _ => Ok(self),
        }
    }
}

/// Runs query rounds against a road network.
pub struct Session<'g> {
    graph: &'g Graph,
    config: QueryConfig,
}

impl<'g> Session<'g> {
    pub fn new(graph: &'g Graph, config: QueryConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Session { graph, config })
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Runs the round selected by the configured mode.
    pub fn run(&self, reference: &ReferencePath, complete: &CompletePath) -> Result<RoundReport, QueryError> {
        info!(
            "Starting {} round: reference of {} edges, complete path of {} edges",
            self.config.mode,
            reference.len(),
            complete.len()
        );

        let report = match self.config.mode {
            QueryMode::EuclideanSimple => self.euclidean_simple(reference, complete),
            QueryMode::EuclideanContinuous => self.euclidean_continuous(reference, complete),
            QueryMode::RoadSimple => self.road_simple(reference, complete),
            QueryMode::RoadContinuous => self.road_continuous(reference, complete),
        }?;

        info!(
            "Finished {} round in {:?}: {:?}",
            report.mode, report.run_time, report.verdict
        );
        Ok(report)
    }

    /// Answers every step independently in Euclidean space, stopping at
    /// the first step beyond δ.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, level = tracing::Level::INFO))]
    pub fn euclidean_simple(
        &self,
        reference: &ReferencePath,
        complete: &CompletePath,
    ) -> Result<RoundReport, QueryError> {
        let context = QueryContext::new(self.graph, reference, &self.config);
        let mut report = RoundReport::new(QueryMode::EuclideanSimple);
        let started = Instant::now();

        let mut travelled = 0.0;
        for step in 1..=complete.len() {
            travelled += self.graph.edge(complete.edges[step - 1]).real_length;
            let current = complete.prefix(step);
            let mut record = self.record(&context, complete, step, travelled);

            let timer = Instant::now();
            let similar = euclidean_step(&context, &current, &mut record)?.is_some_and(|outcome| outcome.similar);
            record.run_time = timer.elapsed().as_secs_f64();
            report.records.push(record);

            if !similar {
                report.reject(step);
                break;
            }
        }

        report.run_time = started.elapsed();
        Ok(report)
    }

    /// Follows the vehicle in Euclidean space, re-evaluating only once it
    /// moves beyond δ of the reference position it last matched.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, level = tracing::Level::INFO))]
    pub fn euclidean_continuous(
        &self,
        reference: &ReferencePath,
        complete: &CompletePath,
    ) -> Result<RoundReport, QueryError> {
        let context = QueryContext::new(self.graph, reference, &self.config);
        let mut report = RoundReport::new(QueryMode::EuclideanContinuous);
        let started = Instant::now();

        let mut cursor = ReferenceCursor::default();
        let mut travelled = 0.0;
        for step in 1..complete.len() {
            travelled += self.graph.edge(complete.edges[step - 1]).real_length;
            let current = complete.prefix(step);
            let mut record = self.record(&context, complete, step, travelled);

            let timer = Instant::now();
            if cursor.covers(&context, current.vertex()) {
                record.run_time = timer.elapsed().as_secs_f64();
                report.records.push(record);
                continue;
            }

            record.euc_con_query_pos = cursor.position;
            let outcome = euclidean_step(&context, &current, &mut record)?;
            record.run_time = timer.elapsed().as_secs_f64();
            report.records.push(record);

            match outcome {
                Some(EuclideanStep { similar: true, bound }) => {
                    if let Some(bound) = bound {
                        cursor.advance(&bound);
                    }
                }
                _ => {
                    report.reject(step);
                    break;
                }
            }
        }

        report.run_time = started.elapsed();
        Ok(report)
    }

    /// Answers every step independently on the road network. A step beyond
    /// δ is recorded and the round moves on.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, level = tracing::Level::INFO))]
    pub fn road_simple(&self, reference: &ReferencePath, complete: &CompletePath) -> Result<RoundReport, QueryError> {
        let context = QueryContext::new(self.graph, reference, &self.config);
        let search = BranchAndBound::new(&context, self.config.timeout);
        let mut report = RoundReport::new(QueryMode::RoadSimple);
        let started = Instant::now();

        let mut travelled = 0.0;
        for step in 1..complete.len() {
            travelled += self.graph.edge(complete.edges[step - 1]).real_length;
            let current = complete.prefix(step);
            let mut record = self.record(&context, complete, step, travelled);

            let timer = Instant::now();
            match self.full_search(&search, &current, &mut record)? {
                SearchOutcome::TimedOut { elapsed } => {
                    report.verdict = Verdict::Indeterminate { step, elapsed };
                    break;
                }
                SearchOutcome::Found(_) => {}
                SearchOutcome::Rejected => report.reject(step),
            }

            record.run_time = timer.elapsed().as_secs_f64();
            report.records.push(record);
        }

        report.run_time = started.elapsed();
        Ok(report)
    }

    /// Follows the vehicle on the road network, reusing the last path
    /// found within δ for as long as the vehicle's detours allow it.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, level = tracing::Level::INFO))]
    pub fn road_continuous(
        &self,
        reference: &ReferencePath,
        complete: &CompletePath,
    ) -> Result<RoundReport, QueryError> {
        let context = QueryContext::new(self.graph, reference, &self.config);
        let search = BranchAndBound::new(&context, self.config.timeout);
        let mut report = RoundReport::new(QueryMode::RoadContinuous);
        let started = Instant::now();

        let mut state = ContinuousState::new(reference);
        let mut travelled = 0.0;
        for step in 1..complete.len() {
            travelled += self.graph.edge(complete.edges[step - 1]).real_length;
            let current = complete.prefix(step);
            let mut record = self.record(&context, complete, step, travelled);

            let timer = Instant::now();
            let reuse = state.reuse(&context, &current)?;
            if reuse.is_answered() {
                record.run_time = timer.elapsed().as_secs_f64();
                report.records.push(record);
                continue;
            }

            debug!("Step {step} needs a full search ({reuse:?})");
            let outcome = self.full_search(&search, &current, &mut record)?;
            record.run_time = timer.elapsed().as_secs_f64();
            report.records.push(record);

            match outcome {
                SearchOutcome::Found(completion) => state.adopt(completion),
                SearchOutcome::Rejected => {
                    report.reject(step);
                    break;
                }
                SearchOutcome::TimedOut { elapsed } => {
                    report.verdict = Verdict::Indeterminate { step, elapsed };
                    break;
                }
            }
        }

        report.run_time = started.elapsed();
        report.state = Some(state);
        Ok(report)
    }

    /// The simple search, falling back once to the loop-tolerant one when
    /// it rejects.
    fn full_search(
        &self,
        search: &BranchAndBound,
        current: &CurrentPath,
        record: &mut Record,
    ) -> Result<SearchOutcome, PathError> {
        let report = search.search(current, SearchPolicy::simple())?;
        record.absorb(&report.stats);
        if report.outcome != SearchOutcome::Rejected {
            return Ok(report.outcome);
        }

        debug!("Simple search rejected, retrying with loops allowed");
        let report = search.search(current, SearchPolicy::looping(self.config.loop_path_cap))?;
        record.absorb(&report.stats);

        if let SearchOutcome::TimedOut { elapsed } = report.outcome {
            warn!("Loop-tolerant search timed out after {elapsed:?}");
        }

        Ok(report.outcome)
    }

    fn record(&self, context: &QueryContext, complete: &CompletePath, step: usize, travelled: f64) -> Record {
        let reference = context.reference();
        Record {
            num_refer_discrete: context.points().len(),
            com_path_size: complete.len(),
            refer_path_size: reference.len(),
            curr_path_length: travelled,
            com_path_length: complete.length,
            ratio_num_edge: step as f64 / complete.len() as f64,
            ratio_path_length: travelled / complete.length,
            refer_path_length: reference.length,
            ..Record::default()
        }
    }
}

/// Result of a single Euclidean evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct EuclideanStep {
    similar: bool,
    /// The lower bound, when one was evaluated.
    bound: Option<Bound>,
}

/// Whether the travelled prefix stays within δ of the reference in
/// Euclidean space: through the lower bound while the vehicle has not
/// reached the reference's end, exactly once it has.
///
/// `None` when the vehicle stands outside the safe area.
fn euclidean_step(
    context: &QueryContext,
    current: &CurrentPath,
    record: &mut Record,
) -> Result<Option<EuclideanStep>, PathError> {
    let delta = context.delta();
    let path = TraversingPath::seed(context, current);

    if path.frontier == context.reference().terminal() {
        let distance = path_distance(context, current.origin(), current.edges)?;
        record.num_dfd_cal += 1;

        return Ok(Some(EuclideanStep {
            similar: distance <= delta,
            bound: None,
        }));
    }

    let bound = euclidean_bound(
        context,
        current.origin(),
        current.edges,
        path.frontier,
        path.min_pos,
        path.max_pos,
    )?;

    Ok(bound.map(|bound| {
        record.num_dfd_cal += bound.evaluations;
        record.num_tem_discrete = bound.discretized;
        record.location_of_refer = Some(bound.position);

        EuclideanStep {
            similar: bound.within(delta),
            bound: Some(bound),
        }
    }))
}
