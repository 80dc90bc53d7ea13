use crate::config::{QueryConfig, QueryMode};
use crate::error::{Error, QueryError};
use crate::query::*;
use crate::test_utils::{grid, walk};

use approx::assert_relative_eq;
use std::time::Duration;
use strum::IntoEnumIterator;

fn config(delta: f64) -> QueryConfig {
    QueryConfig::default()
        .with_delta(delta)
        .with_section_length(10.0)
}

#[test_log::test]
fn identical_route_is_similar_in_every_mode() {
    let graph = grid(5, 2, 38.0);
    let reference = walk(&graph, &[0, 1, 2, 3, 4]);

    for mode in QueryMode::iter() {
        let session = Session::new(&graph, config(45.0).with_mode(mode)).expect("configuration is valid");
        let report = session.run(&reference, &reference).expect("inputs are well formed");

        assert_eq!(report.mode, mode);
        assert_eq!(report.verdict, Verdict::Similar, "{mode} diverged");
        assert!(report.rejected.is_empty());

        let steps = if mode == QueryMode::EuclideanSimple { 4 } else { 3 };
        assert_eq!(report.records.len(), steps, "{mode} recorded the wrong steps");
        assert_eq!(report.state.is_some(), mode == QueryMode::RoadContinuous);
    }
}

#[test]
fn records_describe_the_step() {
    let graph = grid(5, 2, 38.0);
    let reference = walk(&graph, &[0, 1, 2, 3, 4]);
    let session = Session::new(&graph, config(45.0)).expect("configuration is valid");

    let report = session
        .euclidean_simple(&reference, &reference)
        .expect("inputs are well formed");

    let record = &report.records[1];
    assert_eq!(record.com_path_size, 4);
    assert_eq!(record.refer_path_size, 4);
    assert_eq!(record.num_refer_discrete, 17);
    assert_relative_eq!(record.ratio_num_edge, 0.5);
    assert_relative_eq!(record.curr_path_length, 76.0, epsilon = 1e-6);
    assert_relative_eq!(record.com_path_length, 152.0, epsilon = 1e-6);
    assert_relative_eq!(record.ratio_path_length, 0.5, epsilon = 1e-9);
    assert_relative_eq!(record.refer_path_length, 152.0, epsilon = 1e-6);
    assert_eq!(record.location_of_refer, Some(8));
    assert!(record.num_dfd_cal >= 1);
    assert_eq!(record.num_tem_discrete, 9);

    // The final step reaches the reference's end and is measured exactly.
    let last = &report.records[3];
    assert_eq!(last.location_of_refer, None);
    assert_eq!(last.num_dfd_cal, 1);
}

/// A route that climbs two rows away from the bottom-row reference
/// before coming back to its end.
fn wandering() -> (crate::graph::Graph, Vec<i64>) {
    (grid(5, 3, 38.0), vec![0, 5, 10, 11, 12, 13, 14, 9, 4])
}

#[test_log::test]
fn euclidean_queries_stop_at_the_first_divergence() {
    let (graph, ids) = wandering();
    let reference = walk(&graph, &[0, 1, 2, 3, 4]);
    let complete = walk(&graph, &ids);
    let session = Session::new(&graph, config(45.0)).expect("configuration is valid");

    let report = session
        .euclidean_simple(&reference, &complete)
        .expect("inputs are well formed");
    assert_eq!(report.verdict, Verdict::Diverged { step: 2 });
    assert_eq!(report.records.len(), 2);

    let report = session
        .euclidean_continuous(&reference, &complete)
        .expect("inputs are well formed");
    assert_eq!(report.verdict, Verdict::Diverged { step: 2 });
    assert_eq!(report.rejected, vec![2]);
}

#[test]
fn euclidean_continuous_skips_covered_steps() {
    let graph = grid(5, 2, 38.0);
    let reference = walk(&graph, &[0, 1, 2, 3, 4]);
    let session = Session::new(&graph, config(45.0)).expect("configuration is valid");

    let report = session
        .euclidean_continuous(&reference, &reference)
        .expect("inputs are well formed");

    // Vertex 1 is covered by the first reference point, vertex 2 needs a
    // bound which moves the cursor onto it, covering vertex 3.
    let evaluated = report
        .records
        .iter()
        .map(|record| record.num_dfd_cal > 0)
        .collect::<Vec<_>>();
    assert_eq!(evaluated, vec![false, true, false]);
    assert_eq!(report.records[1].euc_con_query_pos, 0);
    assert_eq!(report.records[1].location_of_refer, Some(8));

    // Evaluated steps are timed like in every other mode.
    assert!(report.records[1].run_time > 0.0);
    assert!(report.records.iter().all(|record| record.run_time >= 0.0));
    let spent = report.records.iter().map(|record| record.run_time).sum::<f64>();
    assert!(spent <= report.run_time.as_secs_f64());
}

#[test_log::test]
fn road_simple_carries_on_after_rejection() {
    let (graph, ids) = wandering();
    let reference = walk(&graph, &[0, 1, 2, 3, 4]);
    let complete = walk(&graph, &ids);
    let session = Session::new(&graph, config(45.0)).expect("configuration is valid");

    let report = session.road_simple(&reference, &complete).expect("inputs are well formed");

    assert_eq!(report.verdict, Verdict::Diverged { step: 2 });
    assert_eq!(report.rejected, vec![2, 3, 4, 5, 6, 7]);
    assert_eq!(report.records.len(), 7);
    assert!(report.records.iter().all(|record| record.num_of_out_pri_queue > 0 || record.num_dfd_cal > 0));
}

#[test_log::test]
fn road_continuous_reuses_detours() {
    let graph = grid(5, 2, 38.0);
    let reference = walk(&graph, &[0, 1, 2, 3, 4]);
    let complete = walk(&graph, &[0, 1, 6, 7, 2, 3, 4]);
    let session = Session::new(&graph, config(45.0)).expect("configuration is valid");

    let report = session
        .road_continuous(&reference, &complete)
        .expect("inputs are well formed");

    assert_eq!(report.verdict, Verdict::Similar);
    assert_eq!(report.records.len(), 5);
    assert!(report.records.iter().all(|record| record.num_of_out_pri_queue == 0));

    let state = report.state.expect("road continuous rounds keep their state");
    assert_eq!(state.last_path, complete.edges);
    assert_relative_eq!(state.bound_distance, 38.0, epsilon = 1e-6);
}

#[test]
fn road_continuous_ends_at_divergence() {
    let (graph, ids) = wandering();
    let reference = walk(&graph, &[0, 1, 2, 3, 4]);
    let complete = walk(&graph, &ids);
    let session = Session::new(&graph, config(45.0)).expect("configuration is valid");

    let report = session
        .road_continuous(&reference, &complete)
        .expect("inputs are well formed");

    assert_eq!(report.verdict, Verdict::Diverged { step: 2 });
    assert_eq!(report.records.len(), 2);
}

#[test]
fn timeouts_are_indeterminate() {
    let (graph, ids) = wandering();
    let reference = walk(&graph, &[0, 1, 2, 3, 4]);
    let complete = walk(&graph, &ids);
    let session =
        Session::new(&graph, config(45.0).with_timeout(Duration::ZERO)).expect("configuration is valid");

    let report = session.road_simple(&reference, &complete).expect("inputs are well formed");
    let Verdict::Indeterminate { step, .. } = report.verdict else {
        panic!("expected a timeout, got {:?}", report.verdict);
    };
    assert_eq!(step, 2);
    assert_eq!(report.records.len(), 1);
    assert!(matches!(report.conclusive(), Err(QueryError::Timeout { .. })));
}

#[test]
fn rejects_invalid_configuration() {
    let graph = grid(2, 1, 38.0);
    let result = Session::new(&graph, config(-1.0));
    assert!(matches!(result, Err(Error::Config(_))));
}
