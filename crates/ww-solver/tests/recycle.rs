//! Recycle loops: solved simultaneously, singular loops reported.

use std::collections::BTreeMap;

use proptest::prelude::*;
use ww_core::ConnectionId;
use ww_graph::{ModelGraph, ProcessKind};
use ww_loads::{BaseParameter, Load};
use ww_solver::{Boundary, NetworkSolution, SolveStage, SolverConfig, SolverError, solve_network};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn close(actual: f64, expected: f64, rel: f64) -> bool {
    (actual - expected).abs() <= rel * expected.abs().max(1.0)
}

fn raw_sewage() -> Load {
    Load::empty()
        .with_vol_ss(120.0)
        .with_inert_ss(40.0)
        .with_sol_bod(90.0)
        .with_part_bod(60.0)
        .with_amm_n(25.0)
        .with_sol_org_n(5.0)
        .with_part_org_n(8.0)
        .with_sol_org_p(1.5)
        .with_part_org_p(2.0)
        .with_chem_p(0.5)
        .with_ort_p(3.0)
        .with_alk(200.0)
}

struct Loop {
    influent: ConnectionId,
    forward: ConnectionId,
    effluent: ConnectionId,
    recycle: ConnectionId,
}

/// Basin -> second process, whose first outflow leaves the plant and second
/// returns to the basin.
fn recycle_loop(graph: &mut ModelGraph, second: ProcessKind) -> Loop {
    let basin = graph.create_process("Basin", ProcessKind::CompleteMix).unwrap();
    let other = graph.create_process("Return", second).unwrap();
    Loop {
        influent: graph.connect(None, Some(basin)).unwrap(),
        forward: graph.connect(Some(basin), Some(other)).unwrap(),
        effluent: graph.connect(Some(other), None).unwrap(),
        recycle: graph.connect(Some(other), Some(basin)).unwrap(),
    }
}

fn solve(graph: &ModelGraph, influent: ConnectionId, flow: f64, load: Load) -> NetworkSolution {
    let boundaries = BTreeMap::from([(influent, Boundary::new(flow, load))]);
    solve_network(graph, &boundaries, &SolverConfig::default()).unwrap()
}

#[test]
fn clarifier_recycle() {
    init_tracing();
    let mut graph = ModelGraph::new();
    let ids = recycle_loop(
        &mut graph,
        ProcessKind::SolidsSeparator {
            underflow_fraction: 0.2,
            capture: 0.9,
        },
    );
    let influent = raw_sewage();
    let solution = solve(&graph, ids.influent, 10.0, influent);
    assert!(solution.has_recycle());
    assert_eq!(solution.recycle_groups().len(), 1);

    assert!(close(solution.flow(ids.forward).unwrap(), 12.5, 1e-9));
    assert!(close(solution.flow(ids.recycle).unwrap(), 2.5, 1e-9));
    assert!(close(solution.flow(ids.effluent).unwrap(), 10.0, 1e-9));

    let effluent = solution.load(ids.effluent).unwrap();
    let ras = solution.load(ids.recycle).unwrap();
    for bp in BaseParameter::ALL {
        // At steady state everything that enters leaves through the effluent
        assert!(
            close(effluent[bp], influent[bp], 1e-9),
            "{bp}: {} vs {}",
            effluent[bp],
            influent[bp]
        );
        let expected = if bp.is_particulate() {
            36.0 * influent[bp]
        } else {
            influent[bp]
        };
        assert!(close(ras[bp], expected, 1e-9), "{bp}: {} vs {expected}", ras[bp]);
    }
}

#[test]
fn splitter_recycle() {
    init_tracing();
    let mut graph = ModelGraph::new();
    let ids = recycle_loop(
        &mut graph,
        ProcessKind::FlowSplit {
            fractions: vec![0.8, 0.2],
        },
    );
    let influent = raw_sewage();
    let solution = solve(&graph, ids.influent, 10.0, influent);

    assert!(close(solution.flow(ids.forward).unwrap(), 12.5, 1e-9));
    assert!(close(solution.flow(ids.recycle).unwrap(), 2.5, 1e-9));
    for id in [ids.forward, ids.effluent, ids.recycle] {
        let load = solution.load(id).unwrap();
        for bp in BaseParameter::ALL {
            assert!(close(load[bp], influent[bp], 1e-9));
        }
    }
}

#[test]
fn closed_hydraulic_loop_is_singular() {
    init_tracing();
    let mut graph = ModelGraph::new();
    let basin = graph.create_process("Basin", ProcessKind::CompleteMix).unwrap();
    let pump = graph.create_process("Pump", ProcessKind::PassThrough).unwrap();
    let influent = graph.connect(None, Some(basin)).unwrap();
    graph.connect(Some(basin), Some(pump)).unwrap();
    graph.connect(Some(pump), Some(basin)).unwrap();

    let boundaries = BTreeMap::from([(influent, Boundary::new(10.0, raw_sewage()))]);
    let err = solve_network(&graph, &boundaries, &SolverConfig::default()).unwrap_err();
    assert!(
        matches!(
            err,
            SolverError::Numerical {
                stage: SolveStage::Hydraulics,
                ..
            }
        ),
        "got {err}"
    );
    assert!(!err.is_modeling_fault());
}

#[test]
fn dry_loop_is_singular_in_process_stage() {
    init_tracing();
    let mut graph = ModelGraph::new();
    let basin = graph.create_process("Basin", ProcessKind::CompleteMix).unwrap();
    let split = graph
        .create_process(
            "Splitter",
            ProcessKind::FlowSplit {
                fractions: vec![0.5, 0.5],
            },
        )
        .unwrap();
    graph.connect(Some(basin), Some(split)).unwrap();
    graph.connect(Some(split), Some(basin)).unwrap();
    graph.connect(Some(split), None).unwrap();

    let err = solve_network(&graph, &BTreeMap::new(), &SolverConfig::default()).unwrap_err();
    assert!(
        matches!(
            err,
            SolverError::Numerical {
                stage: SolveStage::Process,
                ..
            }
        ),
        "got {err}"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn recycle_conserves_mass(
        flow in 1.0f64..1000.0,
        underflow in 0.05f64..0.95,
        capture in 0.05f64..0.95,
        vss in 1.0f64..500.0,
        amm in 0.5f64..60.0,
    ) {
        let mut graph = ModelGraph::new();
        let ids = recycle_loop(
            &mut graph,
            ProcessKind::SolidsSeparator { underflow_fraction: underflow, capture },
        );
        let influent = raw_sewage().with_vol_ss(vss).with_amm_n(amm);
        let solution = solve(&graph, ids.influent, flow, influent);

        let entering = influent * flow;
        let leaving = solution.mass_loading(ids.effluent).unwrap();
        for bp in BaseParameter::ALL {
            prop_assert!(close(leaving[bp], entering[bp], 1e-6), "{}: {} vs {}", bp, leaving[bp], entering[bp]);
        }
        prop_assert!(close(solution.flow(ids.forward).unwrap(), flow / (1.0 - underflow), 1e-9));
    }
}
