//! Integration tests for ww-graph.

use ww_core::Id;
use ww_graph::{Connection, GraphError, ModelGraph, Process, ProcessKind};

#[test]
fn duplicate_process_is_rejected() {
    let mut graph = ModelGraph::new();
    let id = Id::from_index(0);
    assert!(graph.add_process(Process::new(id, "Grit", ProcessKind::PassThrough)));
    assert!(!graph.add_process(Process::new(id, "Grit again", ProcessKind::CompleteMix)));

    assert_eq!(graph.process_count(), 1);
    assert_eq!(graph.get_process(id).unwrap().name(), "Grit");

    let err = graph
        .try_add_process(Process::new(id, "Grit", ProcessKind::PassThrough))
        .unwrap_err();
    assert_eq!(err, GraphError::DuplicateProcess { process: id });
}

#[test]
fn connection_to_unknown_process_is_rejected() {
    let mut graph = ModelGraph::new();
    let known = graph.create_process("Aeration", ProcessKind::CompleteMix).unwrap();
    let never_added = Id::from_index(42);

    assert!(!graph.add_connection(Connection::between(Id::from_index(0), known, never_added)));
    assert!(!graph.add_connection(Connection::influent(Id::from_index(1), never_added)));
    assert_eq!(graph.connection_count(), 0);

    let err = graph.connect(Some(never_added), Some(known)).unwrap_err();
    assert_eq!(err, GraphError::UnknownProcess { process: never_added });
    assert_eq!(graph.connection_count(), 0);
}

#[test]
fn duplicate_connection_is_rejected() {
    let mut graph = ModelGraph::new();
    let p = graph.create_process("Aeration", ProcessKind::CompleteMix).unwrap();
    let c = Id::from_index(3);
    assert!(graph.add_connection(Connection::influent(c, p)));
    assert!(!graph.add_connection(Connection::discharge(c, p)));
    assert_eq!(graph.connection_count(), 1);
    assert!(graph.get_connection(c).unwrap().is_influent());
}

#[test]
fn remove_then_re_add_connection() {
    let mut graph = ModelGraph::new();
    let a = graph.create_process("A", ProcessKind::CompleteMix).unwrap();
    let b = graph.create_process("B", ProcessKind::CompleteMix).unwrap();
    let id = graph.connect(Some(a), Some(b)).unwrap();

    let removed = graph.remove_connection(id).unwrap();
    assert_eq!(removed.upstream, Some(a));
    assert!(graph.get_connection(id).is_none());
    assert!(graph.remove_connection(id).is_none());

    assert!(graph.add_connection(Connection::between(id, b, a)));
    assert_eq!(graph.get_connection(id).unwrap().upstream, Some(b));
    assert!(graph.validate().is_ok());
}

#[test]
fn process_removal_rejected_while_referenced() {
    let mut graph = ModelGraph::new();
    let a = graph.create_process("A", ProcessKind::CompleteMix).unwrap();
    let b = graph.create_process("B", ProcessKind::CompleteMix).unwrap();
    let ab = graph.connect(Some(a), Some(b)).unwrap();

    let err = graph.try_remove_process(a).unwrap_err();
    assert_eq!(
        err,
        GraphError::ProcessInUse {
            process: a,
            connections: vec![ab]
        }
    );
    assert!(graph.remove_process(a).is_none());
    assert_eq!(graph.process_count(), 2);

    graph.remove_connection(ab).unwrap();
    let removed = graph.remove_process(a).unwrap();
    assert_eq!(removed.name(), "A");
    assert_eq!(graph.process_count(), 1);
    assert!(graph.validate().is_ok());

    // Ids are never reused
    let c = graph.create_process("C", ProcessKind::CompleteMix).unwrap();
    assert_ne!(c, a);
    assert_eq!(c.index(), 2);
}

#[test]
fn traversal_is_ordered_by_id() {
    let mut graph = ModelGraph::new();
    let mix = graph.create_process("Mix", ProcessKind::CompleteMix).unwrap();
    let split = graph
        .create_process(
            "Split",
            ProcessKind::FlowSplit {
                fractions: vec![0.5, 0.5],
            },
        )
        .unwrap();
    let inf = graph.connect(None, Some(mix)).unwrap();
    let to_split = graph.connect(Some(mix), Some(split)).unwrap();
    let out_a = graph.connect(Some(split), None).unwrap();
    let out_b = graph.connect(Some(split), None).unwrap();

    assert_eq!(graph.inbound(mix), vec![inf]);
    assert_eq!(graph.outbound(mix), vec![to_split]);
    assert_eq!(graph.inbound(split), vec![to_split]);
    assert_eq!(graph.outbound(split), vec![out_a, out_b]);
    assert_eq!(graph.influents(), vec![inf]);
    assert_eq!(graph.discharges(), vec![out_a, out_b]);

    let names: Vec<&str> = graph.processes().map(|p| p.name()).collect();
    assert_eq!(names, vec!["Mix", "Split"]);
}

#[test]
fn recycle_detection() {
    let mut graph = ModelGraph::new();
    let basin = graph.create_process("Basin", ProcessKind::CompleteMix).unwrap();
    let clarifier = graph
        .create_process(
            "Clarifier",
            ProcessKind::SolidsSeparator {
                underflow_fraction: 0.2,
                capture: 0.95,
            },
        )
        .unwrap();
    graph.connect(None, Some(basin)).unwrap();
    graph.connect(Some(basin), Some(clarifier)).unwrap();
    graph.connect(Some(clarifier), None).unwrap();
    assert!(!graph.has_cycle());
    assert!(graph.recycle_groups().is_empty());

    let ras = graph.connect(Some(clarifier), Some(basin)).unwrap();
    assert!(graph.has_cycle());
    assert_eq!(graph.recycle_groups(), vec![vec![basin, clarifier]]);

    graph.remove_connection(ras).unwrap();
    assert!(!graph.has_cycle());
}

#[test]
fn rename_and_swap_strategy() {
    let mut graph = ModelGraph::new();
    let p = graph.create_process("Tank", ProcessKind::CompleteMix).unwrap();
    let process = graph.process_mut(p).unwrap();
    process.set_name("Equalization tank");
    process.set_kind(ProcessKind::custom("equalization"));

    let process = graph.get_process(p).unwrap();
    assert_eq!(process.name(), "Equalization tank");
    assert_eq!(process.kind().tag(), "equalization");
}
