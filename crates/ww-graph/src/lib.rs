//! ww-graph: process network model for the wastewater solver.
//!
//! Provides:
//! - Core entities (Process, Connection, ProcessKind)
//! - `ModelGraph`: owned, id-keyed collections with add/remove/lookup
//! - Traversal helpers and recycle (cycle) detection
//!
//! # Example
//!
//! ```
//! use ww_graph::{ModelGraph, ProcessKind};
//!
//! let mut graph = ModelGraph::new();
//! let mix = graph.create_process("Headworks", ProcessKind::CompleteMix).unwrap();
//! let influent = graph.connect(None, Some(mix)).unwrap();
//! let effluent = graph.connect(Some(mix), None).unwrap();
//!
//! assert_eq!(graph.process_count(), 1);
//! assert_eq!(graph.inbound(mix), vec![influent]);
//! assert_eq!(graph.outbound(mix), vec![effluent]);
//! assert!(!graph.has_cycle());
//! ```

pub mod error;
pub mod graph;
pub mod kind;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use error::{GraphError, GraphResult};
pub use graph::{Connection, ModelGraph, Process};
pub use kind::ProcessKind;
