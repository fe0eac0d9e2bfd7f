//! Graph-specific error types.

use ww_core::{ConnectionId, ProcessId, WwError};

pub type GraphResult<T> = Result<T, GraphError>;

/// Structural faults raised by graph mutation and validation.
///
/// A mutation that fails leaves the graph unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A process with this ID is already registered.
    DuplicateProcess { process: ProcessId },

    /// A connection with this ID is already registered.
    DuplicateConnection { connection: ConnectionId },

    /// A connection endpoint refers to a process that doesn't exist.
    UnknownProcess { process: ProcessId },

    /// Lookup of a connection that doesn't exist.
    UnknownConnection { connection: ConnectionId },

    /// A connection has neither an upstream nor a downstream process.
    /// `None` when the connection had no id yet (factory creation).
    DetachedConnection { connection: Option<ConnectionId> },

    /// A process can't be removed while connections still reference it.
    ProcessInUse {
        process: ProcessId,
        connections: Vec<ConnectionId>,
    },

    /// Every id of this kind has been handed out.
    IdsExhausted { what: &'static str },

    /// Topology index disagrees with the connection table.
    InconsistentAdjacency { connection: ConnectionId },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::DuplicateProcess { process } => {
                write!(f, "Process {} already exists", process)
            }
            GraphError::DuplicateConnection { connection } => {
                write!(f, "Connection {} already exists", connection)
            }
            GraphError::UnknownProcess { process } => {
                write!(f, "Process {} does not exist", process)
            }
            GraphError::UnknownConnection { connection } => {
                write!(f, "Connection {} does not exist", connection)
            }
            GraphError::DetachedConnection { connection } => match connection {
                Some(id) => write!(
                    f,
                    "Connection {} has neither an upstream nor a downstream process",
                    id
                ),
                None => write!(f, "Connection has neither an upstream nor a downstream process"),
            },
            GraphError::ProcessInUse {
                process,
                connections,
            } => {
                write!(
                    f,
                    "Process {} is still referenced by {} connection(s)",
                    process,
                    connections.len()
                )
            }
            GraphError::IdsExhausted { what } => write!(f, "No {} ids left", what),
            GraphError::InconsistentAdjacency { connection } => {
                write!(
                    f,
                    "Connection {} is inconsistent with the topology index",
                    connection
                )
            }
        }
    }
}

impl std::error::Error for GraphError {}

impl From<GraphError> for WwError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::InconsistentAdjacency { .. } => WwError::Invariant {
                what: err.to_string(),
            },
            _ => WwError::InvalidModel {
                what: err.to_string(),
            },
        }
    }
}
