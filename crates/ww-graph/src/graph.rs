//! Core graph data structures.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use ww_core::{ConnectionId, IdAllocator, ProcessId};

use crate::error::{GraphError, GraphResult};
use crate::kind::ProcessKind;
use crate::validate;

/// A unit operation in the treatment network (screening, aeration basin,
/// clarifier, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    id: ProcessId,
    name: String,
    kind: ProcessKind,
}

impl Process {
    pub fn new(id: ProcessId, name: impl Into<String>, kind: ProcessKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn kind(&self) -> &ProcessKind {
        &self.kind
    }

    pub fn set_kind(&mut self, kind: ProcessKind) {
        self.kind = kind;
    }
}

/// A directed flow stream.
///
/// `upstream: None` marks a plant influent whose flow and load are supplied
/// by the caller; `downstream: None` marks a discharge leaving the plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub upstream: Option<ProcessId>,
    pub downstream: Option<ProcessId>,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        upstream: Option<ProcessId>,
        downstream: Option<ProcessId>,
    ) -> Self {
        Self {
            id,
            upstream,
            downstream,
        }
    }

    /// A stream entering the plant at `downstream`.
    pub fn influent(id: ConnectionId, downstream: ProcessId) -> Self {
        Self::new(id, None, Some(downstream))
    }

    /// A stream leaving the plant from `upstream`.
    pub fn discharge(id: ConnectionId, upstream: ProcessId) -> Self {
        Self::new(id, Some(upstream), None)
    }

    /// Connection between two processes.
    pub fn between(id: ConnectionId, upstream: ProcessId, downstream: ProcessId) -> Self {
        Self::new(id, Some(upstream), Some(downstream))
    }

    pub fn is_influent(&self) -> bool {
        self.upstream.is_none()
    }

    pub fn is_discharge(&self) -> bool {
        self.downstream.is_none()
    }

    pub fn touches(&self, process: ProcessId) -> bool {
        self.upstream == Some(process) || self.downstream == Some(process)
    }
}

/// The process network.
///
/// Processes and connections live in id-keyed maps (connections hold process
/// ids, never the processes themselves). Iteration is in ascending id order,
/// which makes everything built on top of it deterministic.
///
/// Process-to-process connections are mirrored into a petgraph topology used
/// for traversal and cycle detection. Connections crossing the plant boundary
/// have no edge and are indexed separately.
#[derive(Debug, Clone, Default)]
pub struct ModelGraph {
    pub(crate) processes: BTreeMap<ProcessId, Process>,
    pub(crate) connections: BTreeMap<ConnectionId, Connection>,

    pub(crate) topology: StableDiGraph<ProcessId, ConnectionId>,
    pub(crate) nodes: HashMap<ProcessId, NodeIndex>,
    pub(crate) edges: HashMap<ConnectionId, EdgeIndex>,
    pub(crate) boundary: BTreeSet<ConnectionId>,

    process_ids: IdAllocator,
    connection_ids: IdAllocator,
}

impl ModelGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // Processes

    /// Create a process with a freshly allocated id.
    ///
    /// Fails with [`GraphError::IdsExhausted`] once an id at the top of the
    /// range has been used, whether allocated here or inserted by the caller.
    pub fn create_process(
        &mut self,
        name: impl Into<String>,
        kind: ProcessKind,
    ) -> GraphResult<ProcessId> {
        let id = self
            .process_ids
            .next_id()
            .ok_or(GraphError::IdsExhausted { what: "process" })?;
        if self.processes.contains_key(&id) {
            return Err(GraphError::DuplicateProcess { process: id });
        }
        self.insert_process(Process::new(id, name, kind));
        Ok(id)
    }

    /// Insert a process, rejecting duplicate ids.
    pub fn try_add_process(&mut self, process: Process) -> GraphResult<()> {
        if self.processes.contains_key(&process.id) {
            return Err(GraphError::DuplicateProcess {
                process: process.id,
            });
        }
        self.process_ids.observe(process.id);
        self.insert_process(process);
        Ok(())
    }

    /// Insert a process. Returns `false` (and changes nothing) if the id exists.
    pub fn add_process(&mut self, process: Process) -> bool {
        self.try_add_process(process).is_ok()
    }

    pub fn get_process(&self, id: ProcessId) -> Option<&Process> {
        self.processes.get(&id)
    }

    /// Mutable access for renaming or swapping the strategy.
    pub fn process_mut(&mut self, id: ProcessId) -> Option<&mut Process> {
        self.processes.get_mut(&id)
    }

    pub fn contains_process(&self, id: ProcessId) -> bool {
        self.processes.contains_key(&id)
    }

    /// Remove a process.
    ///
    /// Rejected with [`GraphError::ProcessInUse`] while any connection still
    /// references it; remove those connections first.
    pub fn try_remove_process(&mut self, id: ProcessId) -> GraphResult<Process> {
        if !self.processes.contains_key(&id) {
            return Err(GraphError::UnknownProcess { process: id });
        }
        let referencing: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.touches(id))
            .map(|c| c.id)
            .collect();
        if !referencing.is_empty() {
            return Err(GraphError::ProcessInUse {
                process: id,
                connections: referencing,
            });
        }

        if let Some(node) = self.nodes.remove(&id) {
            self.topology.remove_node(node);
        }
        self.processes
            .remove(&id)
            .ok_or(GraphError::UnknownProcess { process: id })
    }

    /// Remove a process; `None` if it is absent or still referenced.
    pub fn remove_process(&mut self, id: ProcessId) -> Option<Process> {
        self.try_remove_process(id).ok()
    }

    // Connections

    /// Create a connection with a freshly allocated id.
    pub fn connect(
        &mut self,
        upstream: Option<ProcessId>,
        downstream: Option<ProcessId>,
    ) -> GraphResult<ConnectionId> {
        self.check_endpoints(upstream, downstream, None)?;
        let id = self
            .connection_ids
            .next_id()
            .ok_or(GraphError::IdsExhausted { what: "connection" })?;
        if self.connections.contains_key(&id) {
            return Err(GraphError::DuplicateConnection { connection: id });
        }
        self.insert_connection(Connection::new(id, upstream, downstream));
        Ok(id)
    }

    /// Insert a connection, rejecting duplicate ids and unknown endpoints.
    pub fn try_add_connection(&mut self, connection: Connection) -> GraphResult<()> {
        if self.connections.contains_key(&connection.id) {
            return Err(GraphError::DuplicateConnection {
                connection: connection.id,
            });
        }
        self.check_endpoints(
            connection.upstream,
            connection.downstream,
            Some(connection.id),
        )?;
        self.connection_ids.observe(connection.id);
        self.insert_connection(connection);
        Ok(())
    }

    /// Insert a connection. Returns `false` (and changes nothing) on a
    /// duplicate id or an endpoint that isn't a registered process.
    pub fn add_connection(&mut self, connection: Connection) -> bool {
        self.try_add_connection(connection).is_ok()
    }

    pub fn get_connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn try_remove_connection(&mut self, id: ConnectionId) -> GraphResult<Connection> {
        let connection = self
            .connections
            .remove(&id)
            .ok_or(GraphError::UnknownConnection { connection: id })?;
        if let Some(edge) = self.edges.remove(&id) {
            self.topology.remove_edge(edge);
        }
        self.boundary.remove(&id);
        Ok(connection)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        self.try_remove_connection(id).ok()
    }

    // Queries

    /// All processes in ascending id order.
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// All connections in ascending id order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections flowing into `process`, ascending by id.
    pub fn inbound(&self, process: ProcessId) -> Vec<ConnectionId> {
        self.adjacent(process, Direction::Incoming, |c| c.downstream)
    }

    /// Connections flowing out of `process`, ascending by id.
    pub fn outbound(&self, process: ProcessId) -> Vec<ConnectionId> {
        self.adjacent(process, Direction::Outgoing, |c| c.upstream)
    }

    /// Plant influents (connections with no upstream process).
    pub fn influents(&self) -> Vec<ConnectionId> {
        self.boundary_where(Connection::is_influent)
    }

    /// Plant discharges (connections with no downstream process).
    pub fn discharges(&self) -> Vec<ConnectionId> {
        self.boundary_where(Connection::is_discharge)
    }

    /// Whether any recycle stream closes a loop between processes.
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.topology)
    }

    /// Groups of processes tied together by recycle streams.
    ///
    /// Each group is sorted by id and the groups are sorted by their first
    /// member. A single process only forms a group when it feeds itself.
    pub fn recycle_groups(&self) -> Vec<Vec<ProcessId>> {
        let mut groups: Vec<Vec<ProcessId>> = tarjan_scc(&self.topology)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1
                    || scc
                        .first()
                        .is_some_and(|&n| self.topology.find_edge(n, n).is_some())
            })
            .map(|scc| {
                let mut ids: Vec<ProcessId> = scc
                    .into_iter()
                    .filter_map(|n| self.topology.node_weight(n).copied())
                    .collect();
                ids.sort();
                ids
            })
            .collect();
        groups.sort();
        groups
    }

    /// Check that the topology index agrees with the connection table.
    pub fn validate(&self) -> GraphResult<()> {
        validate::validate_structure(self)
    }

    fn insert_process(&mut self, process: Process) {
        let node = self.topology.add_node(process.id);
        self.nodes.insert(process.id, node);
        self.processes.insert(process.id, process);
    }

    fn insert_connection(&mut self, connection: Connection) {
        match (connection.upstream, connection.downstream) {
            (Some(up), Some(down)) => {
                if let (Some(&a), Some(&b)) = (self.nodes.get(&up), self.nodes.get(&down)) {
                    let edge = self.topology.add_edge(a, b, connection.id);
                    self.edges.insert(connection.id, edge);
                }
            }
            _ => {
                self.boundary.insert(connection.id);
            }
        }
        self.connections.insert(connection.id, connection);
    }

    /// Internal connections from the topology plus boundary connections whose
    /// `end` is `process`, merged in id order.
    fn adjacent(
        &self,
        process: ProcessId,
        direction: Direction,
        end: impl Fn(&Connection) -> Option<ProcessId>,
    ) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .nodes
            .get(&process)
            .into_iter()
            .flat_map(|&node| self.topology.edges_directed(node, direction))
            .map(|edge| *edge.weight())
            .collect();
        ids.extend(self.boundary_where(|c| end(c) == Some(process)));
        ids.sort_unstable();
        ids
    }

    fn boundary_where(&self, keep: impl Fn(&Connection) -> bool) -> Vec<ConnectionId> {
        self.boundary
            .iter()
            .filter_map(|id| self.connections.get(id))
            .filter(|c| keep(*c))
            .map(|c| c.id)
            .collect()
    }

    fn check_endpoints(
        &self,
        upstream: Option<ProcessId>,
        downstream: Option<ProcessId>,
        id: Option<ConnectionId>,
    ) -> GraphResult<()> {
        if upstream.is_none() && downstream.is_none() {
            return Err(GraphError::DetachedConnection { connection: id });
        }
        for process in [upstream, downstream].into_iter().flatten() {
            if !self.processes.contains_key(&process) {
                return Err(GraphError::UnknownProcess { process });
            }
        }
        Ok(())
    }
}
