//! Solve a whole process network.
//!
//! The driver walks the graph once: influents and every process's outbound
//! connections get a stream block, each process gets a router from the
//! registry, boundaries pin the influents, and the assembled system is solved
//! in one shot. Recycle loops need no special handling.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};
use ww_core::{ConnectionId, ProcessId};
use ww_graph::{GraphError, ModelGraph};
use ww_loads::{BaseParameter, Load};

use crate::error::{SolverError, SolverResult};
use crate::expr::{Definition, FlowDefinition};
use crate::handle::RouterHandle;
use crate::router::{Ports, RouteContext, Router, RouterRegistry};
use crate::system::{LinearSystem, SolverConfig};

/// Flow and composition fixed on an influent connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub flow: f64,
    pub load: Load,
}

impl Boundary {
    pub fn new(flow: f64, load: Load) -> Self {
        Self { flow, load }
    }

    fn check(&self, connection: ConnectionId) -> SolverResult<()> {
        if !(self.flow.is_finite() && self.flow >= 0.0) {
            return Err(SolverError::InvalidBoundary {
                connection,
                what: format!("flow {} must be finite and non-negative", self.flow),
            });
        }
        if let Some((bp, v)) = self.load.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SolverError::InvalidBoundary {
                connection,
                what: format!("{bp} is {v}"),
            });
        }
        Ok(())
    }
}

/// Solved state of one connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamResult {
    pub connection: ConnectionId,
    pub upstream: Option<ProcessId>,
    pub downstream: Option<ProcessId>,
    pub flow: f64,
    /// Concentrations
    pub load: Load,
}

impl StreamResult {
    /// Mass rate of every constituent: concentration times flow.
    pub fn mass_loading(&self) -> Load {
        self.load * self.flow
    }
}

/// Per-connection results of a network solve.
#[derive(Debug, Clone)]
pub struct NetworkSolution {
    streams: BTreeMap<ConnectionId, StreamResult>,
    recycle_groups: Vec<Vec<ProcessId>>,
}

impl NetworkSolution {
    pub fn stream(&self, connection: ConnectionId) -> Option<&StreamResult> {
        self.streams.get(&connection)
    }

    pub fn flow(&self, connection: ConnectionId) -> Option<f64> {
        self.stream(connection).map(|s| s.flow)
    }

    pub fn load(&self, connection: ConnectionId) -> Option<Load> {
        self.stream(connection).map(|s| s.load)
    }

    pub fn mass_loading(&self, connection: ConnectionId) -> Option<Load> {
        self.stream(connection).map(StreamResult::mass_loading)
    }

    /// Results in ascending connection-id order.
    pub fn streams(&self) -> impl Iterator<Item = &StreamResult> {
        self.streams.values()
    }

    pub fn has_recycle(&self) -> bool {
        !self.recycle_groups.is_empty()
    }

    /// Processes joined by recycle loops, one group per loop system.
    pub fn recycle_groups(&self) -> &[Vec<ProcessId>] {
        &self.recycle_groups
    }
}

struct Plan {
    process: ProcessId,
    router: Box<dyn Router>,
    inbound: Vec<ConnectionId>,
    outbound: Vec<ConnectionId>,
}

/// Network solver with a strategy registry and assembler configuration.
#[derive(Debug, Clone, Default)]
pub struct NetworkSolver {
    registry: RouterRegistry,
    config: SolverConfig,
}

impl NetworkSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            registry: RouterRegistry::with_builtins(),
            config,
        }
    }

    pub fn with_registry(registry: RouterRegistry, config: SolverConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &RouterRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RouterRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve `graph` with a boundary on every influent connection.
    pub fn solve(
        &self,
        graph: &ModelGraph,
        boundaries: &BTreeMap<ConnectionId, Boundary>,
    ) -> SolverResult<NetworkSolution> {
        graph.validate()?;
        let influents = graph.influents();
        check_boundaries(graph, &influents, boundaries)?;

        debug!(
            processes = graph.process_count(),
            connections = graph.connection_count(),
            influents = influents.len(),
            "assembling network"
        );

        let mut system = LinearSystem::new(self.config.clone());
        let mut handles: BTreeMap<ConnectionId, RouterHandle> = BTreeMap::new();
        for id in &influents {
            handles.insert(*id, system.register_effluent()?);
        }

        let mut plans = Vec::with_capacity(graph.process_count());
        for process in graph.processes() {
            let inbound = graph.inbound(process.id());
            let outbound = graph.outbound(process.id());
            let ports = Ports {
                process: process.id(),
                inflows: inbound.len(),
                outflows: outbound.len(),
            };
            let router = self
                .registry
                .create(process.kind(), &ports)
                .inspect_err(|e| {
                    warn!(process = %process.id(), name = process.name(), error = %e, "router rejected")
                })?;
            for id in &outbound {
                handles.insert(*id, system.register_effluent()?);
            }
            plans.push(Plan {
                process: process.id(),
                router,
                inbound,
                outbound,
            });
        }

        let lookup = |ids: &[ConnectionId]| -> SolverResult<Vec<RouterHandle>> {
            ids.iter()
                .map(|id| {
                    handles
                        .get(id)
                        .copied()
                        .ok_or(SolverError::Graph(GraphError::UnknownConnection { connection: *id }))
                })
                .collect()
        };
        let mut ports = Vec::with_capacity(plans.len());
        for plan in &plans {
            ports.push((lookup(&plan.inbound)?, lookup(&plan.outbound)?));
        }

        for id in &influents {
            let (handle, boundary) = match (handles.get(id), boundaries.get(id)) {
                (Some(h), Some(b)) => (h, b),
                _ => return Err(SolverError::MissingBoundary { connection: *id }),
            };
            system.define_flow(handle, FlowDefinition::constant(boundary.flow))?;
            for (bp, value) in boundary.load.iter() {
                system.define_parameter(handle, bp, Definition::constant(value))?;
            }
        }

        debug!(routers = plans.len(), "routing flows");
        for (plan, (ins, outs)) in plans.iter().zip(&ports) {
            let mut ctx = RouteContext::new(&mut system, plan.process, ins, outs);
            plan.router.route_flows(&mut ctx)?;
            for (id, handle) in plan.outbound.iter().zip(outs) {
                if !system.is_flow_defined(handle) {
                    warn!(process = %plan.process, connection = %id, "router left flow undefined");
                    return Err(SolverError::UndefinedFlow {
                        router: handle.index(),
                    });
                }
            }
        }

        debug!(routers = plans.len(), "defining constituents");
        for (plan, (ins, outs)) in plans.iter().zip(&ports) {
            let mut ctx = RouteContext::new(&mut system, plan.process, ins, outs);
            plan.router.define_parameters(&mut ctx)?;
            ctx.apply_fallback(plan.router.fallback())?;
            for (id, handle) in plan.outbound.iter().zip(outs) {
                if let Some(parameter) = BaseParameter::ALL
                    .into_iter()
                    .find(|bp| !system.is_parameter_defined(handle, *bp))
                {
                    warn!(process = %plan.process, connection = %id, %parameter, "router left constituent undefined");
                    return Err(SolverError::UndefinedParameter {
                        router: handle.index(),
                        parameter,
                    });
                }
            }
        }

        system.solve()?;

        let mut streams = BTreeMap::new();
        for connection in graph.connections() {
            let handle = handles
                .get(&connection.id)
                .ok_or(SolverError::Graph(GraphError::UnknownConnection {
                    connection: connection.id,
                }))?;
            streams.insert(
                connection.id,
                StreamResult {
                    connection: connection.id,
                    upstream: connection.upstream,
                    downstream: connection.downstream,
                    flow: system.flow(handle)?,
                    load: system.load(handle)?,
                },
            );
        }

        let recycle_groups = graph.recycle_groups();
        info!(
            streams = streams.len(),
            recycle_loops = recycle_groups.len(),
            "network solved"
        );
        Ok(NetworkSolution {
            streams,
            recycle_groups,
        })
    }
}

/// Solve `graph` with the built-in strategies.
///
/// ```
/// use std::collections::BTreeMap;
/// use ww_graph::{ModelGraph, ProcessKind};
/// use ww_loads::Load;
/// use ww_solver::{Boundary, SolverConfig, solve_network};
///
/// let mut graph = ModelGraph::new();
/// let basin = graph.create_process("Basin", ProcessKind::CompleteMix).unwrap();
/// let influent = graph.connect(None, Some(basin)).unwrap();
/// let effluent = graph.connect(Some(basin), None).unwrap();
///
/// let boundaries = BTreeMap::from([(influent, Boundary::new(5.0, Load::empty().with_amm_n(30.0)))]);
/// let solution = solve_network(&graph, &boundaries, &SolverConfig::default()).unwrap();
/// assert!((solution.flow(effluent).unwrap() - 5.0).abs() < 1e-12);
/// assert!((solution.load(effluent).unwrap().amm_n() - 30.0).abs() < 1e-9);
/// ```
pub fn solve_network(
    graph: &ModelGraph,
    boundaries: &BTreeMap<ConnectionId, Boundary>,
    config: &SolverConfig,
) -> SolverResult<NetworkSolution> {
    NetworkSolver::new(config.clone()).solve(graph, boundaries)
}

fn check_boundaries(
    graph: &ModelGraph,
    influents: &[ConnectionId],
    boundaries: &BTreeMap<ConnectionId, Boundary>,
) -> SolverResult<()> {
    for (id, boundary) in boundaries {
        let is_influent = graph
            .get_connection(*id)
            .is_some_and(|c| c.is_influent());
        if !is_influent {
            warn!(connection = %id, "boundary on a non-influent connection");
            return Err(SolverError::UnexpectedBoundary { connection: *id });
        }
        boundary.check(*id)?;
    }
    if let Some(missing) = influents.iter().find(|id| !boundaries.contains_key(*id)) {
        warn!(connection = %missing, "influent without boundary");
        return Err(SolverError::MissingBoundary {
            connection: *missing,
        });
    }
    Ok(())
}
