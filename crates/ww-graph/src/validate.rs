//! Graph validation logic.

use crate::error::{GraphError, GraphResult};
use crate::graph::ModelGraph;

/// Validate the graph structure: every endpoint exists and the petgraph
/// topology mirrors exactly the process-to-process connections.
pub(crate) fn validate_structure(graph: &ModelGraph) -> GraphResult<()> {
    // Every process has a topology node pointing back at it
    for id in graph.processes.keys() {
        let node = graph
            .nodes
            .get(id)
            .ok_or(GraphError::UnknownProcess { process: *id })?;
        if graph.topology.node_weight(*node) != Some(id) {
            return Err(GraphError::UnknownProcess { process: *id });
        }
    }
    if graph.topology.node_count() != graph.processes.len() {
        // A node outlived its process
        let orphan = graph
            .topology
            .node_indices()
            .find(|n| graph.nodes.get(&graph.topology[*n]) != Some(n))
            .map(|n| graph.topology[n]);
        if let Some(process) = orphan {
            return Err(GraphError::UnknownProcess { process });
        }
    }

    let mut internal = 0;
    for connection in graph.connections.values() {
        if connection.upstream.is_none() && connection.downstream.is_none() {
            return Err(GraphError::DetachedConnection {
                connection: Some(connection.id),
            });
        }

        for process in [connection.upstream, connection.downstream]
            .into_iter()
            .flatten()
        {
            if !graph.processes.contains_key(&process) {
                return Err(GraphError::UnknownProcess { process });
            }
        }

        // Internal connections must be mirrored by an edge with matching endpoints
        if let (Some(up), Some(down)) = (connection.upstream, connection.downstream) {
            internal += 1;
            let edge = graph
                .edges
                .get(&connection.id)
                .ok_or(GraphError::InconsistentAdjacency {
                    connection: connection.id,
                })?;
            let endpoints = graph
                .topology
                .edge_endpoints(*edge)
                .and_then(|(a, b)| {
                    Some((
                        *graph.topology.node_weight(a)?,
                        *graph.topology.node_weight(b)?,
                    ))
                });
            if endpoints != Some((up, down))
                || graph.topology.edge_weight(*edge) != Some(&connection.id)
            {
                return Err(GraphError::InconsistentAdjacency {
                    connection: connection.id,
                });
            }
        } else if graph.edges.contains_key(&connection.id)
            || !graph.boundary.contains(&connection.id)
        {
            return Err(GraphError::InconsistentAdjacency {
                connection: connection.id,
            });
        }
    }

    if let Some(&connection) = graph
        .boundary
        .iter()
        .find(|id| !graph.connections.contains_key(*id))
    {
        return Err(GraphError::InconsistentAdjacency { connection });
    }

    if graph.topology.edge_count() != internal {
        // A stale edge survived a removal
        let stale = graph
            .topology
            .edge_indices()
            .filter_map(|e| graph.topology.edge_weight(e))
            .find(|id| !graph.connections.contains_key(*id))
            .copied();
        if let Some(connection) = stale {
            return Err(GraphError::InconsistentAdjacency { connection });
        }
    }

    Ok(())
}
