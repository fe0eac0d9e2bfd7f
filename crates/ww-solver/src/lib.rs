//! Steady-state mass-balance solver for wastewater process networks.
//!
//! Each process gets a [`Router`] that states its outflows as affine
//! combinations of its inflows. The [`LinearSystem`] assembles those
//! statements into two sparse systems and solves them directly: first every
//! flow (hydraulics), then every constituent concentration (process), with
//! flow ratios filled in from the first solve. Recycle loops fall out of the
//! simultaneous solve without iteration.

pub mod error;
pub mod expr;
pub mod handle;
pub mod network;
pub mod router;
pub mod routers;
pub(crate) mod sparse;
pub mod system;

pub use error::{SolveStage, SolverError, SolverResult};
pub use expr::{
    Coefficient, Definition, FlowDefinition, FlowRatio, FlowRef, ParameterIndex, ParameterRef,
    RouterIndex, Term,
};
pub use handle::{ProcessLoadings, RouterHandle};
pub use network::{Boundary, NetworkSolution, NetworkSolver, StreamResult, solve_network};
pub use router::{Fallback, Ports, RouteContext, Router, RouterFactory, RouterRegistry};
pub use system::{Growth, LinearSystem, SolverConfig, SystemState};
