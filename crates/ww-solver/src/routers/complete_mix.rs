//! Flow-weighted blending of every inflow into one outflow.

use ww_graph::ProcessKind;
use ww_loads::BaseParameter;

use crate::error::SolverResult;
use crate::router::{Ports, RouteContext, Router};

/// `Q_e = Σ Q_i`, `C_e = Σ (Q_i / Q_e) C_i`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompleteMix;

impl CompleteMix {
    pub fn build(_kind: &ProcessKind, ports: &Ports) -> SolverResult<Box<dyn Router>> {
        ports.require_inflows(1..)?;
        ports.require_outflows(1..=1)?;
        Ok(Box::new(CompleteMix))
    }
}

impl Router for CompleteMix {
    fn route_flows(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()> {
        let effluent = ctx.outflow(0)?;
        let total = ctx.total_inflow();
        ctx.define_flow(&effluent, total)
    }

    fn define_parameters(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()> {
        let effluent = ctx.outflow(0)?;
        for bp in BaseParameter::ALL {
            let mixed = ctx.blended(bp, &effluent);
            ctx.define_parameter(&effluent, bp, mixed)?;
        }
        Ok(())
    }
}
