//! Identity router.

use ww_graph::ProcessKind;
use ww_loads::BaseParameter;

use crate::error::SolverResult;
use crate::router::{Ports, RouteContext, Router};

/// One inflow, one outflow, nothing changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl PassThrough {
    pub fn build(_kind: &ProcessKind, ports: &Ports) -> SolverResult<Box<dyn Router>> {
        ports.require_inflows(1..=1)?;
        ports.require_outflows(1..=1)?;
        Ok(Box::new(PassThrough))
    }
}

impl Router for PassThrough {
    fn route_flows(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()> {
        let inflow = ctx.inflow(0)?;
        let outflow = ctx.outflow(0)?;
        ctx.define_flow(&outflow, inflow.flow())
    }

    fn define_parameters(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()> {
        let inflow = ctx.inflow(0)?;
        let outflow = ctx.outflow(0)?;
        for bp in BaseParameter::ALL {
            ctx.define_parameter(&outflow, bp, inflow.param(bp))?;
        }
        Ok(())
    }
}
