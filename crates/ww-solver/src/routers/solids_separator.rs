//! Gravity settling: a clarified overflow and a thickened underflow.

use ww_core::is_open_fraction;
use ww_graph::ProcessKind;
use ww_loads::BaseParameter;

use crate::error::SolverResult;
use crate::router::{Ports, RouteContext, Router};

const OVERFLOW: usize = 0;
const UNDERFLOW: usize = 1;

/// Outflows are `[overflow, underflow]` in connection-id order.
///
/// `underflow_fraction` of the blended flow leaves as underflow. Particulates
/// are split by `capture` (the share reaching the underflow); solubles follow
/// the water.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidsSeparator {
    underflow_fraction: f64,
    capture: f64,
}

impl SolidsSeparator {
    pub fn new(underflow_fraction: f64, capture: f64, ports: &Ports) -> SolverResult<Self> {
        ports.require_inflows(1..)?;
        ports.require_outflows(2..=2)?;
        if !is_open_fraction(underflow_fraction) {
            return Err(ports.invalid(format!(
                "underflow fraction {underflow_fraction} outside (0, 1)"
            )));
        }
        if !is_open_fraction(capture) {
            return Err(ports.invalid(format!("solids capture {capture} outside (0, 1)")));
        }
        Ok(Self {
            underflow_fraction,
            capture,
        })
    }

    pub fn build(kind: &ProcessKind, ports: &Ports) -> SolverResult<Box<dyn Router>> {
        match kind {
            ProcessKind::SolidsSeparator {
                underflow_fraction,
                capture,
            } => Ok(Box::new(Self::new(*underflow_fraction, *capture, ports)?)),
            other => Err(ports.invalid(format!("'{other}' is not a solids separator"))),
        }
    }

    /// Share of `bp` mass leaving through the underflow.
    fn underflow_share(&self, bp: BaseParameter) -> f64 {
        if bp.is_particulate() {
            self.capture
        } else {
            self.underflow_fraction
        }
    }
}

impl Router for SolidsSeparator {
    fn route_flows(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()> {
        let overflow = ctx.outflow(OVERFLOW)?;
        let underflow = ctx.outflow(UNDERFLOW)?;
        let u = self.underflow_fraction;
        let total = ctx.total_inflow();
        ctx.define_flow(&overflow, total.clone() * (1.0 - u))?;
        ctx.define_flow(&underflow, total * u)
    }

    fn define_parameters(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()> {
        let overflow = ctx.outflow(OVERFLOW)?;
        let underflow = ctx.outflow(UNDERFLOW)?;
        for bp in BaseParameter::ALL {
            let share = self.underflow_share(bp);
            let over = ctx.blended(bp, &overflow) * (1.0 - share);
            let under = ctx.blended(bp, &underflow) * share;
            ctx.define_parameter(&overflow, bp, over)?;
            ctx.define_parameter(&underflow, bp, under)?;
        }
        Ok(())
    }
}
