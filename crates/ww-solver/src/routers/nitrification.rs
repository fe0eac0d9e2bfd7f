//! Ammonia oxidation in an aerated stage.

use ww_core::is_share;
use ww_graph::ProcessKind;
use ww_loads::BaseParameter;

use crate::error::SolverResult;
use crate::router::{Ports, RouteContext, Router};

/// Alkalinity (as CaCO3) consumed per unit of ammonia-N oxidized.
pub const ALKALINITY_PER_NITROGEN: f64 = 7.14;

/// Blends its inflows like [`CompleteMix`](super::CompleteMix), then oxidizes
/// `efficiency` of the ammonia to NOx.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nitrification {
    efficiency: f64,
}

impl Nitrification {
    pub fn new(efficiency: f64, ports: &Ports) -> SolverResult<Self> {
        ports.require_inflows(1..)?;
        ports.require_outflows(1..=1)?;
        if !is_share(efficiency) {
            return Err(ports.invalid(format!(
                "nitrification efficiency {efficiency} outside (0, 1]"
            )));
        }
        Ok(Self { efficiency })
    }

    pub fn build(kind: &ProcessKind, ports: &Ports) -> SolverResult<Box<dyn Router>> {
        match kind {
            ProcessKind::Nitrification { efficiency } => {
                Ok(Box::new(Self::new(*efficiency, ports)?))
            }
            other => Err(ports.invalid(format!("'{other}' is not a nitrification stage"))),
        }
    }
}

impl Router for Nitrification {
    fn route_flows(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()> {
        let effluent = ctx.outflow(0)?;
        let total = ctx.total_inflow();
        ctx.define_flow(&effluent, total)
    }

    fn define_parameters(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()> {
        let effluent = ctx.outflow(0)?;
        let eta = self.efficiency;
        for bp in BaseParameter::ALL {
            let mixed = ctx.blended(bp, &effluent);
            let oxidized = || ctx.blended(BaseParameter::AmmN, &effluent);
            let definition = match bp {
                BaseParameter::AmmN => mixed * (1.0 - eta),
                BaseParameter::NOx => mixed + oxidized() * eta,
                BaseParameter::Alk => mixed - oxidized() * (ALKALINITY_PER_NITROGEN * eta),
                _ => mixed,
            };
            ctx.define_parameter(&effluent, bp, definition)?;
        }
        Ok(())
    }
}
