//! Divide the blended inflow between outflows by fixed fractions.

use ww_core::{is_share, sums_to_one};
use ww_graph::ProcessKind;
use ww_loads::BaseParameter;

use crate::error::SolverResult;
use crate::router::{Ports, RouteContext, Router};

/// `Q_k = f_k Σ Q_i`. Every outflow leaves at the mixed concentration.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSplit {
    fractions: Vec<f64>,
}

impl FlowSplit {
    /// Fractions pair with outflows in order; each must lie in (0, 1] and
    /// they must sum to one.
    pub fn new(fractions: Vec<f64>, ports: &Ports) -> SolverResult<Self> {
        ports.require_inflows(1..)?;
        if fractions.len() != ports.outflows {
            return Err(ports.invalid(format!(
                "{} split fractions for {} outflows",
                fractions.len(),
                ports.outflows
            )));
        }
        if let Some(f) = fractions.iter().find(|f| !is_share(**f)) {
            return Err(ports.invalid(format!("split fraction {f} outside (0, 1]")));
        }
        if !sums_to_one(&fractions) {
            let sum: f64 = fractions.iter().sum();
            return Err(ports.invalid(format!("split fractions sum to {sum}, not 1")));
        }
        Ok(Self { fractions })
    }

    pub fn build(kind: &ProcessKind, ports: &Ports) -> SolverResult<Box<dyn Router>> {
        match kind {
            ProcessKind::FlowSplit { fractions } => {
                Ok(Box::new(Self::new(fractions.clone(), ports)?))
            }
            other => Err(ports.invalid(format!("'{other}' is not a flow split"))),
        }
    }

    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }
}

impl Router for FlowSplit {
    fn route_flows(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()> {
        for (outflow, f) in ctx.outflows().iter().zip(&self.fractions) {
            let share = ctx.total_inflow() * *f;
            ctx.define_flow(outflow, share)?;
        }
        Ok(())
    }

    fn define_parameters(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()> {
        for (outflow, f) in ctx.outflows().iter().zip(&self.fractions) {
            for bp in BaseParameter::ALL {
                let share = ctx.blended(bp, outflow) * *f;
                ctx.define_parameter(outflow, bp, share)?;
            }
        }
        Ok(())
    }
}
