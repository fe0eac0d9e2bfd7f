//! Router contract and strategy registry.
//!
//! A router turns one process's inflows into definitions of its outflows.
//! It never sees numbers: it writes symbolic definitions through a
//! [`RouteContext`], and the assembler solves them later.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeBounds;
use std::sync::Arc;

use ww_core::ProcessId;
use ww_graph::ProcessKind;
use ww_loads::{BaseParameter, MIN_VALUE};

use crate::error::{SolverError, SolverResult};
use crate::expr::{Definition, FlowDefinition};
use crate::handle::RouterHandle;
use crate::routers::{CompleteMix, FlowSplit, Nitrification, PassThrough, SolidsSeparator};
use crate::system::LinearSystem;

/// What happens to constituents a router leaves undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Leaving a constituent undefined is a modeling fault.
    #[default]
    Reject,
    /// Undefined constituents leave at the mixed inflow concentration.
    PassThrough,
    /// Undefined constituents leave at [`MIN_VALUE`].
    Zero,
}

/// Per-process solver strategy.
pub trait Router: fmt::Debug + Send + Sync {
    /// Define every outflow's flow from the inflow flows.
    fn route_flows(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()>;

    /// Define every outflow's base constituents from the inflows.
    fn define_parameters(&self, ctx: &mut RouteContext<'_>) -> SolverResult<()>;

    /// Handling of constituents `define_parameters` leaves undefined.
    fn fallback(&self) -> Fallback {
        Fallback::Reject
    }
}

/// Shape of the process a router is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ports {
    pub process: ProcessId,
    pub inflows: usize,
    pub outflows: usize,
}

impl Ports {
    pub fn require_inflows<R>(&self, range: R) -> SolverResult<()>
    where
        R: RangeBounds<usize> + fmt::Debug,
    {
        self.require("inflows", self.inflows, range)
    }

    pub fn require_outflows<R>(&self, range: R) -> SolverResult<()>
    where
        R: RangeBounds<usize> + fmt::Debug,
    {
        self.require("outflows", self.outflows, range)
    }

    pub fn topology(&self, what: impl Into<String>) -> SolverError {
        SolverError::Topology {
            process: self.process,
            what: what.into(),
        }
    }

    pub fn invalid(&self, what: impl Into<String>) -> SolverError {
        SolverError::InvalidStrategy {
            process: self.process,
            what: what.into(),
        }
    }

    fn require<R>(&self, side: &str, found: usize, range: R) -> SolverResult<()>
    where
        R: RangeBounds<usize> + fmt::Debug,
    {
        if range.contains(&found) {
            Ok(())
        } else {
            Err(self.topology(format!("expected {range:?} {side}, found {found}")))
        }
    }
}

/// A router's view of the assembler while it defines its outflows.
pub struct RouteContext<'a> {
    system: &'a mut LinearSystem,
    process: ProcessId,
    inflows: &'a [RouterHandle],
    outflows: &'a [RouterHandle],
}

impl<'a> RouteContext<'a> {
    pub fn new(
        system: &'a mut LinearSystem,
        process: ProcessId,
        inflows: &'a [RouterHandle],
        outflows: &'a [RouterHandle],
    ) -> Self {
        Self {
            system,
            process,
            inflows,
            outflows,
        }
    }

    pub fn process(&self) -> ProcessId {
        self.process
    }

    pub fn inflows(&self) -> &'a [RouterHandle] {
        self.inflows
    }

    /// Outflow handles in ascending connection-id order.
    pub fn outflows(&self) -> &'a [RouterHandle] {
        self.outflows
    }

    pub fn inflow(&self, index: usize) -> SolverResult<RouterHandle> {
        self.inflows.get(index).copied().ok_or_else(|| SolverError::Topology {
            process: self.process,
            what: format!("no inflow #{index} ({} inflows)", self.inflows.len()),
        })
    }

    pub fn outflow(&self, index: usize) -> SolverResult<RouterHandle> {
        self.outflows.get(index).copied().ok_or_else(|| SolverError::Topology {
            process: self.process,
            what: format!("no outflow #{index} ({} outflows)", self.outflows.len()),
        })
    }

    /// `Σ Q[inflow]`
    pub fn total_inflow(&self) -> FlowDefinition {
        self.inflows.iter().map(|h| h.flow()).sum()
    }

    /// Flow-weighted mix of `parameter` over all inflows, as seen in
    /// `outflow`: `Σ C_i * Q_i / Q_out`.
    pub fn blended(&self, parameter: BaseParameter, outflow: &RouterHandle) -> Definition {
        self.inflows
            .iter()
            .map(|i| i.param(parameter) * (i.flow() / outflow.flow()))
            .sum()
    }

    pub fn define_flow(
        &mut self,
        outflow: &RouterHandle,
        definition: impl Into<FlowDefinition>,
    ) -> SolverResult<()> {
        self.owns(outflow)?;
        self.system.define_flow(outflow, definition.into())
    }

    pub fn define_parameter(
        &mut self,
        outflow: &RouterHandle,
        parameter: BaseParameter,
        definition: impl Into<Definition>,
    ) -> SolverResult<()> {
        self.owns(outflow)?;
        self.system
            .define_parameter(outflow, parameter, definition.into())
    }

    /// Fill constituents the router left undefined.
    pub(crate) fn apply_fallback(&mut self, fallback: Fallback) -> SolverResult<()> {
        if fallback == Fallback::Reject {
            return Ok(());
        }
        for outflow in self.outflows {
            for bp in BaseParameter::ALL {
                if self.system.is_parameter_defined(outflow, bp) {
                    continue;
                }
                let definition = match fallback {
                    Fallback::PassThrough => self.blended(bp, outflow),
                    _ => Definition::constant(MIN_VALUE),
                };
                self.system.define_parameter(outflow, bp, definition)?;
            }
        }
        Ok(())
    }

    fn owns(&self, outflow: &RouterHandle) -> SolverResult<()> {
        if self.outflows.contains(outflow) {
            Ok(())
        } else {
            Err(SolverError::InvalidHandle {
                what: format!(
                    "stream {} is not an outflow of process {}",
                    outflow.index(),
                    self.process
                ),
            })
        }
    }
}

/// Builds a router for one process.
pub type RouterFactory = dyn Fn(&ProcessKind, &Ports) -> SolverResult<Box<dyn Router>> + Send + Sync;

/// Router factories keyed by [`ProcessKind::tag`].
#[derive(Clone)]
pub struct RouterRegistry {
    factories: HashMap<String, Arc<RouterFactory>>,
}

impl RouterRegistry {
    /// Registry with no strategies at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in strategy.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(ProcessKind::PASS_THROUGH, PassThrough::build);
        registry.register(ProcessKind::COMPLETE_MIX, CompleteMix::build);
        registry.register(ProcessKind::FLOW_SPLIT, FlowSplit::build);
        registry.register(ProcessKind::SOLIDS_SEPARATOR, SolidsSeparator::build);
        registry.register(ProcessKind::NITRIFICATION, Nitrification::build);
        registry
    }

    /// Register `factory` under `tag`. Returns `true` if it replaced an
    /// existing strategy.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F) -> bool
    where
        F: Fn(&ProcessKind, &Ports) -> SolverResult<Box<dyn Router>> + Send + Sync + 'static,
    {
        self.factories.insert(tag.into(), Arc::new(factory)).is_some()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn create(&self, kind: &ProcessKind, ports: &Ports) -> SolverResult<Box<dyn Router>> {
        let factory = self
            .factories
            .get(kind.tag())
            .ok_or_else(|| SolverError::UnknownStrategy {
                tag: kind.tag().to_string(),
            })?;
        factory(kind, ports)
    }
}

impl Default for RouterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for RouterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ww_core::Id;

    fn ports(inflows: usize, outflows: usize) -> Ports {
        Ports {
            process: Id::from_index(0),
            inflows,
            outflows,
        }
    }

    #[test]
    fn ports_ranges() {
        assert!(ports(1, 1).require_inflows(1..=1).is_ok());
        assert!(ports(3, 1).require_inflows(1..).is_ok());
        let err = ports(0, 1).require_inflows(1..).unwrap_err();
        assert!(matches!(err, SolverError::Topology { .. }));
        assert!(err.to_string().contains("found 0"));
    }

    #[test]
    fn builtin_tags() {
        let registry = RouterRegistry::default();
        assert_eq!(
            registry.tags(),
            vec![
                "complete_mix",
                "flow_split",
                "nitrification",
                "pass_through",
                "solids_separator"
            ]
        );
    }

    #[test]
    fn unknown_custom_strategy() {
        let registry = RouterRegistry::default();
        let err = registry
            .create(&ProcessKind::custom("digester"), &ports(1, 1))
            .unwrap_err();
        assert_eq!(
            err,
            SolverError::UnknownStrategy {
                tag: "digester".into()
            }
        );
    }

    #[test]
    fn custom_strategy_by_tag() {
        let mut registry = RouterRegistry::empty();
        assert!(!registry.register("digester", PassThrough::build));
        assert!(registry.register("digester", CompleteMix::build));
        assert!(registry.contains("digester"));
        assert!(
            registry
                .create(&ProcessKind::custom("digester"), &ports(2, 1))
                .is_ok()
        );
    }

    #[test]
    fn context_rejects_foreign_outflow() {
        let mut system = LinearSystem::default();
        let inflow = system.register_effluent().unwrap();
        let outflow = system.register_effluent().unwrap();
        let inflows = [inflow];
        let outflows = [outflow];
        let mut ctx = RouteContext::new(&mut system, Id::from_index(0), &inflows, &outflows);

        let err = ctx.define_flow(&inflow, outflow.flow()).unwrap_err();
        assert!(matches!(err, SolverError::InvalidHandle { .. }));
        let total = ctx.total_inflow();
        assert!(ctx.define_flow(&outflow, total).is_ok());
    }

    #[test]
    fn fallback_fills_the_rest() {
        let mut system = LinearSystem::default();
        let inflow = system.register_effluent().unwrap();
        let outflow = system.register_effluent().unwrap();
        let inflows = [inflow];
        let outflows = [outflow];
        {
            let mut ctx = RouteContext::new(&mut system, Id::from_index(0), &inflows, &outflows);
            ctx.define_parameter(&outflow, BaseParameter::AmmN, Definition::constant(1.0))
                .unwrap();
            ctx.apply_fallback(Fallback::Zero).unwrap();
        }
        for bp in BaseParameter::ALL {
            assert!(system.is_parameter_defined(&outflow, bp));
        }
    }
}
