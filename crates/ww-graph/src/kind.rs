//! Process strategy tags.

use core::fmt;

/// The solver strategy attached to a process.
///
/// Built-in variants carry their own parameters. `Custom` names a strategy
/// registered with the solver's router registry under `tag`.
///
/// Outflows are matched to parameters in ascending connection-id order, so
/// `FlowSplit { fractions: [0.8, 0.2] }` sends 80% to the process's
/// first-created outbound connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessKind {
    /// One inflow, one outflow, nothing changes.
    PassThrough,
    /// Any number of inflows blended into a single outflow.
    CompleteMix,
    /// Blended inflow divided between outflows by flow fraction.
    FlowSplit { fractions: Vec<f64> },
    /// Settling: outflows are [overflow, underflow]. `underflow_fraction` of
    /// the flow leaves as underflow carrying `capture` of the particulates.
    SolidsSeparator { underflow_fraction: f64, capture: f64 },
    /// Single outflow with `efficiency` of the ammonia oxidized to NOx.
    Nitrification { efficiency: f64 },
    /// User strategy looked up by tag.
    Custom { tag: String },
}

impl ProcessKind {
    pub const PASS_THROUGH: &'static str = "pass_through";
    pub const COMPLETE_MIX: &'static str = "complete_mix";
    pub const FLOW_SPLIT: &'static str = "flow_split";
    pub const SOLIDS_SEPARATOR: &'static str = "solids_separator";
    pub const NITRIFICATION: &'static str = "nitrification";

    pub fn custom(tag: impl Into<String>) -> Self {
        ProcessKind::Custom { tag: tag.into() }
    }

    /// Registry key of this strategy.
    pub fn tag(&self) -> &str {
        match self {
            ProcessKind::PassThrough => Self::PASS_THROUGH,
            ProcessKind::CompleteMix => Self::COMPLETE_MIX,
            ProcessKind::FlowSplit { .. } => Self::FLOW_SPLIT,
            ProcessKind::SolidsSeparator { .. } => Self::SOLIDS_SEPARATOR,
            ProcessKind::Nitrification { .. } => Self::NITRIFICATION,
            ProcessKind::Custom { tag } => tag,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, ProcessKind::Custom { .. })
    }
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
