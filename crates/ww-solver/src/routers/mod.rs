//! Built-in router strategies.

pub mod complete_mix;
pub mod flow_split;
pub mod nitrification;
pub mod pass_through;
pub mod solids_separator;

pub use complete_mix::CompleteMix;
pub use flow_split::FlowSplit;
pub use nitrification::Nitrification;
pub use pass_through::PassThrough;
pub use solids_separator::SolidsSeparator;
