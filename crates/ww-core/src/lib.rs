//! ww-core: shared foundation for the wastewater network crates.
//!
//! - `ids`: compact stable ids for processes and connections
//! - `numeric`: the `Real` type, tolerances and fraction checks
//! - `error`: the workspace-wide error every crate error converts into

pub mod error;
pub mod ids;
pub mod numeric;

pub use error::{WwError, WwResult};
pub use ids::*;
pub use numeric::*;
