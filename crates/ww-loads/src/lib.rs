//! ww-loads: constituent taxonomy and load values.
//!
//! Provides:
//! - `BaseParameter`: the fixed set of irreducible constituents tracked on every stream
//! - `ProcessParameter`: bit-set aggregates over base constituents (TSS, TKN, ...)
//! - `Load`: immutable per-constituent magnitudes with derived aggregate totals
//!
//! # Example
//!
//! ```
//! use ww_loads::Load;
//!
//! let only_bod = Load::empty().with_sol_bod(200.0).with_part_bod(100.0);
//! assert!((only_bod.tot_bod() - 300.0).abs() < 1e-9);
//! ```

pub mod error;
pub mod load;
pub mod parameter;

pub use error::{LoadError, LoadResult};
pub use load::{Load, MAX_VALUE, MIN_VALUE};
pub use parameter::{BaseParameter, NUM_BASE_PARAMETERS, ProcessParameter};
