//! Rationalization: HIR statement trees to LIR ranges.
//!
//! [`rationalize`] splices each block's statements into one linear range and
//! rewrites the shapes LIR does not allow:
//!
//! - assignments become stores (`store_lcl_var`, `store_ind`, `store_blk`, ...)
//! - `addr` of locals, statics and indirections folds into address nodes
//! - `comma`, `nop`, `box`, `arg_place` and boolean `qmark` dissolve
//! - intrinsics the target cannot expand become calls
//! - vector loads and stores are normalized on SIMD targets
//!
//! The walk is a single post-order pass per statement; see the `rules`
//! modules for the individual rewrites.

pub mod config;
pub mod context;
pub mod driver;
pub mod errors;

mod rules;
mod walk;

pub use config::TargetConfig;
pub use context::RewriteContext;
pub use driver::{RationalizeStats, rationalize};
pub use errors::{RationalizeError, RationalizeErrorKind, RationalizeResult};
