//! Whole-program analysis: entry points, RTA reachability, the
//! source-identifier and usage indices, verdicts, and path explanations.

mod index;
mod roots;
mod rta;
mod usage;
mod verdict;
mod whylive;

pub use index::{build as build_index, IdentEntry, IdentIndex, IdentKind};
pub use roots::collect_roots;
pub use rta::{analyze, RtaResult};
pub use usage::{build as build_usage, UsageIndex};
pub use verdict::{dead_functions, over_exported, reachable_positions, DeadFunction, OverExport};
pub use whylive::{why_live, PathEdge};
