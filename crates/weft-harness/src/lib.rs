#![forbid(unsafe_code)]

//! Test support for weft.
//!
//! - [`MemoryHost`]: an arena-backed [`Host`](weft_render::Host) that records
//!   every operation, serializes to markup and hashes its tree.
//! - [`shrink`]: delta debugging to cut a failing vnode tree down to the
//!   nodes that matter.
//! - [`fixtures`]: keyed list builders shared by tests, benches and fuzzing.

pub mod fixtures;
pub mod memory_host;
pub mod shrink;

pub use memory_host::{HostCounters, HostOp, MemoryHost};
