#![forbid(unsafe_code)]

//! Core: runtime configuration, time sources, and logging setup shared by
//! the reactive runtime and the reconciler.

pub mod clock;
pub mod config;
pub mod logging;

pub use clock::{Clock, LabClock};
pub use config::{ConfigError, RuntimeConfig};
