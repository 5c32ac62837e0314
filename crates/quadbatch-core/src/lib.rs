//! Quadbatch Core
//!
//! Logging and profiling bootstrap shared by the quadbatch crates.

pub mod logging;
pub mod profiling;
