//! Files written after a run.
//!
//! # Submodules
//!
//! - [`json`]: Writes the [`RunReport`](crate::coordinator::RunReport) of an
//!   invocation for CI artifacts and dashboards

pub mod json;
