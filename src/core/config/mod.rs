//! Configuration of the fault tolerance module.
//!
//! The `ConfigEntity` describes how the module is set up (application, regulator
//! and logging settings, plus the initial per-application fault tolerance configs),
//! while the `FaultToleranceConfigManager` holds the live per-application
//! `FaultToleranceConfig`s which may be replaced at any time, e.g. by a dynamic config source.

mod base;
mod constant;
mod entity;
mod manager;

pub use base::*;
pub use constant::*;
pub use entity::*;
pub use manager::*;
