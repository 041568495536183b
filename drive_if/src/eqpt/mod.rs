//! # Equipment Interface
//!
//! This module defines the interfaces of the equipment which the drive loop reads from or
//! commands. Implementations are provided by hardware backends or by the simulation.
//!
//! All calls are synchronous and bounded in latency, none of them may block a tick.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod battery;
pub mod estimator;
pub mod gyro;
pub mod modules;

// -----------------------------------------------------------------------------------------------
// REEXPORTS
// -----------------------------------------------------------------------------------------------

pub use battery::*;
pub use estimator::*;
pub use gyro::*;
pub use modules::*;
