//! Breathing exercise timer
//!
//! `timer` is the pure state machine, `driver` runs it on a tokio interval.

pub mod driver;
pub mod phases;
pub mod timer;

pub use driver::{TimerDriver, DEFAULT_TICK};
pub use phases::{Phase, PHASES};
pub use timer::{CycleState, PhaseDisplay};
