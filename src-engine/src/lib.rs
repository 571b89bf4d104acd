//! MindHub wellness session engine
//!
//! - `breathing`: the cyclic breathing-phase timer and its tick driver
//! - `identity`: anonymous, persisted per-client session id
//! - `mood`: mood check-ins, the once-a-day throttle and storage backends
//! - `engine`: the check-in flow wired together for a UI

// Breathing timer (pure state machine + tokio driver)
pub mod breathing;

// Environment configuration (data dir, hosted store, timing)
pub mod config;

pub mod engine;
pub mod error;
pub mod identity;
pub mod mood;

// Async polling helpers for tests
#[cfg(test)]
pub mod test_utils;

pub use engine::WellnessEngine;
pub use error::{MindhubError, Result};
