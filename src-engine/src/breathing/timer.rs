//! Breathing cycle state machine
//!
//! `CycleState` is a plain value: `start`, `stop` and `tick` consume it and
//! return the successor. Nothing here touches a clock; whoever drives the
//! timer supplies elapsed deltas (see `driver`).

use serde::Serialize;

use super::phases::{next_index, Phase, PHASES};

/// Scale of the breathing circle while no session is running
pub const REST_SCALE: f32 = 1.0;

/// Position within the breathing cycle
///
/// Invariant: `elapsed_ms < PHASES[phase_index].duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleState {
    running: bool,
    phase_index: usize,
    elapsed_ms: u64,
}

impl CycleState {
    /// Stopped, showing the first phase at its full duration
    pub const fn idle() -> Self {
        Self {
            running: false,
            phase_index: 0,
            elapsed_ms: 0,
        }
    }

    /// Begin a session at the start of the cycle. No-op if already running.
    #[must_use]
    pub fn start(self) -> Self {
        if self.running {
            return self;
        }
        Self {
            running: true,
            ..Self::idle()
        }
    }

    /// End the session and rewind to the first phase
    #[must_use]
    pub fn stop(self) -> Self {
        Self::idle()
    }

    /// Advance by `dt_ms` milliseconds. No-op while idle.
    ///
    /// Crossing a phase boundary moves exactly one phase forward and carries
    /// the overshoot into the new phase. An overshoot that would swallow the
    /// whole next phase is clamped to its last millisecond.
    #[must_use]
    pub fn tick(self, dt_ms: u64) -> Self {
        if !self.running {
            return self;
        }

        let duration = PHASES[self.phase_index].duration_ms;
        let elapsed = self.elapsed_ms.saturating_add(dt_ms);
        if elapsed < duration {
            return Self {
                elapsed_ms: elapsed,
                ..self
            };
        }

        let next = next_index(self.phase_index);
        let carry = (elapsed - duration).min(PHASES[next].duration_ms - 1);
        Self {
            running: true,
            phase_index: next,
            elapsed_ms: carry,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn phase(&self) -> &'static Phase {
        &PHASES[self.phase_index]
    }

    /// Whole seconds left in the current phase, rounded up
    pub fn countdown_secs(&self) -> u64 {
        let remaining = self.phase().duration_ms - self.elapsed_ms;
        remaining.div_ceil(1000)
    }

    /// Snapshot of everything a renderer needs
    pub fn display(&self) -> PhaseDisplay {
        let phase = self.phase();
        PhaseDisplay {
            phase_index: self.phase_index,
            label: phase.label,
            scale: if self.running { phase.scale } else { REST_SCALE },
            countdown_secs: self.countdown_secs(),
            running: self.running,
        }
    }
}

/// What the breathing circle shows after a command or tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseDisplay {
    pub phase_index: usize,
    pub label: &'static str,
    pub scale: f32,
    pub countdown_secs: u64,
    pub running: bool,
}

impl Default for PhaseDisplay {
    fn default() -> Self {
        CycleState::idle().display()
    }
}
