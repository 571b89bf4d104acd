//! Breathing cadence table

use serde::Serialize;

/// One named segment of the breathing cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Phase {
    pub label: &'static str,
    pub duration_ms: u64,
    /// Target scale of the breathing circle while this phase is shown
    pub scale: f32,
}

impl Phase {
    /// Whole seconds in this phase
    pub fn duration_secs(&self) -> u64 {
        self.duration_ms / 1000
    }
}

/// The cycle, in order. Index 0 is where every session starts.
pub const PHASES: [Phase; 4] = [
    Phase {
        label: "Inhale",
        duration_ms: 4000,
        scale: 1.15,
    },
    Phase {
        label: "Hold",
        duration_ms: 2000,
        scale: 1.15,
    },
    Phase {
        label: "Exhale",
        duration_ms: 6000,
        scale: 0.85,
    },
    Phase {
        label: "Hold",
        duration_ms: 2000,
        scale: 0.85,
    },
];

/// Length of one full cycle in milliseconds
pub fn cycle_ms() -> u64 {
    PHASES.iter().map(|p| p.duration_ms).sum()
}

/// Index of the phase following `index`, wrapping at the end of the cycle
pub fn next_index(index: usize) -> usize {
    (index + 1) % PHASES.len()
}
