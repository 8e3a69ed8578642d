//! Accumulated wall time per engine phase.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Update,
    Evaluate,
    Push,
    Adapt,
    Refine,
    CheckTopk,
    Output,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Update,
        Phase::Evaluate,
        Phase::Push,
        Phase::Adapt,
        Phase::Refine,
        Phase::CheckTopk,
        Phase::Output,
    ];
}

#[derive(Debug, Clone, Default)]
pub struct PhaseTimers {
    elapsed: [Duration; 7],
}

impl PhaseTimers {
    pub fn record(&mut self, phase: Phase, d: Duration) {
        self.elapsed[phase as usize] += d;
    }

    /// Add the time since `start` to `phase`.
    pub fn stop(&mut self, phase: Phase, start: Instant) {
        self.record(phase, start.elapsed());
    }

    pub fn elapsed(&self, phase: Phase) -> Duration {
        self.elapsed[phase as usize]
    }

    pub fn reset(&mut self) {
        self.elapsed = [Duration::ZERO; 7];
    }
}
