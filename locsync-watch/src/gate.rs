//! Serialization of runs with burst coalescing.
//!
//! ```text
//!            trigger                 trigger
//!   Idle ─────────────▶ Running ─────────────▶ Pending
//!    ▲                    │  ▲                    │
//!    └────── finish ──────┘  └────── finish ──────┘
//!                               (start follow-up)
//! ```
//!
//! Any number of triggers while a run is in flight collapse into one
//! follow-up run.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GateState {
    #[default]
    Idle,
    Running,
    /// Running, with one follow-up owed.
    Pending,
}

#[derive(Debug, Default)]
pub struct RunGate {
    state: GateState,
}

impl RunGate {
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Record a trigger. Returns `true` when the caller should start a run now.
    pub fn trigger(&mut self) -> bool {
        match self.state {
            GateState::Idle => {
                self.state = GateState::Running;
                true
            }
            GateState::Running | GateState::Pending => {
                self.state = GateState::Pending;
                false
            }
        }
    }

    /// Record that the in-flight run ended. Returns `true` when the caller
    /// should start the owed follow-up run now.
    pub fn finish(&mut self) -> bool {
        match self.state {
            GateState::Pending => {
                self.state = GateState::Running;
                true
            }
            GateState::Idle | GateState::Running => {
                self.state = GateState::Idle;
                false
            }
        }
    }
}
