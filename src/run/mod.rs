//! Execution of a rendered script by the LAMMPS engine.
//!
//! The engine runs as a child process reading the script from disk. Its standard
//! output is streamed line by line through an [`OutputFilter`] to a caller
//! supplied callback; standard error is inherited.

pub mod engine;
pub mod filter;

use std::fmt;

pub use engine::{EngineProcess, consume_output};
pub use filter::OutputFilter;

/// Lifecycle of one [`Simulation`](crate::Simulation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Rendering,
    /// The script is on disk and can be executed.
    Rendered,
    Spawned,
    Streaming,
    Completed,
    /// Stopped by the user.
    Terminated,
    Failed,
}

impl RunState {
    /// Whether the run can no longer change state.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Terminated | RunState::Failed
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Idle => "idle",
            RunState::Rendering => "rendering",
            RunState::Rendered => "rendered",
            RunState::Spawned => "spawned",
            RunState::Streaming => "streaming",
            RunState::Completed => "completed",
            RunState::Terminated => "terminated",
            RunState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// How a call to [`Simulation::execute`](crate::Simulation::execute) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The engine exited successfully.
    Completed,
    /// The user interrupted the run and the engine was killed.
    Terminated,
    /// The simulation had already completed; nothing was run.
    AlreadyCompleted,
}
