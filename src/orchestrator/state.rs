use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Lifecycle of one strategy run.
///
/// ```text
/// Created → Validating → Valid → Executing{0} → … → Completed
///                      ↘ Rejected          ↘ Aborted{k}
///                                          ↘ Paused{k}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Created,
    Validating,
    Valid,
    /// At least one step failed resolution or validation; nothing ran.
    Rejected,
    /// About to run the step at `next`.
    Executing { next: usize },
    Completed,
    /// The step at `failed_step` failed; later steps were not attempted.
    Aborted { failed_step: usize },
    /// A pause request was honoured before the step at `next` started.
    Paused { next: usize },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Rejected
                | RunState::Completed
                | RunState::Aborted { .. }
                | RunState::Paused { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunState::Created => "created",
            RunState::Validating => "validating",
            RunState::Valid => "valid",
            RunState::Rejected => "rejected",
            RunState::Executing { .. } => "executing",
            RunState::Completed => "completed",
            RunState::Aborted { .. } => "aborted",
            RunState::Paused { .. } => "paused",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Executing { next } => write!(f, "executing (step {})", next + 1),
            RunState::Aborted { failed_step } => write!(f, "aborted at step {}", failed_step + 1),
            RunState::Paused { next } => write!(f, "paused before step {}", next + 1),
            other => f.write_str(other.name()),
        }
    }
}

/// Cooperative pause request shared between a run and its controller.
/// Checked only between steps; an in-flight step always finishes.
#[derive(Debug, Clone, Default)]
pub struct PauseSignal(Arc<AtomicBool>);

impl PauseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
