use thiserror::Error;

use crate::validate::ValidationError;

/// A step could not be bound to any adapter, even via the default route.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("protocol `{protocol}` routes to chain `{chain}`, which has no registered adapter")]
    NoAdapter { protocol: String, chain: String },
}

/// Why a step stopped the run before execution began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Resolution,
    Validation,
}

/// One offending step in a rejected run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRejection {
    pub index: usize,
    pub step_id: String,
    pub protocol: String,
    pub kind: RejectionKind,
    pub reason: String,
}

impl std::fmt::Display for StepRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            RejectionKind::Resolution => "unresolved",
            RejectionKind::Validation => "invalid",
        };
        write!(
            f,
            "step {} `{}` ({}) {}: {}",
            self.index + 1,
            self.step_id,
            self.protocol,
            kind,
            self.reason
        )
    }
}

/// Errors surfaced before any step was executed. Nothing has touched a
/// chain when one of these is returned.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("strategy document is invalid:\n  {}", join_lines(.0))]
    InvalidStrategy(Vec<ValidationError>),

    #[error("strategy `{strategy_id}` rejected before execution:\n  {}", join_lines(.rejections))]
    Rejected {
        strategy_id: String,
        rejections: Vec<StepRejection>,
    },

    #[error("resume index {from} is past the last step ({len} steps)")]
    ResumeOutOfRange { from: usize, len: usize },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("chain `{chain}` reported fees in mixed units ({first} and {second})")]
    MixedFeeUnits {
        chain: String,
        first: String,
        second: String,
    },
}

impl CoordinatorError {
    /// Offending steps, when the run was rejected at validation time.
    pub fn rejections(&self) -> &[StepRejection] {
        match self {
            CoordinatorError::Rejected { rejections, .. } => rejections,
            _ => &[],
        }
    }
}

fn join_lines<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n  ")
}
