pub mod chain;
pub mod context;
pub mod fee;
pub mod result;
pub mod strategy;

pub use chain::{Chain, ChainKind};
pub use context::{ExecutionContext, GasPreference, WalletKind};
pub use fee::{FeeAmount, FeeTotals, FeeUnit};
pub use result::{ExecutionResult, StepStatus, ValidationOutcome};
pub use strategy::{RiskLevel, Step, StepAction, Strategy};
