use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Success,
    Failed,
}

/// Outcome record for one attempted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn success(step_id: impl Into<String>) -> Self {
        Self::with_status(step_id, StepStatus::Success, None)
    }

    pub fn failed(step_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::with_status(step_id, StepStatus::Failed, Some(error.into()))
    }

    fn with_status(step_id: impl Into<String>, status: StepStatus, error: Option<String>) -> Self {
        ExecutionResult {
            step_id: step_id.into(),
            status,
            transaction_hash: None,
            block_number: None,
            gas_used: None,
            actual_amount: None,
            error,
            timestamp: Utc::now(),
        }
    }

    pub fn with_transaction(mut self, hash: impl Into<String>, block: Option<u64>) -> Self {
        self.transaction_hash = Some(hash.into());
        self.block_number = block;
        self
    }

    pub fn with_gas_used(mut self, gas_used: u64) -> Self {
        self.gas_used = Some(gas_used);
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.actual_amount = Some(amount.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }

    /// A failed step that got a transaction onto the network before failing.
    /// Its on-chain effect is unknown.
    pub fn was_broadcast(&self) -> bool {
        self.is_failed() && self.transaction_hash.is_some()
    }
}

/// Pre-execution verdict for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        ValidationOutcome {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        ValidationOutcome {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}
