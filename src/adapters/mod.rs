pub mod contracts;
pub mod evm;
pub mod fees;
pub mod near;

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::model::{Chain, ExecutionContext, ExecutionResult, FeeAmount, Step, ValidationOutcome};

pub use evm::EvmAdapter;
pub use near::NearAdapter;

/// Per-network execution capability. One implementation per chain family,
/// one instance per chain.
///
/// Instances are shared by every concurrent run, so all methods take
/// `&self`: network clients are built at construction and only read
/// afterwards. Each call bounds its own network I/O with a timeout.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// The network this adapter drives.
    fn chain(&self) -> &Chain;

    /// Structural and on-chain preconditions for a step. Side-effect-free.
    /// An unsupported protocol or action is an invalid outcome, not an error.
    async fn validate(&self, step: &Step, ctx: &ExecutionContext) -> Result<ValidationOutcome>;

    /// Chain-native cost estimate. Implementations fall back to
    /// [`ChainAdapter::fallback_fee`] when live estimation is unavailable.
    async fn estimate_fee(&self, step: &Step, ctx: &ExecutionContext) -> Result<FeeAmount>;

    /// Perform the step. Failures are reported as a `failed` result;
    /// an `Err` is reserved for faults the adapter could not capture.
    async fn execute(
        &self,
        step_id: &str,
        step: &Step,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionResult>;

    /// Conservative static estimate used when nothing better is available.
    fn fallback_fee(&self, step: &Step) -> FeeAmount;
}

/// Runtime knobs shared by the built-in adapters.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Run preflight reads only; never submit.
    pub dry_run: bool,
    /// Upper bound for any single adapter network call.
    pub call_timeout: Duration,
    /// Hex EVM private key used to sign EVM transactions.
    pub private_key: Option<String>,
    /// Endpoint that signs and relays NEAR function calls.
    pub near_relayer: Option<String>,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        AdapterSettings {
            dry_run: true,
            call_timeout: Duration::from_secs(60),
            private_key: None,
            near_relayer: None,
        }
    }
}

/// Whether a built-in adapter can submit `step` on `chain`. Steps without a
/// call plan are always rejected at validation.
pub fn has_call_plan(chain: &Chain, step: &Step) -> bool {
    if chain.is_evm() {
        evm::has_call_plan(chain, step)
    } else {
        near::has_call_plan(step)
    }
}

/// Await `fut`, turning an elapsed deadline into an ordinary error.
pub async fn with_timeout<T, F>(limit: Duration, label: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(anyhow!("{label} timed out after {}s", limit.as_secs_f64())),
    }
}
