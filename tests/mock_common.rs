#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;

use yield_flow::adapters::{ChainAdapter, fees};
use yield_flow::model::{
    Chain, ExecutionContext, ExecutionResult, FeeAmount, RiskLevel, Step, StepAction, Strategy,
    ValidationOutcome,
};
use yield_flow::{AdapterRegistry, Coordinator};

// ── Mock adapter ─────────────────────────────────────────────────────

/// Shared, ordered record of `execute` calls across every mock.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Scriptable adapter. Behaviour is keyed by lower-case protocol name.
pub struct MockAdapter {
    chain: Chain,
    log: CallLog,
    invalid: Vec<String>,
    validate_errors: Vec<String>,
    failing: Vec<String>,
    stuck: Vec<String>,
    execute_errors: Vec<String>,
    estimate_errors: bool,
    exec_delay: Duration,
    pub validate_calls: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub execute_calls: AtomicUsize,
}

impl MockAdapter {
    pub fn new(chain: Chain, log: &CallLog) -> Self {
        MockAdapter {
            chain,
            log: log.clone(),
            invalid: vec![],
            validate_errors: vec![],
            failing: vec![],
            stuck: vec![],
            execute_errors: vec![],
            estimate_errors: false,
            exec_delay: Duration::ZERO,
            validate_calls: AtomicUsize::new(0),
            estimate_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
        }
    }

    /// `validate` returns an invalid outcome for this protocol.
    pub fn rejecting(mut self, protocol: &str) -> Self {
        self.invalid.push(protocol.to_lowercase());
        self
    }

    /// `validate` returns `Err` for this protocol.
    pub fn validate_erroring(mut self, protocol: &str) -> Self {
        self.validate_errors.push(protocol.to_lowercase());
        self
    }

    /// `execute` returns a failed result for this protocol.
    pub fn failing(mut self, protocol: &str) -> Self {
        self.failing.push(protocol.to_lowercase());
        self
    }

    /// `execute` returns a failed result that still carries a broadcast hash.
    pub fn stuck_after_broadcast(mut self, protocol: &str) -> Self {
        self.stuck.push(protocol.to_lowercase());
        self
    }

    /// `execute` returns `Err` for this protocol.
    pub fn execute_erroring(mut self, protocol: &str) -> Self {
        self.execute_errors.push(protocol.to_lowercase());
        self
    }

    pub fn estimate_erroring(mut self) -> Self {
        self.estimate_errors = true;
        self
    }

    pub fn with_exec_delay(mut self, delay: Duration) -> Self {
        self.exec_delay = delay;
        self
    }

    pub fn executed(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub fn validated(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn estimated(&self) -> usize {
        self.estimate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainAdapter for MockAdapter {
    fn chain(&self) -> &Chain {
        &self.chain
    }

    async fn validate(&self, step: &Step, _ctx: &ExecutionContext) -> Result<ValidationOutcome> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        let key = step.protocol_key();
        if self.validate_errors.contains(&key) {
            bail!("rpc unreachable while validating {key}");
        }
        if self.invalid.contains(&key) {
            return Ok(ValidationOutcome::invalid(format!("{key} is paused")));
        }
        Ok(ValidationOutcome::valid())
    }

    async fn estimate_fee(&self, step: &Step, _ctx: &ExecutionContext) -> Result<FeeAmount> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        if self.estimate_errors {
            bail!("fee oracle down");
        }
        Ok(self.fallback_fee(step))
    }

    async fn execute(
        &self,
        step_id: &str,
        step: &Step,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionResult> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", ctx.strategy.id, step_id));
        if !self.exec_delay.is_zero() {
            tokio::time::sleep(self.exec_delay).await;
        }

        let key = step.protocol_key();
        if self.execute_errors.contains(&key) {
            bail!("connection reset executing {key}");
        }
        if self.failing.contains(&key) {
            return Ok(ExecutionResult::failed(step_id, format!("{key} reverted")));
        }
        if self.stuck.contains(&key) {
            return Ok(ExecutionResult::failed(step_id, format!("{key} receipt timed out"))
                .with_transaction("0xfeed", None));
        }
        Ok(ExecutionResult::success(step_id)
            .with_transaction(format!("0x{:064x}", self.executed()), Some(1))
            .with_amount(ctx.amount_for(step)))
    }

    fn fallback_fee(&self, step: &Step) -> FeeAmount {
        if self.chain.is_evm() {
            fees::evm_fallback(&self.chain, step.action)
        } else {
            fees::near_fallback(step.action)
        }
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────

pub const USER: &str = "0x000000000000000000000000000000000000dEaD";

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn logged(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn step(action: StepAction, protocol: &str, asset: &str, amount: &str) -> Step {
    Step {
        id: None,
        action,
        protocol: protocol.into(),
        asset: asset.into(),
        amount: Some(amount.into()),
        expected_apy: None,
        risk_score: None,
        dependencies: vec![],
    }
}

pub fn strategy(id: &str, steps: Vec<Step>) -> Strategy {
    Strategy {
        id: id.into(),
        goal: "maximize yield".into(),
        chains: vec![],
        protocols: steps.iter().map(|s| s.protocol.clone()).collect(),
        steps,
        risk_level: RiskLevel::Medium,
        estimated_apy: None,
        estimated_tvl: None,
        confidence: None,
        reasoning: None,
        warnings: vec![],
    }
}

pub fn context(strategy: Strategy) -> ExecutionContext {
    let mut ctx = ExecutionContext::new(strategy, USER);
    ctx.investment_amount = "1.0".into();
    ctx
}

/// Registry with the built-in routes and the given mocks.
pub fn registry(mocks: &[Arc<MockAdapter>]) -> Arc<AdapterRegistry> {
    let mut reg = AdapterRegistry::routes_only();
    for mock in mocks {
        reg = reg.with_adapter(mock.clone());
    }
    Arc::new(reg)
}

pub fn coordinator(mocks: &[Arc<MockAdapter>]) -> Coordinator {
    Coordinator::new(registry(mocks)).with_step_delay(Duration::ZERO)
}
