use alloy::primitives::utils::parse_units;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::model::{Chain, ExecutionContext, ExecutionResult, FeeAmount, Step, StepAction, ValidationOutcome};
use crate::validate::is_positive_decimal;

use super::contracts::protocol_family;
use super::fees;
use super::{AdapterSettings, ChainAdapter, with_timeout};

/// 1 TGas in raw NEAR gas units.
const GAS_PER_TGAS: u64 = 1_000_000_000_000;

// ── Method plans ───────────────────────────────────────────────────

/// How a (protocol, action) pair becomes a NEAR function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodPlan {
    /// `deposit_and_stake` on a liquid-staking pool, NEAR attached.
    DepositAndStake,
    /// `unstake { amount }` on a liquid-staking pool.
    Unstake,
    /// `ft_transfer_call` on the token contract, receiver = protocol.
    FtTransferCall,
}

fn method_plan(family: &str, action: StepAction) -> Option<MethodPlan> {
    use StepAction::*;
    match (family, action) {
        ("meta" | "linear", Stake | Deposit) => Some(MethodPlan::DepositAndStake),
        ("meta" | "linear", Withdraw) => Some(MethodPlan::Unstake),
        ("burrow", Deposit | YieldFarm) => Some(MethodPlan::FtTransferCall),
        ("ref", Deposit) => Some(MethodPlan::FtTransferCall),
        _ => None,
    }
}

fn protocol_account(family: &str) -> Option<&'static str> {
    match family {
        "meta" => Some("meta-pool.near"),
        "linear" => Some("linear-protocol.near"),
        "burrow" => Some("contract.main.burrow.near"),
        "ref" => Some("v2.ref-finance.near"),
        _ => None,
    }
}

pub(crate) fn has_call_plan(step: &Step) -> bool {
    let key = step.protocol_key();
    let family = protocol_family(&key);
    method_plan(family, step.action).is_some() && protocol_account(family).is_some()
}

/// Fungible token contract and decimals. Native NEAR moves as wNEAR.
fn token_account(symbol: &str) -> Option<(&'static str, u8)> {
    match symbol.to_uppercase().as_str() {
        "NEAR" | "WNEAR" => Some(("wrap.near", 24)),
        "USDC" => Some((
            "17208628f84f5d6ad33f0da3bbbeb27ffcb398eac501a31bd6ad2011e36133a1",
            6,
        )),
        "USDT" => Some(("usdt.tether-token.near", 6)),
        "STNEAR" => Some(("meta-pool.near", 24)),
        "LINEAR" => Some(("linear-protocol.near", 24)),
        _ => None,
    }
}

/// NEAR account id rules: 2..=64 chars of `a-z0-9` separated by single
/// `-`, `_` or `.`.
pub fn is_valid_account_id(id: &str) -> bool {
    if !(2..=64).contains(&id.len()) {
        return false;
    }
    let mut prev_separator = true;
    for c in id.chars() {
        let separator = matches!(c, '-' | '_' | '.');
        if separator && prev_separator {
            return false;
        }
        if !separator && !(c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return false;
        }
        prev_separator = separator;
    }
    !prev_separator
}

// ── Relayer wire types ─────────────────────────────────────────────

/// Function call handed to the relayer, which signs and broadcasts it.
#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    signer_id: &'a str,
    receiver_id: &'a str,
    method_name: &'a str,
    args: Value,
    /// Raw gas units.
    gas: u64,
    /// Attached deposit in yoctoNEAR.
    deposit: String,
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    transaction_hash: String,
    #[serde(default)]
    block_height: Option<u64>,
    #[serde(default)]
    gas_burnt: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

// ── NEAR adapter ───────────────────────────────────────────────────

/// Adapter for the NEAR account-model chain.
pub struct NearAdapter {
    chain: Chain,
    settings: AdapterSettings,
    client: reqwest::Client,
}

impl NearAdapter {
    pub fn new(chain: Chain, settings: &AdapterSettings) -> Result<Self> {
        if chain.is_evm() {
            bail!("NearAdapter cannot drive EVM chain {chain}");
        }
        let client = reqwest::Client::builder()
            .timeout(settings.call_timeout)
            .user_agent("yield-flow/0.1")
            .build()
            .context("creating NEAR HTTP client")?;

        Ok(NearAdapter {
            chain,
            settings: settings.clone(),
            client,
        })
    }

    fn plan_for(&self, step: &Step) -> std::result::Result<(MethodPlan, &'static str), String> {
        let key = step.protocol_key();
        let family = protocol_family(&key);
        let plan = method_plan(family, step.action).ok_or_else(|| {
            format!("{} does not support `{}` on {}", step.protocol, step.action, self.chain)
        })?;
        let account = protocol_account(family)
            .ok_or_else(|| format!("no {} contract known on {}", step.protocol, self.chain))?;
        Ok((plan, account))
    }

    /// `view_account` query. `Ok(false)` when the account does not exist.
    async fn account_exists(&self, account_id: &str) -> Result<bool> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "yield-flow",
            "method": "query",
            "params": {
                "request_type": "view_account",
                "finality": "final",
                "account_id": account_id,
            }
        });
        let resp: Value = self
            .client
            .post(self.chain.rpc_url())
            .json(&body)
            .send()
            .await
            .with_context(|| format!("view_account({account_id})"))?
            .error_for_status()?
            .json()
            .await
            .context("decoding view_account response")?;

        if resp.get("result").is_some() {
            return Ok(true);
        }
        let cause = resp
            .pointer("/error/cause/name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if cause == "UNKNOWN_ACCOUNT" {
            return Ok(false);
        }
        bail!("view_account({account_id}) failed: {}", resp["error"]);
    }

    fn build_call<'a>(
        &self,
        plan: MethodPlan,
        protocol_account: &'a str,
        step: &Step,
        ctx: &'a ExecutionContext,
    ) -> Result<RelayRequest<'a>> {
        let amount = ctx.amount_for(step).trim();
        let (token, decimals) = token_account(&step.asset)
            .with_context(|| format!("token '{}' not known on {}", step.asset, self.chain))?;
        let raw = parse_units(amount, decimals)
            .with_context(|| format!("amount `{amount}` does not fit {decimals} decimals"))?
            .get_absolute()
            .to_string();
        let gas = fees::near_tgas(step.action) * GAS_PER_TGAS;

        Ok(match plan {
            MethodPlan::DepositAndStake => RelayRequest {
                signer_id: &ctx.user_address,
                receiver_id: protocol_account,
                method_name: "deposit_and_stake",
                args: json!({}),
                gas,
                deposit: raw,
            },
            MethodPlan::Unstake => RelayRequest {
                signer_id: &ctx.user_address,
                receiver_id: protocol_account,
                method_name: "unstake",
                args: json!({ "amount": raw }),
                gas,
                deposit: "0".into(),
            },
            MethodPlan::FtTransferCall => RelayRequest {
                signer_id: &ctx.user_address,
                receiver_id: token,
                method_name: "ft_transfer_call",
                args: json!({
                    "receiver_id": protocol_account,
                    "amount": raw,
                    "msg": "",
                }),
                gas,
                // ft_transfer_call requires exactly one yoctoNEAR.
                deposit: "1".into(),
            },
        })
    }

    async fn submit(&self, step_id: &str, step: &Step, ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let (plan, account) = self.plan_for(step).map_err(anyhow::Error::msg)?;
        let call = self.build_call(plan, account, step, ctx)?;
        let amount = ctx.amount_for(step).trim().to_string();

        if self.settings.dry_run {
            info!(
                chain = %self.chain,
                step = step_id,
                receiver = call.receiver_id,
                method = call.method_name,
                "[dry run] would relay {}",
                step.label(),
            );
            return Ok(ExecutionResult::success(step_id).with_amount(amount));
        }

        let relayer = self
            .settings
            .near_relayer
            .as_deref()
            .context("no NEAR relayer configured (set YIELD_FLOW_NEAR_RELAYER)")?;

        let resp: RelayResponse = self
            .client
            .post(relayer)
            .json(&call)
            .send()
            .await
            .context("relaying NEAR function call")?
            .error_for_status()
            .context("relayer rejected the call")?
            .json()
            .await
            .context("decoding relayer response")?;

        if let Some(err) = resp.error {
            bail!("{} failed on-chain (tx {}): {}", call.method_name, resp.transaction_hash, err);
        }

        info!(
            chain = %self.chain,
            step = step_id,
            tx = %resp.transaction_hash,
            "{} confirmed",
            step.label(),
        );

        let mut result = ExecutionResult::success(step_id)
            .with_transaction(resp.transaction_hash, resp.block_height)
            .with_amount(amount);
        if let Some(gas) = resp.gas_burnt {
            result = result.with_gas_used(gas);
        }
        Ok(result)
    }
}

#[async_trait]
impl ChainAdapter for NearAdapter {
    fn chain(&self) -> &Chain {
        &self.chain
    }

    async fn validate(&self, step: &Step, ctx: &ExecutionContext) -> Result<ValidationOutcome> {
        if !is_valid_account_id(&ctx.user_address) {
            return Ok(ValidationOutcome::invalid(format!(
                "wallet `{}` is not a NEAR account id",
                ctx.user_address
            )));
        }
        if step.asset.trim().is_empty() {
            return Ok(ValidationOutcome::invalid("asset is empty"));
        }
        if !is_positive_decimal(ctx.amount_for(step)) {
            return Ok(ValidationOutcome::invalid("no positive amount to move"));
        }
        let (plan, account) = match self.plan_for(step) {
            Ok(found) => found,
            Err(reason) => return Ok(ValidationOutcome::invalid(reason)),
        };
        let Some((token, _)) = token_account(&step.asset) else {
            return Ok(ValidationOutcome::invalid(format!(
                "token {} not known on {}",
                step.asset, self.chain
            )));
        };
        if plan == MethodPlan::DepositAndStake && token != "wrap.near" {
            return Ok(ValidationOutcome::invalid(format!(
                "{} stakes native NEAR, got {}",
                step.protocol, step.asset
            )));
        }
        if !self.settings.dry_run && self.settings.near_relayer.is_none() {
            return Ok(ValidationOutcome::invalid(format!(
                "no NEAR relayer configured for {} (set YIELD_FLOW_NEAR_RELAYER)",
                self.chain
            )));
        }

        let exists = with_timeout(
            self.settings.call_timeout,
            "view_account",
            self.account_exists(account),
        )
        .await?;
        if !exists {
            return Ok(ValidationOutcome::invalid(format!(
                "contract account {account} does not exist on {}",
                self.chain
            )));
        }

        Ok(ValidationOutcome::valid())
    }

    /// NEAR attaches a fixed amount of prepaid gas per call, so the
    /// estimate is the bounded table value for the action.
    async fn estimate_fee(&self, step: &Step, _ctx: &ExecutionContext) -> Result<FeeAmount> {
        Ok(self.fallback_fee(step))
    }

    async fn execute(&self, step_id: &str, step: &Step, ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let label = format!("{} on {}", step.label(), self.chain);
        let outcome = with_timeout(self.settings.call_timeout, &label, self.submit(step_id, step, ctx)).await;

        Ok(match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(chain = %self.chain, step = step_id, "step failed: {e:#}");
                ExecutionResult::failed(step_id, format!("{e:#}"))
            }
        })
    }

    fn fallback_fee(&self, step: &Step) -> FeeAmount {
        fees::near_fallback(step.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeeUnit, Strategy};

    fn step(protocol: &str, action: StepAction, asset: &str) -> Step {
        Step {
            id: None,
            action,
            protocol: protocol.into(),
            asset: asset.into(),
            amount: Some("2.5".into()),
            expected_apy: None,
            risk_score: None,
            dependencies: vec![],
        }
    }

    fn ctx(user: &str) -> ExecutionContext {
        let strategy = Strategy {
            id: "s".into(),
            goal: "stake".into(),
            chains: vec!["near".into()],
            protocols: vec![],
            steps: vec![],
            risk_level: Default::default(),
            estimated_apy: None,
            estimated_tvl: None,
            confidence: None,
            reasoning: None,
            warnings: vec![],
        };
        let mut c = ExecutionContext::new(strategy, user);
        c.wallet_kind = crate::model::WalletKind::Near;
        c
    }

    #[test]
    fn account_ids() {
        assert!(is_valid_account_id("alice.near"));
        assert!(is_valid_account_id("v2.ref-finance.near"));
        assert!(is_valid_account_id(
            "17208628f84f5d6ad33f0da3bbbeb27ffcb398eac501a31bd6ad2011e36133a1"
        ));
        assert!(!is_valid_account_id("Alice.near"));
        assert!(!is_valid_account_id("alice..near"));
        assert!(!is_valid_account_id(".alice"));
        assert!(!is_valid_account_id("alice."));
        assert!(!is_valid_account_id("a"));
        assert!(!is_valid_account_id("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"));
    }

    #[test]
    fn stake_attaches_yocto_deposit() {
        let adapter = NearAdapter::new(Chain::near(), &AdapterSettings::default()).unwrap();
        let s = step("Meta-Pool", StepAction::Stake, "NEAR");
        let c = ctx("alice.near");
        let (plan, account) = adapter.plan_for(&s).unwrap();
        let call = adapter.build_call(plan, account, &s, &c).unwrap();
        assert_eq!(call.method_name, "deposit_and_stake");
        assert_eq!(call.receiver_id, "meta-pool.near");
        assert_eq!(call.deposit, "2500000000000000000000000");
        assert_eq!(call.gas, 50 * GAS_PER_TGAS);
    }

    #[test]
    fn burrow_deposit_goes_through_token_contract() {
        let adapter = NearAdapter::new(Chain::near(), &AdapterSettings::default()).unwrap();
        let s = step("burrow", StepAction::Deposit, "USDT");
        let c = ctx("alice.near");
        let (plan, account) = adapter.plan_for(&s).unwrap();
        let call = adapter.build_call(plan, account, &s, &c).unwrap();
        assert_eq!(call.receiver_id, "usdt.tether-token.near");
        assert_eq!(call.deposit, "1");
        assert_eq!(call.args["receiver_id"], "contract.main.burrow.near");
        assert_eq!(call.args["amount"], "2500000");
    }

    #[tokio::test]
    async fn unsupported_action_is_invalid_not_error() {
        let adapter = NearAdapter::new(Chain::near(), &AdapterSettings::default()).unwrap();
        let s = step("linear", StepAction::Leverage, "NEAR");
        let outcome = adapter.validate(&s, &ctx("alice.near")).await.unwrap();
        assert!(!outcome.valid);
        assert!(outcome.reason.unwrap().contains("does not support"));
    }

    #[tokio::test]
    async fn fee_is_bounded_tgas() {
        let adapter = NearAdapter::new(Chain::near(), &AdapterSettings::default()).unwrap();
        let s = step("meta-pool", StepAction::Stake, "NEAR");
        let fee = adapter.estimate_fee(&s, &ctx("alice.near")).await.unwrap();
        assert_eq!(fee.unit, FeeUnit::TGas);
        assert_eq!(fee.decimal(), "50");
    }

    #[tokio::test]
    async fn live_mode_needs_a_relayer() {
        let settings = AdapterSettings {
            dry_run: false,
            near_relayer: None,
            ..AdapterSettings::default()
        };
        let adapter = NearAdapter::new(Chain::near(), &settings).unwrap();
        let s = step("meta-pool", StepAction::Stake, "NEAR");
        let outcome = adapter.validate(&s, &ctx("alice.near")).await.unwrap();
        assert!(!outcome.valid);
        assert!(outcome.reason.unwrap().contains("no NEAR relayer"));
    }
}
