use alloy::contract::{CallBuilder, CallDecoder};
use alloy::network::EthereumWallet;
use alloy::primitives::utils::parse_units;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::model::{
    Chain, ExecutionContext, ExecutionResult, FeeAmount, GasPreference, Step, ValidationOutcome,
};
use crate::validate::is_positive_decimal;

use super::contracts::{
    self, CallPlan, IAavePool, IComet, IERC20, ILido, call_plan, protocol_contract, protocol_family,
};
use super::fees::{self, APPROVE_GAS};
use super::{AdapterSettings, ChainAdapter, with_timeout};

/// Signing client, built once from the configured key.
struct SigningClient {
    address: Address,
    provider: DynProvider,
}

/// EIP-1559 caps for one submission.
struct FeeCaps {
    max_fee_per_gas: u128,
    max_priority_fee_per_gas: u128,
}

/// Token and raw amount a step moves.
struct Funding {
    /// ERC20 address, or zero for native ETH.
    token: Address,
    amount: U256,
}

pub(crate) fn has_call_plan(chain: &Chain, step: &Step) -> bool {
    let key = step.protocol_key();
    let family = protocol_family(&key);
    call_plan(family, step.action).is_some() && protocol_contract(chain, family).is_some()
}

/// Adapter for one EVM chain (L1 or rollup).
pub struct EvmAdapter {
    chain: Chain,
    settings: AdapterSettings,
    reader: DynProvider,
    signer: Option<SigningClient>,
}

impl EvmAdapter {
    pub fn new(chain: Chain, settings: &AdapterSettings) -> Result<Self> {
        if !chain.is_evm() {
            bail!("EvmAdapter cannot drive non-EVM chain {chain}");
        }
        let url: reqwest::Url = chain
            .rpc_url()
            .parse()
            .with_context(|| format!("Invalid RPC URL for chain {chain}"))?;

        let reader = ProviderBuilder::new().connect_http(url.clone()).erased();

        let signer = match &settings.private_key {
            Some(key) => {
                let signer: PrivateKeySigner = key
                    .parse()
                    .map_err(|e| anyhow!("Invalid private key: {e}"))?;
                let address = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(url)
                    .erased();
                Some(SigningClient { address, provider })
            }
            None => None,
        };

        Ok(EvmAdapter {
            chain,
            settings: settings.clone(),
            reader,
            signer,
        })
    }

    /// Resolve the call plan and target contract, or the reason there is none.
    fn plan_for(&self, step: &Step) -> std::result::Result<(CallPlan, Address), String> {
        let key = step.protocol_key();
        let family = protocol_family(&key);
        let plan = call_plan(family, step.action).ok_or_else(|| {
            format!(
                "{} does not support `{}` on {}",
                step.protocol, step.action, self.chain
            )
        })?;
        let contract = protocol_contract(&self.chain, family).ok_or_else(|| {
            format!("no {} contract known on {}", step.protocol, self.chain)
        })?;
        Ok((plan, contract))
    }

    async fn funding(&self, plan: CallPlan, step: &Step, ctx: &ExecutionContext) -> Result<Funding> {
        let amount = ctx.amount_for(step).trim();
        if plan.is_payable() {
            let units = parse_units(amount, 18u8)
                .with_context(|| format!("amount `{amount}` is not a valid ETH amount"))?;
            return Ok(Funding {
                token: Address::ZERO,
                amount: units.get_absolute(),
            });
        }

        let token = contracts::token_address(&self.chain, &step.asset)
            .with_context(|| format!("token '{}' not known on {}", step.asset, self.chain))?;
        let decimals = IERC20::new(token, &self.reader)
            .decimals()
            .call()
            .await
            .with_context(|| format!("decimals() call failed for {} on {}", step.asset, self.chain))?;
        let units = parse_units(amount, decimals)
            .with_context(|| format!("amount `{amount}` does not fit {decimals} decimals"))?;
        Ok(Funding {
            token,
            amount: units.get_absolute(),
        })
    }

    async fn live_estimate(&self, plan: CallPlan, contract: Address, step: &Step, ctx: &ExecutionContext) -> Result<u64> {
        let from: Address = ctx.user_address.parse()?;
        let funding = self.funding(plan, step, ctx).await?;
        let rp = &self.reader;

        let gas = match plan {
            CallPlan::AaveSupply => {
                IAavePool::new(contract, rp)
                    .supply(funding.token, funding.amount, from, 0)
                    .from(from)
                    .estimate_gas()
                    .await?
            }
            CallPlan::AaveWithdraw => {
                IAavePool::new(contract, rp)
                    .withdraw(funding.token, funding.amount, from)
                    .from(from)
                    .estimate_gas()
                    .await?
            }
            CallPlan::CometSupply => {
                IComet::new(contract, rp)
                    .supply(funding.token, funding.amount)
                    .from(from)
                    .estimate_gas()
                    .await?
            }
            CallPlan::CometWithdraw => {
                IComet::new(contract, rp)
                    .withdraw(funding.token, funding.amount)
                    .from(from)
                    .estimate_gas()
                    .await?
            }
            CallPlan::LidoSubmit => {
                ILido::new(contract, rp)
                    .submit(Address::ZERO)
                    .value(funding.amount)
                    .from(from)
                    .estimate_gas()
                    .await?
            }
        };

        let approval = if plan.needs_approval() { APPROVE_GAS } else { 0 };
        Ok(gas + approval)
    }

    async fn fee_caps(&self, preference: GasPreference) -> Result<FeeCaps> {
        let est = self
            .reader
            .estimate_eip1559_fees()
            .await
            .context("estimating EIP-1559 fees")?;
        let (max_pct, priority_pct) = preference.fee_multipliers();
        let max_priority_fee_per_gas = est.max_priority_fee_per_gas * priority_pct / 100;
        let max_fee_per_gas = (est.max_fee_per_gas * max_pct / 100).max(max_priority_fee_per_gas);
        Ok(FeeCaps {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        })
    }

    /// Every broadcast hash is pushed to `sent` before its receipt is awaited.
    async fn submit(
        &self,
        step_id: &str,
        step: &Step,
        ctx: &ExecutionContext,
        sent: &mut Vec<String>,
    ) -> Result<ExecutionResult> {
        let (plan, contract) = self.plan_for(step).map_err(anyhow::Error::msg)?;
        let funding = self.funding(plan, step, ctx).await?;
        let amount = ctx.amount_for(step).trim().to_string();

        if self.settings.dry_run {
            info!(
                chain = %self.chain,
                step = step_id,
                contract = %contract,
                "[dry run] would submit {} ({} raw units)",
                step.label(),
                funding.amount,
            );
            return Ok(ExecutionResult::success(step_id).with_amount(amount));
        }

        let signer = self
            .signer
            .as_ref()
            .context("no signing key configured (set YIELD_FLOW_PRIVATE_KEY)")?;
        let fees = self.fee_caps(ctx.gas_preference).await?;
        let provider = &signer.provider;
        let owner = signer.address;
        let mut gas_used = 0u64;

        if plan.needs_approval() {
            let receipt = send_call(
                IERC20::new(funding.token, provider).approve(contract, funding.amount),
                &fees,
                "approve",
                sent,
            )
            .await?;
            debug!(chain = %self.chain, step = step_id, tx = ?receipt.transaction_hash, "approve confirmed");
            gas_used += receipt.gas_used;
        }

        let receipt = match plan {
            CallPlan::AaveSupply => {
                send_call(
                    IAavePool::new(contract, provider).supply(funding.token, funding.amount, owner, 0),
                    &fees,
                    "supply",
                    sent,
                )
                .await?
            }
            CallPlan::AaveWithdraw => {
                send_call(
                    IAavePool::new(contract, provider).withdraw(funding.token, funding.amount, owner),
                    &fees,
                    "withdraw",
                    sent,
                )
                .await?
            }
            CallPlan::CometSupply => {
                send_call(
                    IComet::new(contract, provider).supply(funding.token, funding.amount),
                    &fees,
                    "supply",
                    sent,
                )
                .await?
            }
            CallPlan::CometWithdraw => {
                send_call(
                    IComet::new(contract, provider).withdraw(funding.token, funding.amount),
                    &fees,
                    "withdraw",
                    sent,
                )
                .await?
            }
            CallPlan::LidoSubmit => {
                send_call(
                    ILido::new(contract, provider)
                        .submit(Address::ZERO)
                        .value(funding.amount),
                    &fees,
                    "submit",
                    sent,
                )
                .await?
            }
        };
        gas_used += receipt.gas_used;

        info!(
            chain = %self.chain,
            step = step_id,
            tx = ?receipt.transaction_hash,
            gas_used,
            "{} confirmed",
            step.label(),
        );

        Ok(ExecutionResult::success(step_id)
            .with_transaction(format!("{:?}", receipt.transaction_hash), receipt.block_number)
            .with_gas_used(gas_used)
            .with_amount(amount))
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn chain(&self) -> &Chain {
        &self.chain
    }

    async fn validate(&self, step: &Step, ctx: &ExecutionContext) -> Result<ValidationOutcome> {
        let Ok(user) = ctx.user_address.parse::<Address>() else {
            return Ok(ValidationOutcome::invalid(format!(
                "wallet `{}` is not an EVM address",
                ctx.user_address
            )));
        };
        if step.asset.trim().is_empty() {
            return Ok(ValidationOutcome::invalid("asset is empty"));
        }
        if !is_positive_decimal(ctx.amount_for(step)) {
            return Ok(ValidationOutcome::invalid("no positive amount to move"));
        }
        let (plan, contract) = match self.plan_for(step) {
            Ok(found) => found,
            Err(reason) => return Ok(ValidationOutcome::invalid(reason)),
        };
        if plan.is_payable() {
            if !contracts::is_native_eth(&step.asset) {
                return Ok(ValidationOutcome::invalid(format!(
                    "{} only accepts native ETH, got {}",
                    step.protocol, step.asset
                )));
            }
        } else if contracts::token_address(&self.chain, &step.asset).is_none() {
            return Ok(ValidationOutcome::invalid(format!(
                "token {} not known on {}",
                step.asset, self.chain
            )));
        }
        if !self.settings.dry_run {
            let Some(signer) = &self.signer else {
                return Ok(ValidationOutcome::invalid(format!(
                    "no signing key configured for {} (set YIELD_FLOW_PRIVATE_KEY)",
                    self.chain
                )));
            };
            if signer.address != user {
                return Ok(ValidationOutcome::invalid(format!(
                    "signing key controls {}, not {}",
                    signer.address, user
                )));
            }
        }

        let code = with_timeout(self.settings.call_timeout, "eth_getCode", async {
            self.reader
                .get_code_at(contract)
                .await
                .with_context(|| format!("eth_getCode({contract}) on {}", self.chain))
        })
        .await?;
        if code.is_empty() {
            return Ok(ValidationOutcome::invalid(format!(
                "no contract deployed at {contract} on {}",
                self.chain
            )));
        }

        Ok(ValidationOutcome::valid())
    }

    async fn estimate_fee(&self, step: &Step, ctx: &ExecutionContext) -> Result<FeeAmount> {
        let Ok((plan, contract)) = self.plan_for(step) else {
            return Ok(self.fallback_fee(step));
        };
        let live = with_timeout(
            self.settings.call_timeout,
            "eth_estimateGas",
            self.live_estimate(plan, contract, step, ctx),
        )
        .await;

        match live {
            Ok(gas) => Ok(FeeAmount::gas(gas)),
            Err(e) => {
                debug!(chain = %self.chain, protocol = %step.protocol, "live gas estimate unavailable, using fallback: {e:#}");
                Ok(self.fallback_fee(step))
            }
        }
    }

    async fn execute(&self, step_id: &str, step: &Step, ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let label = format!("{} on {}", step.label(), self.chain);
        let mut sent = Vec::new();
        let outcome = with_timeout(
            self.settings.call_timeout,
            &label,
            self.submit(step_id, step, ctx, &mut sent),
        )
        .await;

        Ok(match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(chain = %self.chain, step = step_id, "step failed: {e:#}");
                failed_after(step_id, &e, &sent)
            }
        })
    }

    fn fallback_fee(&self, step: &Step) -> FeeAmount {
        fees::evm_fallback(&self.chain, step.action)
    }
}

async fn send_call<P, D>(
    call: CallBuilder<P, D>,
    fees: &FeeCaps,
    label: &str,
    sent: &mut Vec<String>,
) -> Result<TransactionReceipt>
where
    P: Provider,
    D: CallDecoder + Send + Sync,
{
    let pending = call
        .max_fee_per_gas(fees.max_fee_per_gas)
        .max_priority_fee_per_gas(fees.max_priority_fee_per_gas)
        .send()
        .await
        .with_context(|| format!("{label} failed"))?;
    sent.push(format!("{:?}", pending.tx_hash()));

    let receipt = pending
        .get_receipt()
        .await
        .with_context(|| format!("{label} receipt"))?;
    require_success(&receipt, label)?;
    Ok(receipt)
}

/// Failed result for a step that errored. Once anything was broadcast the
/// last hash is kept, so the step is not blindly resubmitted on resume.
fn failed_after(step_id: &str, err: &anyhow::Error, sent: &[String]) -> ExecutionResult {
    match sent.last() {
        Some(hash) => ExecutionResult::failed(
            step_id,
            format!("{err:#} (after broadcasting {})", sent.join(", ")),
        )
        .with_transaction(hash.clone(), None),
        None => ExecutionResult::failed(step_id, format!("{err:#}")),
    }
}

fn require_success(receipt: &TransactionReceipt, label: &str) -> Result<()> {
    if !receipt.status() {
        bail!(
            "{} tx reverted (hash: {:?}, gas_used: {:?})",
            label,
            receipt.transaction_hash,
            receipt.gas_used,
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StepAction, Strategy};

    const USER: &str = "0x000000000000000000000000000000000000dEaD";

    fn adapter() -> EvmAdapter {
        EvmAdapter::new(Chain::ethereum(), &AdapterSettings::default()).unwrap()
    }

    fn step(protocol: &str, action: StepAction, asset: &str) -> Step {
        Step {
            id: None,
            action,
            protocol: protocol.into(),
            asset: asset.into(),
            amount: Some("1.0".into()),
            expected_apy: None,
            risk_score: None,
            dependencies: vec![],
        }
    }

    fn ctx(user: &str, steps: Vec<Step>) -> ExecutionContext {
        let strategy = Strategy {
            id: "evm-test".into(),
            goal: "test".into(),
            chains: vec![],
            protocols: vec![],
            steps,
            risk_level: Default::default(),
            estimated_apy: None,
            estimated_tvl: None,
            confidence: None,
            reasoning: None,
            warnings: vec![],
        };
        ExecutionContext::new(strategy, user)
    }

    #[test]
    fn refuses_account_model_chains() {
        assert!(EvmAdapter::new(Chain::near(), &AdapterSettings::default()).is_err());
    }

    #[tokio::test]
    async fn rejects_before_touching_the_network() {
        let evm = adapter();

        let s = step("aave", StepAction::Deposit, "USDC");
        let out = evm.validate(&s, &ctx("alice.near", vec![s.clone()])).await.unwrap();
        assert!(!out.valid);
        assert!(out.reason.unwrap().contains("not an EVM address"));

        let s = step("lido", StepAction::Stake, "USDC");
        let out = evm.validate(&s, &ctx(USER, vec![s.clone()])).await.unwrap();
        assert!(out.reason.unwrap().contains("only accepts native ETH"));

        let s = step("aave", StepAction::Leverage, "ETH");
        let out = evm.validate(&s, &ctx(USER, vec![s.clone()])).await.unwrap();
        assert!(out.reason.unwrap().contains("does not support"));
    }

    #[tokio::test]
    async fn unplanned_steps_estimate_from_the_table() {
        let evm = adapter();
        let s = step("uniswap", StepAction::Swap, "USDC");
        let fee = evm.estimate_fee(&s, &ctx(USER, vec![s.clone()])).await.unwrap();
        assert_eq!(fee, FeeAmount::gas(180_000));
    }

    #[tokio::test]
    async fn live_mode_needs_a_signing_key() {
        let settings = AdapterSettings {
            dry_run: false,
            ..AdapterSettings::default()
        };
        let evm = EvmAdapter::new(Chain::ethereum(), &settings).unwrap();
        let s = step("lido", StepAction::Stake, "ETH");
        let out = evm.validate(&s, &ctx(USER, vec![s.clone()])).await.unwrap();
        assert!(!out.valid);
        assert!(out.reason.unwrap().contains("no signing key"));
    }

    #[tokio::test]
    async fn live_mode_key_must_match_the_wallet() {
        // Well-known anvil account #0
        let settings = AdapterSettings {
            dry_run: false,
            private_key: Some(
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".into(),
            ),
            ..AdapterSettings::default()
        };
        let evm = EvmAdapter::new(Chain::ethereum(), &settings).unwrap();
        let s = step("lido", StepAction::Stake, "ETH");
        let out = evm.validate(&s, &ctx(USER, vec![s.clone()])).await.unwrap();
        assert!(!out.valid);
        assert!(out.reason.unwrap().contains("signing key controls"));
    }

    #[test]
    fn failure_after_broadcast_keeps_the_hash() {
        let err = anyhow!("supply on ethereum timed out after 60s");
        let before = failed_after("step-1", &err, &[]);
        assert!(before.transaction_hash.is_none());
        assert!(!before.was_broadcast());

        let sent = vec!["0xaa".to_string(), "0xbb".to_string()];
        let after = failed_after("step-1", &err, &sent);
        assert!(after.is_failed());
        assert!(after.was_broadcast());
        assert_eq!(after.transaction_hash.as_deref(), Some("0xbb"));
        assert!(after.error.unwrap().contains("after broadcasting 0xaa, 0xbb"));
    }
}
