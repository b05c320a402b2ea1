use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::CoordinatorError;
use crate::model::{ExecutionContext, FeeAmount, FeeTotals};
use crate::registry::AdapterRegistry;

/// Sum per-step fee estimates into per-chain totals.
///
/// Same-chain fees are added as integers. A chain with no steps is absent
/// from the result. An adapter that errors despite the fallback contract
/// contributes its static fallback instead.
pub async fn estimate_for_strategy(
    registry: &AdapterRegistry,
    ctx: &ExecutionContext,
) -> Result<FeeTotals, CoordinatorError> {
    let mut totals: BTreeMap<String, FeeAmount> = BTreeMap::new();

    for (i, step) in ctx.strategy.steps.iter().enumerate() {
        let resolved = registry.resolve(step)?;
        let fee = match resolved.adapter.estimate_fee(step, ctx).await {
            Ok(fee) => fee,
            Err(e) => {
                warn!(
                    step = %step.id_at(i),
                    chain = %resolved.chain,
                    "fee estimate failed, using fallback: {e:#}"
                );
                resolved.adapter.fallback_fee(step)
            }
        };
        debug!(step = %step.id_at(i), chain = %resolved.chain, %fee, "estimated");

        let total = match totals.get(&resolved.chain) {
            Some(prev) => prev
                .checked_add(&fee)
                .ok_or_else(|| CoordinatorError::MixedFeeUnits {
                    chain: resolved.chain.clone(),
                    first: prev.unit.to_string(),
                    second: fee.unit.to_string(),
                })?,
            None => fee,
        };
        totals.insert(resolved.chain, total);
    }

    Ok(FeeTotals(totals))
}
