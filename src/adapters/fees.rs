//! Static fallback cost tables.
//!
//! Figures are base-chain (Ethereum L1) gas for a typical protocol
//! interaction including token approval, and NEAR prepaid TGas per call.

use crate::model::{Chain, FeeAmount, StepAction};

/// Gas of a standalone ERC20 `approve`.
pub const APPROVE_GAS: u64 = 46_000;

/// Maximum TGas a single NEAR function call may attach.
pub const MAX_PREPAID_TGAS: u64 = 300;

/// Conservative L1 gas for one step of the given kind.
pub fn base_chain_gas(action: StepAction) -> u64 {
    match action {
        StepAction::Deposit => 150_000,
        StepAction::Stake => 200_000,
        StepAction::YieldFarm => 250_000,
        StepAction::ProvideLiquidity => 300_000,
        StepAction::Leverage => 450_000,
        StepAction::Bridge => 350_000,
        StepAction::Swap => 180_000,
        StepAction::Withdraw => 120_000,
    }
}

/// Fallback EVM fee for `chain`: the base-chain figure scaled down on rollups.
pub fn evm_fallback(chain: &Chain, action: StepAction) -> FeeAmount {
    FeeAmount::gas(base_chain_gas(action) / chain.fee_divisor())
}

/// Prepaid TGas for a NEAR function call of the given kind, within 1..=300.
pub fn near_tgas(action: StepAction) -> u64 {
    let tgas = match action {
        StepAction::Deposit => 30,
        StepAction::Stake => 50,
        StepAction::YieldFarm => 100,
        StepAction::ProvideLiquidity => 150,
        StepAction::Leverage => 200,
        StepAction::Bridge => 250,
        StepAction::Swap => 100,
        StepAction::Withdraw => 50,
    };
    tgas.clamp(1, MAX_PREPAID_TGAS)
}

pub fn near_fallback(action: StepAction) -> FeeAmount {
    FeeAmount::tgas(near_tgas(action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollup_fallback_is_a_tenth_of_base() {
        let l1 = evm_fallback(&Chain::ethereum(), StepAction::Deposit);
        let l2 = evm_fallback(&Chain::arbitrum(), StepAction::Deposit);
        assert_eq!(l1.decimal(), "150000");
        assert_eq!(l2.decimal(), "15000");
    }

    #[test]
    fn near_estimates_are_bounded() {
        for action in StepAction::ALL {
            let t = near_tgas(action);
            assert!((1..=MAX_PREPAID_TGAS).contains(&t), "{action}: {t}");
            assert!(t < base_chain_gas(action));
        }
    }
}
