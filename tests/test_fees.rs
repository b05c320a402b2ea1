mod mock_common;

use std::sync::Arc;

use yield_flow::model::{Chain, FeeAmount, FeeUnit, StepAction};
use yield_flow::{CoordinatorError, ResolutionError};

use mock_common::*;

#[tokio::test]
async fn same_chain_fees_add_as_integers() {
    let log = new_log();
    let eth = Arc::new(MockAdapter::new(Chain::ethereum(), &log));
    let coord = coordinator(&[eth.clone()]);

    let ctx = context(strategy(
        "eth-yield",
        vec![
            step(StepAction::Deposit, "aave", "ETH", "1.0"),
            step(StepAction::Stake, "lido", "ETH", "1.0"),
        ],
    ));
    let totals = coord.estimate_for_strategy(&ctx).await.unwrap();

    assert_eq!(totals.len(), 1);
    let fee = totals.get("ethereum").unwrap();
    assert_eq!(fee.decimal(), "350000");
    assert_eq!(fee.unit, FeeUnit::Gas);
    assert_eq!(eth.estimated(), 2);
    // estimating never executes
    assert_eq!(eth.executed(), 0);
}

#[tokio::test]
async fn chains_are_summed_separately_and_untouched_chains_are_absent() {
    let log = new_log();
    let eth = Arc::new(MockAdapter::new(Chain::ethereum(), &log));
    let arb = Arc::new(MockAdapter::new(Chain::arbitrum(), &log));
    let base = Arc::new(MockAdapter::new(Chain::base(), &log));
    let near = Arc::new(MockAdapter::new(Chain::near(), &log));
    let coord = coordinator(&[eth, arb, base, near]);

    let ctx = context(strategy(
        "spread",
        vec![
            step(StepAction::YieldFarm, "gmx", "USDC", "10"),
            step(StepAction::Deposit, "radiant", "USDC", "10"),
            step(StepAction::Stake, "meta-pool", "NEAR", "10"),
            step(StepAction::Deposit, "burrow", "USDC", "10"),
        ],
    ));
    let totals = coord.estimate_for_strategy(&ctx).await.unwrap();

    assert_eq!(
        totals.as_decimal_map().into_iter().collect::<Vec<_>>(),
        vec![
            ("arbitrum".to_string(), "40000".to_string()),
            ("near".to_string(), "80".to_string()),
        ]
    );
    assert_eq!(totals.get("near"), Some(&FeeAmount::tgas(80)));
    assert!(totals.get("base").is_none());
    assert!(totals.get("ethereum").is_none());
}

#[tokio::test]
async fn failing_estimator_contributes_its_fallback() {
    let log = new_log();
    let eth = Arc::new(MockAdapter::new(Chain::ethereum(), &log).estimate_erroring());
    let coord = coordinator(&[eth.clone()]);

    let ctx = context(strategy(
        "oracle-down",
        vec![
            step(StepAction::Withdraw, "aave", "USDC", "5"),
            step(StepAction::Swap, "uniswap", "USDC", "5"),
        ],
    ));
    let totals = coord.estimate_for_strategy(&ctx).await.unwrap();

    assert_eq!(totals.get("ethereum").unwrap().decimal(), "300000");
    assert_eq!(eth.estimated(), 2);
}

#[tokio::test]
async fn unroutable_step_fails_the_estimate() {
    let log = new_log();
    let eth = Arc::new(MockAdapter::new(Chain::ethereum(), &log));
    let coord = coordinator(&[eth]);

    let ctx = context(strategy(
        "no-near",
        vec![
            step(StepAction::Deposit, "aave", "ETH", "1"),
            step(StepAction::Stake, "linear", "NEAR", "1"),
        ],
    ));
    let err = coord.estimate_for_strategy(&ctx).await.unwrap_err();

    match err {
        CoordinatorError::Resolution(ResolutionError::NoAdapter { protocol, chain }) => {
            assert_eq!(protocol, "linear");
            assert_eq!(chain, "near");
        }
        other => panic!("expected a resolution error, got {other}"),
    }
}

#[tokio::test]
async fn unknown_protocol_is_priced_on_the_default_chain() {
    let log = new_log();
    let eth = Arc::new(MockAdapter::new(Chain::ethereum(), &log));
    let coord = coordinator(&[eth.clone()]);

    let ctx = context(strategy(
        "mystery",
        vec![step(StepAction::ProvideLiquidity, "shiny-amm", "USDC", "1")],
    ));
    let totals = coord.estimate_for_strategy(&ctx).await.unwrap();

    assert_eq!(totals.get("ethereum").unwrap().decimal(), "300000");
}
