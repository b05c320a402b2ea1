use crate::model::{RiskLevel, Step, StepAction, Strategy};

/// The two-step ETH strategy used in docs and tests: supply on Aave,
/// then stake the rest with Lido.
pub fn example_strategy() -> Strategy {
    Strategy {
        id: "eth-yield-aave-lido".into(),
        goal: "Earn yield on 2 ETH with low risk".into(),
        chains: vec!["ethereum".into()],
        protocols: vec!["aave".into(), "lido".into()],
        steps: vec![
            Step {
                id: None,
                action: StepAction::Deposit,
                protocol: "aave".into(),
                asset: "ETH".into(),
                amount: Some("1.0".into()),
                expected_apy: Some(2.1),
                risk_score: Some(2.0),
                dependencies: vec![],
            },
            Step {
                id: None,
                action: StepAction::Stake,
                protocol: "lido".into(),
                asset: "ETH".into(),
                amount: Some("1.0".into()),
                expected_apy: Some(3.4),
                risk_score: Some(2.5),
                dependencies: vec!["step-1".into()],
            },
        ],
        risk_level: RiskLevel::Low,
        estimated_apy: Some(2.75),
        estimated_tvl: Some("2.0".into()),
        confidence: Some(0.8),
        reasoning: Some(
            "Blue-chip lending plus liquid staking on the base chain; \
             no bridging, no leverage."
                .into(),
        ),
        warnings: vec!["Lido stETH can trade below ETH in stressed markets.".into()],
    }
}

/// Print the example strategy JSON to stdout.
pub fn run() -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&example_strategy())?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_is_valid() {
        let strategy = example_strategy();
        assert!(crate::validate::validate(&strategy).is_ok());

        let json = serde_json::to_string(&strategy).unwrap();
        let back = crate::validate::parse_and_validate(&json).unwrap();
        assert_eq!(back, strategy);
    }
}
