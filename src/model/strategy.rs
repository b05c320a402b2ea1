use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A generated yield strategy: an ordered plan of on-chain steps.
///
/// Execution order is declaration order. The document is immutable once
/// generated; the executor never rewrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    /// Unique strategy identifier. Required.
    pub id: String,
    /// The natural-language goal the strategy was generated from.
    pub goal: String,
    /// Chains the strategy touches (informational; routing uses the registry).
    #[serde(default)]
    pub chains: Vec<String>,
    /// Protocols the strategy touches (informational).
    #[serde(default)]
    pub protocols: Vec<String>,
    /// Ordered steps. Must contain at least one.
    pub steps: Vec<Step>,
    #[serde(default, alias = "risk_level")]
    pub risk_level: RiskLevel,
    /// Blended APY estimate, in percent.
    #[serde(default, alias = "estimated_apy", skip_serializing_if = "Option::is_none")]
    pub estimated_apy: Option<f64>,
    /// Estimated TVL of the target positions, as a decimal string.
    #[serde(default, alias = "estimated_tvl", skip_serializing_if = "Option::is_none")]
    pub estimated_tvl: Option<String>,
    /// Generator confidence in 0.0..=1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// One atomic on-chain action bound to a protocol and asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Explicit step identifier. Defaults to `step-<n>` (1-based position).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub action: StepAction,
    /// Protocol name, matched case-insensitively against the route table.
    pub protocol: String,
    /// Asset symbol (e.g. "ETH", "USDC", "NEAR").
    pub asset: String,
    /// Amount as a decimal string. Falls back to the run's investment amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, alias = "expected_apy", skip_serializing_if = "Option::is_none")]
    pub expected_apy: Option<f64>,
    /// Risk score in 0.0..=10.0.
    #[serde(default, alias = "risk_score", skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// Ids of steps that must have completed before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StepAction {
    Deposit,
    Stake,
    #[serde(alias = "yield_farm")]
    YieldFarm,
    #[serde(alias = "provide_liquidity")]
    ProvideLiquidity,
    Leverage,
    Bridge,
    Swap,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

// ── Methods ──────────────────────────────────────────────────────────

impl Strategy {
    /// Identifier of the step at `index`.
    pub fn step_id(&self, index: usize) -> String {
        self.steps
            .get(index)
            .map(|s| s.id_at(index))
            .unwrap_or_else(|| default_step_id(index))
    }
}

impl Step {
    /// The step's identifier given its position in the strategy.
    pub fn id_at(&self, index: usize) -> String {
        match &self.id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => default_step_id(index),
        }
    }

    /// Protocol name normalized for route and contract lookups.
    pub fn protocol_key(&self) -> String {
        self.protocol.trim().to_lowercase()
    }

    pub fn label(&self) -> String {
        format!("{} {} on {}", self.action, self.asset, self.protocol)
    }
}

fn default_step_id(index: usize) -> String {
    format!("step-{}", index + 1)
}

impl StepAction {
    pub const ALL: [StepAction; 8] = [
        StepAction::Deposit,
        StepAction::Stake,
        StepAction::YieldFarm,
        StepAction::ProvideLiquidity,
        StepAction::Leverage,
        StepAction::Bridge,
        StepAction::Swap,
        StepAction::Withdraw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepAction::Deposit => "deposit",
            StepAction::Stake => "stake",
            StepAction::YieldFarm => "yield-farm",
            StepAction::ProvideLiquidity => "provide-liquidity",
            StepAction::Leverage => "leverage",
            StepAction::Bridge => "bridge",
            StepAction::Swap => "swap",
            StepAction::Withdraw => "withdraw",
        }
    }
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("low"),
            RiskLevel::Medium => f.write_str("medium"),
            RiskLevel::High => f.write_str("high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_and_snake_case_documents() {
        let json = r#"{
            "id": "s1",
            "goal": "earn on ETH",
            "steps": [
                {"action": "deposit", "protocol": "Aave", "asset": "ETH", "expectedApy": 3.1},
                {"id": "lido", "action": "yield_farm", "protocol": "Lido", "asset": "ETH", "risk_score": 2.0}
            ],
            "risk_level": "low"
        }"#;
        let s: Strategy = serde_json::from_str(json).unwrap();
        assert_eq!(s.risk_level, RiskLevel::Low);
        assert_eq!(s.steps[0].expected_apy, Some(3.1));
        assert_eq!(s.steps[1].action, StepAction::YieldFarm);
        assert_eq!(s.steps[1].risk_score, Some(2.0));
        assert_eq!(s.step_id(0), "step-1");
        assert_eq!(s.step_id(1), "lido");
    }

    #[test]
    fn protocol_key_is_lowercased() {
        let step = Step {
            id: None,
            action: StepAction::Stake,
            protocol: "  Lido ".into(),
            asset: "ETH".into(),
            amount: None,
            expected_apy: None,
            risk_score: None,
            dependencies: vec![],
        };
        assert_eq!(step.protocol_key(), "lido");
    }
}
