use serde::{Deserialize, Serialize};

use super::strategy::{Step, Strategy};

/// Transient input for one execution run. Never persisted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    /// Investor wallet: an EVM address or a NEAR account id.
    pub user_address: String,
    pub strategy: Strategy,
    pub wallet_kind: WalletKind,
    /// Decimal string, used for any step without its own amount.
    pub investment_amount: String,
    pub slippage_tolerance_percent: f64,
    pub gas_preference: GasPreference,
}

/// Which wallet the investor connected. A hint for adapter-side checks,
/// never an input to signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    #[default]
    Evm,
    Near,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasPreference {
    Slow,
    #[default]
    Standard,
    Fast,
}

impl ExecutionContext {
    pub fn new(strategy: Strategy, user_address: impl Into<String>) -> Self {
        ExecutionContext {
            user_address: user_address.into(),
            strategy,
            wallet_kind: WalletKind::default(),
            investment_amount: "0".into(),
            slippage_tolerance_percent: 0.5,
            gas_preference: GasPreference::default(),
        }
    }

    /// Amount a step should move: its own, else the run's investment amount.
    pub fn amount_for<'a>(&'a self, step: &'a Step) -> &'a str {
        step.amount
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(&self.investment_amount)
    }
}

impl GasPreference {
    /// Multipliers applied to (max fee, priority fee), in percent.
    pub fn fee_multipliers(&self) -> (u128, u128) {
        match self {
            GasPreference::Slow => (100, 50),
            GasPreference::Standard => (100, 100),
            GasPreference::Fast => (125, 200),
        }
    }
}

impl std::str::FromStr for GasPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slow" => Ok(GasPreference::Slow),
            "standard" | "normal" => Ok(GasPreference::Standard),
            "fast" => Ok(GasPreference::Fast),
            other => Err(format!("unknown gas preference '{other}' (slow|standard|fast)")),
        }
    }
}

impl std::str::FromStr for WalletKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "evm" | "metamask" => Ok(WalletKind::Evm),
            "near" => Ok(WalletKind::Near),
            other => Err(format!("unknown wallet kind '{other}' (evm|near)")),
        }
    }
}
