use serde::{Deserialize, Serialize};

/// Execution model of a network. Decides which adapter family drives it
/// and which native fee unit its estimates are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    /// EVM L1: gas-metered, fee market, the reference cost.
    EvmBase,
    /// EVM rollup settling to the base chain. Execution cost is modeled
    /// as a fraction of the base-chain equivalent.
    EvmRollup,
    /// Account-model chain with prepaid gas per function call (NEAR).
    AccountModel,
}

/// A blockchain network a strategy step can land on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chain {
    /// Lower-case chain identifier, used as the key in fee maps and routes.
    pub name: String,
    pub kind: ChainKind,
    /// EVM chain ID. `None` for non-EVM chains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
}

/// Name of the chain every unrouted protocol falls back to.
pub const BASE_CHAIN: &str = "ethereum";

/// Rollup execution cost relative to the base chain (1/N).
pub const ROLLUP_FEE_DIVISOR: u64 = 10;

// ── Methods ──────────────────────────────────────────────────────────

impl Chain {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn is_evm(&self) -> bool {
        matches!(self.kind, ChainKind::EvmBase | ChainKind::EvmRollup)
    }

    /// Divisor applied to base-chain gas figures when a live estimate
    /// is unavailable.
    pub fn fee_divisor(&self) -> u64 {
        match self.kind {
            ChainKind::EvmRollup => ROLLUP_FEE_DIVISOR,
            ChainKind::EvmBase | ChainKind::AccountModel => 1,
        }
    }

    /// Same chain pointed at a different RPC endpoint.
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }
}

// ── Convenience constructors ─────────────────────────────────────────

impl Chain {
    pub fn ethereum() -> Self {
        Chain {
            name: "ethereum".into(),
            kind: ChainKind::EvmBase,
            chain_id: Some(1),
            rpc_url: "https://eth.llamarpc.com".into(),
        }
    }
    pub fn arbitrum() -> Self {
        Chain {
            name: "arbitrum".into(),
            kind: ChainKind::EvmRollup,
            chain_id: Some(42161),
            rpc_url: "https://arb1.arbitrum.io/rpc".into(),
        }
    }
    pub fn optimism() -> Self {
        Chain {
            name: "optimism".into(),
            kind: ChainKind::EvmRollup,
            chain_id: Some(10),
            rpc_url: "https://mainnet.optimism.io".into(),
        }
    }
    pub fn base() -> Self {
        Chain {
            name: "base".into(),
            kind: ChainKind::EvmRollup,
            chain_id: Some(8453),
            rpc_url: "https://mainnet.base.org".into(),
        }
    }
    pub fn near() -> Self {
        Chain {
            name: "near".into(),
            kind: ChainKind::AccountModel,
            chain_id: None,
            rpc_url: "https://rpc.mainnet.near.org".into(),
        }
    }

    /// Every chain with a built-in adapter.
    pub fn supported() -> Vec<Chain> {
        vec![
            Self::ethereum(),
            Self::arbitrum(),
            Self::optimism(),
            Self::base(),
            Self::near(),
        ]
    }

    /// Look up a supported chain by (case-insensitive) name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "ethereum" | "eth" | "mainnet" => Some(Self::ethereum()),
            "arbitrum" => Some(Self::arbitrum()),
            "optimism" => Some(Self::optimism()),
            "base" => Some(Self::base()),
            "near" => Some(Self::near()),
            _ => None,
        }
    }
}

// ── Display ──────────────────────────────────────────────────────────

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollups_are_cheaper_than_base() {
        assert_eq!(Chain::ethereum().fee_divisor(), 1);
        assert_eq!(Chain::arbitrum().fee_divisor(), ROLLUP_FEE_DIVISOR);
        assert_eq!(Chain::base().fee_divisor(), ROLLUP_FEE_DIVISOR);
        assert_eq!(Chain::near().fee_divisor(), 1);
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(Chain::from_name("Arbitrum"), Some(Chain::arbitrum()));
        assert_eq!(Chain::from_name("NEAR"), Some(Chain::near()));
        assert!(Chain::from_name("solana").is_none());
    }
}
