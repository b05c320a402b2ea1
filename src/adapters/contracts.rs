use std::collections::HashMap;

use alloy::primitives::{Address, address};
use alloy::sol;

use crate::model::{Chain, StepAction};

// ── Contract interfaces ────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IAavePool {
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function withdraw(address asset, uint256 amount, address to) external returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IComet {
        function supply(address asset, uint256 amount) external;
        function withdraw(address asset, uint256 amount) external;
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract ILido {
        function submit(address referral) external payable returns (uint256);
    }
}

// ── Call plans ─────────────────────────────────────────────────────

/// The concrete contract interaction a (protocol, action) pair maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPlan {
    AaveSupply,
    AaveWithdraw,
    CometSupply,
    CometWithdraw,
    LidoSubmit,
}

impl CallPlan {
    /// Whether the plan moves an ERC20 and needs an allowance first.
    pub fn needs_approval(&self) -> bool {
        matches!(self, CallPlan::AaveSupply | CallPlan::CometSupply)
    }

    /// Whether the plan spends native ETH as call value.
    pub fn is_payable(&self) -> bool {
        matches!(self, CallPlan::LidoSubmit)
    }
}

/// Protocol family: route suffixes such as `aave-arbitrum` share the
/// `aave` call plans.
pub fn protocol_family(protocol_key: &str) -> &str {
    protocol_key.split(['-', ' ']).next().unwrap_or(protocol_key)
}

pub fn call_plan(family: &str, action: StepAction) -> Option<CallPlan> {
    use StepAction::*;
    match (family, action) {
        ("aave", Deposit | YieldFarm) => Some(CallPlan::AaveSupply),
        ("aave", Withdraw) => Some(CallPlan::AaveWithdraw),
        ("compound", Deposit | YieldFarm) => Some(CallPlan::CometSupply),
        ("compound", Withdraw) => Some(CallPlan::CometWithdraw),
        ("lido", Stake | Deposit) => Some(CallPlan::LidoSubmit),
        _ => None,
    }
}

// ── Known contract addresses ───────────────────────────────────────

/// Entry-point contract for a protocol family on a chain.
pub fn protocol_contract(chain: &Chain, family: &str) -> Option<Address> {
    match (chain.chain_id()?, family) {
        (1, "aave") => Some(address!("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2")),
        (42161, "aave") => Some(address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD")),
        (10, "aave") => Some(address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD")),
        (8453, "aave") => Some(address!("0xA238Dd80C259a72e81d7e4664a9801593F98d1c5")),
        (1, "compound") => Some(address!("0xc3d688B66703497DAA19211EEdff47f25384cdc3")),
        (42161, "compound") => Some(address!("0x9c4ec768c28520B50860ea7a15bd7213a9fF58bf")),
        (8453, "compound") => Some(address!("0xb125E6687d4313864e53df431d5425969c15Eb2F")),
        (1, "lido") => Some(address!("0xae7ab96520DE3A18E5e111B6EaAb095312D7fE84")),
        _ => None,
    }
}

// ── Token address registry ─────────────────────────────────────────

/// ERC20 address for a (chain, symbol) pair. Native `ETH` resolves to
/// the chain's WETH, since lending markets only accept the wrapped token.
pub fn token_address(chain: &Chain, symbol: &str) -> Option<Address> {
    let cid = chain.chain_id()?;
    let sym = match symbol.to_uppercase().as_str() {
        "ETH" => "WETH".to_string(),
        other => other.to_string(),
    };
    TOKEN_REGISTRY.get(&(cid, sym)).copied()
}

pub fn is_native_eth(symbol: &str) -> bool {
    symbol.eq_ignore_ascii_case("ETH")
}

// ── Token registry implementation ──────────────────────────────────

// Build a static HashMap from (chain_id, symbol) → Address
macro_rules! token_registry {
    ( $( ($chain:expr, $sym:expr) => $addr:literal ),* $(,)? ) => {
        fn build_token_registry() -> HashMap<(u64, String), Address> {
            let mut m = HashMap::new();
            $(
                m.insert(($chain, $sym.to_string()), address!($addr));
            )*
            m
        }

        use std::sync::LazyLock;
        static TOKEN_REGISTRY: LazyLock<HashMap<(u64, String), Address>> =
            LazyLock::new(build_token_registry);
    };
}

token_registry! {
    // ── Ethereum ──
    (1, "USDC") => "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
    (1, "USDT") => "0xdAC17F958D2ee523a2206206994597C13D831ec7",
    (1, "WETH") => "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
    (1, "DAI") => "0x6B175474E89094C44Da98b954EedeAC495271d0F",
    (1, "WBTC") => "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599",
    (1, "WSTETH") => "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0",

    // ── Base ──
    (8453, "USDC") => "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
    (8453, "WETH") => "0x4200000000000000000000000000000000000006",
    (8453, "CBBTC") => "0xcbB7C0000aB88B473b1f5aFd9ef808440eed33Bf",
    (8453, "DAI") => "0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb",

    // ── Arbitrum ──
    (42161, "USDC") => "0xaf88d065e77c8cC2239327C5EDb3A432268e5831",
    (42161, "USDT") => "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9",
    (42161, "WETH") => "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1",
    (42161, "WBTC") => "0x2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f",

    // ── Optimism ──
    (10, "USDC") => "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85",
    (10, "WETH") => "0x4200000000000000000000000000000000000006",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth_resolves_to_weth() {
        assert_eq!(
            token_address(&Chain::ethereum(), "eth"),
            token_address(&Chain::ethereum(), "WETH"),
        );
        assert!(token_address(&Chain::near(), "USDC").is_none());
    }

    #[test]
    fn route_suffixes_share_plans() {
        assert_eq!(protocol_family("aave-arbitrum"), "aave");
        assert_eq!(
            call_plan(protocol_family("aave-base"), StepAction::Deposit),
            Some(CallPlan::AaveSupply)
        );
        assert_eq!(call_plan("lido", StepAction::Withdraw), None);
        assert!(protocol_contract(&Chain::base(), "aave").is_some());
        assert!(protocol_contract(&Chain::base(), "lido").is_none());
    }
}
