use std::collections::BTreeMap;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize, Serializer};

/// Native unit a chain reports execution cost in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeUnit {
    /// EVM gas units.
    #[serde(rename = "gas")]
    Gas,
    /// NEAR teragas (10^12 gas) prepaid per function call.
    #[serde(rename = "TGas")]
    TGas,
}

/// A chain-native fee estimate. The amount is an unbounded integer so that
/// sums never lose precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeAmount {
    #[serde(serialize_with = "as_decimal")]
    pub amount: U256,
    pub unit: FeeUnit,
}

impl FeeAmount {
    pub fn new(amount: impl Into<U256>, unit: FeeUnit) -> Self {
        FeeAmount {
            amount: amount.into(),
            unit,
        }
    }

    pub fn gas(units: u64) -> Self {
        Self::new(U256::from(units), FeeUnit::Gas)
    }

    pub fn tgas(units: u64) -> Self {
        Self::new(U256::from(units), FeeUnit::TGas)
    }

    /// Parse a base-10 integer string such as `"150000"`.
    pub fn parse(decimal: &str, unit: FeeUnit) -> Option<Self> {
        U256::from_str_radix(decimal.trim(), 10)
            .ok()
            .map(|amount| FeeAmount { amount, unit })
    }

    /// Decimal sum of two fees in the same unit. `None` on unit mismatch.
    pub fn checked_add(&self, other: &FeeAmount) -> Option<FeeAmount> {
        if self.unit != other.unit {
            return None;
        }
        Some(FeeAmount {
            amount: self.amount.saturating_add(other.amount),
            unit: self.unit,
        })
    }

    /// The amount as a base-10 string.
    pub fn decimal(&self) -> String {
        self.amount.to_string()
    }
}

impl std::fmt::Display for FeeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeeUnit::Gas => f.write_str("gas"),
            FeeUnit::TGas => f.write_str("TGas"),
        }
    }
}

impl std::fmt::Display for FeeAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}

fn as_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// Per-chain fee totals for a whole strategy. Chains without steps are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeeTotals(pub BTreeMap<String, FeeAmount>);

impl FeeTotals {
    pub fn get(&self, chain: &str) -> Option<&FeeAmount> {
        self.0.get(chain)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `{ chain: "decimal" }` view handed to callers for display/consent.
    pub fn as_decimal_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(chain, fee)| (chain.clone(), fee.decimal()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_decimals_not_strings() {
        let a = FeeAmount::parse("150000", FeeUnit::Gas).unwrap();
        let b = FeeAmount::parse("200000", FeeUnit::Gas).unwrap();
        assert_eq!(a.checked_add(&b).unwrap().decimal(), "350000");
    }

    #[test]
    fn refuses_to_mix_units() {
        assert!(FeeAmount::gas(1).checked_add(&FeeAmount::tgas(1)).is_none());
    }

    #[test]
    fn serializes_amount_as_decimal_string() {
        let json = serde_json::to_string(&FeeAmount::tgas(30)).unwrap();
        assert_eq!(json, r#"{"amount":"30","unit":"TGas"}"#);
    }

    #[test]
    fn rejects_non_integer_input() {
        assert!(FeeAmount::parse("1.5", FeeUnit::Gas).is_none());
        assert!(FeeAmount::parse("abc", FeeUnit::Gas).is_none());
    }
}
