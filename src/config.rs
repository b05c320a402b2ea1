use std::time::Duration;

use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result, anyhow};
use tracing::warn;

use crate::adapters::AdapterSettings;
use crate::model::Chain;

pub const ENV_PRIVATE_KEY: &str = "YIELD_FLOW_PRIVATE_KEY";
pub const ENV_NEAR_RELAYER: &str = "YIELD_FLOW_NEAR_RELAYER";
pub const ENV_CALL_TIMEOUT: &str = "YIELD_FLOW_CALL_TIMEOUT_SECS";
pub const ENV_STEP_DELAY: &str = "YIELD_FLOW_STEP_DELAY_MS";
const ENV_RPC_PREFIX: &str = "YIELD_FLOW_RPC_";

const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_STEP_DELAY_MS: u64 = 2000;

/// CLI-facing options shared by the commands that touch a chain.
pub struct RunOptions {
    pub dry_run: bool,
}

/// Runtime configuration after environment resolution.
pub struct RuntimeConfig {
    pub chains: Vec<Chain>,
    pub adapter: AdapterSettings,
    pub step_delay: Duration,
}

impl RuntimeConfig {
    pub fn from_cli(opts: &RunOptions) -> Result<Self> {
        Self::from_lookup(opts, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable source.
    pub fn from_lookup(opts: &RunOptions, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let private_key = var(ENV_PRIVATE_KEY);
        if let Some(key) = &private_key {
            // Reject a malformed key before any adapter is built
            key.parse::<PrivateKeySigner>()
                .map_err(|e| anyhow!("{ENV_PRIVATE_KEY} is not a valid private key: {e}"))?;
        } else if !opts.dry_run {
            warn!("{ENV_PRIVATE_KEY} not set; live EVM steps will be rejected");
        }

        let chains = Chain::supported()
            .into_iter()
            .map(|chain| {
                let key = format!("{ENV_RPC_PREFIX}{}", chain.name().to_uppercase());
                match var(&key) {
                    Some(url) => chain.with_rpc_url(url),
                    None => chain,
                }
            })
            .collect();

        let call_timeout = parse_u64(&var, ENV_CALL_TIMEOUT, DEFAULT_CALL_TIMEOUT_SECS)?;
        let step_delay = parse_u64(&var, ENV_STEP_DELAY, DEFAULT_STEP_DELAY_MS)?;

        Ok(RuntimeConfig {
            chains,
            adapter: AdapterSettings {
                dry_run: opts.dry_run,
                call_timeout: Duration::from_secs(call_timeout),
                private_key,
                near_relayer: var(ENV_NEAR_RELAYER),
            },
            step_delay: Duration::from_millis(step_delay),
        })
    }
}

fn parse_u64(var: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match var(key) {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a whole number, got '{v}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)], dry_run: bool) -> Result<RuntimeConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(&RunOptions { dry_run }, |k| map.get(k).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = resolve(&[], true).unwrap();
        assert!(cfg.adapter.dry_run);
        assert_eq!(cfg.adapter.call_timeout, Duration::from_secs(60));
        assert_eq!(cfg.step_delay, Duration::from_millis(2000));
        assert!(cfg.adapter.private_key.is_none());
        assert_eq!(cfg.chains.len(), Chain::supported().len());
    }

    #[test]
    fn rpc_override_applies_to_one_chain() {
        let cfg = resolve(&[("YIELD_FLOW_RPC_BASE", "http://localhost:8545")], true).unwrap();
        let base = cfg.chains.iter().find(|c| c.name() == "base").unwrap();
        assert_eq!(base.rpc_url(), "http://localhost:8545");
        let eth = cfg.chains.iter().find(|c| c.name() == "ethereum").unwrap();
        assert_eq!(eth.rpc_url(), Chain::ethereum().rpc_url());
    }

    #[test]
    fn rejects_bad_numbers_and_keys() {
        assert!(resolve(&[(ENV_STEP_DELAY, "soon")], true).is_err());
        assert!(resolve(&[(ENV_PRIVATE_KEY, "not-a-key")], false).is_err());
        let cfg = resolve(&[(ENV_STEP_DELAY, "0")], true).unwrap();
        assert_eq!(cfg.step_delay, Duration::ZERO);
    }

    #[test]
    fn live_mode_without_key_still_resolves() {
        let cfg = resolve(&[], false).unwrap();
        assert!(!cfg.adapter.dry_run);
        assert!(cfg.adapter.private_key.is_none());
    }
}
