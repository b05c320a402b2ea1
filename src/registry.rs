use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::adapters::{AdapterSettings, ChainAdapter, EvmAdapter, NearAdapter};
use crate::error::ResolutionError;
use crate::model::chain::BASE_CHAIN;
use crate::model::{Chain, Step};

/// Built-in protocol → chain routes. Keys are lower-case protocol names.
const PROTOCOL_ROUTES: &[(&str, &str)] = &[
    // ── Ethereum ──
    ("aave", "ethereum"),
    ("lido", "ethereum"),
    ("compound", "ethereum"),
    ("uniswap", "ethereum"),
    ("curve", "ethereum"),
    ("rocket-pool", "ethereum"),
    ("yearn", "ethereum"),
    ("maker", "ethereum"),
    ("convex", "ethereum"),
    ("eigenlayer", "ethereum"),
    // ── Arbitrum ──
    ("aave-arbitrum", "arbitrum"),
    ("compound-arbitrum", "arbitrum"),
    ("gmx", "arbitrum"),
    ("camelot", "arbitrum"),
    ("radiant", "arbitrum"),
    // ── Base ──
    ("aave-base", "base"),
    ("compound-base", "base"),
    ("aerodrome", "base"),
    ("moonwell", "base"),
    // ── Optimism ──
    ("aave-optimism", "optimism"),
    ("velodrome", "optimism"),
    // ── NEAR ──
    ("meta-pool", "near"),
    ("linear", "near"),
    ("burrow", "near"),
    ("ref-finance", "near"),
    ("rainbow-bridge", "near"),
];

/// Where a protocol routes, and whether that came from the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub chain: String,
    /// The protocol was not in the route table.
    pub fallback: bool,
}

/// A step's route bound to the adapter that will drive it.
#[derive(Clone)]
pub struct Resolved {
    pub chain: String,
    pub adapter: Arc<dyn ChainAdapter>,
    pub fallback: bool,
}

/// Maps protocol names to chains and chains to adapters.
///
/// Read-only once built; shared by every concurrent run. Protocols missing
/// from the route table degrade to the default chain rather than failing,
/// and every such fallback is logged.
pub struct AdapterRegistry {
    routes: HashMap<String, String>,
    default_chain: String,
    adapters: HashMap<String, Arc<dyn ChainAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::routes_only()
    }
}

impl AdapterRegistry {
    /// Built-in routes, default chain `ethereum`, no adapters yet.
    pub fn routes_only() -> Self {
        let routes = PROTOCOL_ROUTES
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        AdapterRegistry {
            routes,
            default_chain: BASE_CHAIN.to_string(),
            adapters: HashMap::new(),
        }
    }

    /// No routes at all: every protocol takes the default route.
    pub fn empty() -> Self {
        AdapterRegistry {
            routes: HashMap::new(),
            default_chain: BASE_CHAIN.to_string(),
            adapters: HashMap::new(),
        }
    }

    /// Registry with a live adapter for every supported chain.
    pub fn live(chains: &[Chain], settings: &AdapterSettings) -> Result<Self> {
        let mut registry = Self::routes_only();
        for chain in chains {
            let adapter: Arc<dyn ChainAdapter> = if chain.is_evm() {
                Arc::new(EvmAdapter::new(chain.clone(), settings)?)
            } else {
                Arc::new(NearAdapter::new(chain.clone(), settings)?)
            };
            registry = registry.with_adapter(adapter);
        }
        Ok(registry)
    }

    /// Register (or replace) the adapter for its chain.
    pub fn with_adapter(mut self, adapter: Arc<dyn ChainAdapter>) -> Self {
        self.adapters
            .insert(adapter.chain().name().to_lowercase(), adapter);
        self
    }

    /// Add (or override) a protocol route.
    pub fn with_route(mut self, protocol: &str, chain: &str) -> Self {
        self.routes
            .insert(protocol.trim().to_lowercase(), chain.to_lowercase());
        self
    }

    pub fn with_default_chain(mut self, chain: &str) -> Self {
        self.default_chain = chain.to_lowercase();
        self
    }

    pub fn default_chain(&self) -> &str {
        &self.default_chain
    }

    pub fn chains(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    /// Chain a protocol routes to. Never fails: unknown protocols take the
    /// default route.
    pub fn route_for(&self, protocol: &str) -> Route {
        let key = protocol.trim().to_lowercase();
        match self.routes.get(&key) {
            Some(chain) => Route {
                chain: chain.clone(),
                fallback: false,
            },
            None => Route {
                chain: self.default_chain.clone(),
                fallback: true,
            },
        }
    }

    /// Bind a step to its adapter.
    pub fn resolve(&self, step: &Step) -> Result<Resolved, ResolutionError> {
        let route = self.route_for(&step.protocol);
        if route.fallback {
            warn!(
                protocol = %step.protocol,
                chain = %route.chain,
                "protocol not in route table, falling back to default chain"
            );
        }

        let adapter = self.adapters.get(&route.chain).cloned().ok_or_else(|| {
            ResolutionError::NoAdapter {
                protocol: step.protocol.clone(),
                chain: route.chain.clone(),
            }
        })?;

        Ok(Resolved {
            chain: route.chain,
            adapter,
            fallback: route.fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_are_case_insensitive() {
        let reg = AdapterRegistry::routes_only();
        assert_eq!(reg.route_for("Aave").chain, "ethereum");
        assert_eq!(reg.route_for(" LIDO ").chain, "ethereum");
        assert_eq!(reg.route_for("GMX").chain, "arbitrum");
        assert_eq!(reg.route_for("Meta-Pool").chain, "near");
        assert!(!reg.route_for("aerodrome").fallback);
    }

    #[test]
    fn unknown_protocols_take_the_default_route() {
        let reg = AdapterRegistry::routes_only();
        let route = reg.route_for("some-new-dex");
        assert_eq!(route.chain, BASE_CHAIN);
        assert!(route.fallback);

        let reg = reg.with_default_chain("Base");
        assert_eq!(reg.route_for("some-new-dex").chain, "base");
    }

    #[test]
    fn every_route_targets_a_supported_chain() {
        for (protocol, chain) in PROTOCOL_ROUTES {
            assert!(Chain::from_name(chain).is_some(), "{protocol} -> {chain}");
        }
    }
}
