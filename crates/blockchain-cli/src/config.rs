//! Node-wide configuration: every tunable named across the core crates,
//! loaded from environment variables with the same defaults the library
//! crates use internally. There is no config file and no CLI arguments —
//! the node takes none.

use blockchain_core::{ChainConfig, SamplerConfig, VerifierConfig};
use std::net::SocketAddr;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9000";
const DEFAULT_PENDING_CAPACITY: usize = 1 << 20;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub listen_addr: SocketAddr,
    pub backlog: i32,
    pub pending_capacity: usize,
    pub verifier: VerifierConfig,
    pub chain: ChainConfig,
    pub sampler: SamplerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            listen_addr: DEFAULT_LISTEN_ADDR.parse().expect("valid default address"),
            backlog: blockchain_network::server::DEFAULT_BACKLOG,
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            verifier: VerifierConfig::default(),
            chain: ChainConfig::default(),
            sampler: SamplerConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Apply `LISTEN_ADDR` overrides on top of the defaults, if set and
    /// parseable. Malformed overrides are logged and ignored rather than
    /// treated as fatal, since the node otherwise takes no arguments.
    pub fn from_env() -> Self {
        let mut config = NodeConfig::default();

        if let Ok(addr) = std::env::var("LISTEN_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.listen_addr = parsed,
                Err(err) => {
                    tracing::warn!(%addr, error = %err, "ignoring unparseable LISTEN_ADDR");
                }
            }
        }

        config
    }
}
