//! Tunables named throughout spec.md, grouped so tests can override them
//! with small values instead of waiting on real wall-clock delays.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub max_parallel_tasks: usize,
    pub max_batch_size: usize,
    pub flush_delay_min: Duration,
    pub flush_delay_max: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierConfig {
            max_parallel_tasks: 256,
            max_batch_size: 64,
            flush_delay_min: Duration::from_millis(100),
            flush_delay_max: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub propose_delay_min: Duration,
    pub propose_delay_max: Duration,
    pub max_transaction_ids: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            propose_delay_min: Duration::from_millis(0),
            propose_delay_max: Duration::from_millis(500),
            max_transaction_ids: 65535,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub alpha: f64,
    pub beta: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            alpha: 0.80,
            beta: 150,
        }
    }
}
