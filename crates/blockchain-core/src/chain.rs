//! Drives propose→finalize cycles: proposes a candidate block from pending
//! transactions whenever the Sampler holds no preference, and otherwise
//! feeds the Sampler a self-vote until it finalizes.

use crate::config::{ChainConfig, SamplerConfig};
use crate::consensus::{Sampler, Vote};
use crate::error::ChainError;
use crate::ledger::Block;
use crate::mempool::PendingPool;
use runtime::Context;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

pub struct Chain {
    config: ChainConfig,
    pending: Arc<PendingPool>,
    sampler: Mutex<Sampler>,
    latest_block: RwLock<Option<Arc<Block>>>,
    last_propose_time: Mutex<Instant>,
    propose_delay: Mutex<Duration>,
}

impl Chain {
    pub fn new(config: ChainConfig, sampler_config: SamplerConfig, pending: Arc<PendingPool>) -> Self {
        let propose_delay_min = config.propose_delay_min;
        Chain {
            config,
            pending,
            sampler: Mutex::new(Sampler::new(sampler_config)),
            latest_block: RwLock::new(None),
            // Far enough in the past that the very first propose tick is
            // not blocked by the "since last propose" guard.
            last_propose_time: Mutex::new(Instant::now() - Duration::from_secs(3600)),
            propose_delay: Mutex::new(propose_delay_min),
        }
    }

    pub fn pending(&self) -> &Arc<PendingPool> {
        &self.pending
    }

    pub async fn latest_block(&self) -> Option<Arc<Block>> {
        self.latest_block.read().await.clone()
    }

    /// Drive propose→finalize cycles until `ctx` is cancelled. Any
    /// invariant violation (a finalized block referencing a pending
    /// transaction id that is no longer present) is fatal, matching
    /// spec's "consensus state is inconsistent" propagation policy.
    pub async fn run(&self, ctx: &Context) {
        loop {
            let has_preferred = self.sampler.lock().await.preferred().is_some();

            let result = if has_preferred {
                self.finalize_step(ctx).await
            } else {
                self.propose_step(ctx).await
            };

            match result {
                Ok(()) => continue,
                Err(ChainError::Cancelled) => return,
                Err(err @ ChainError::MissingFinalizedTransaction(_)) => {
                    panic!("fatal chain invariant violation: {err}");
                }
            }
        }
    }

    async fn propose_step(&self, ctx: &Context) -> Result<(), ChainError> {
        let delay = *self.propose_delay.lock().await;
        ctx.sleep(delay).await?;

        let now = Instant::now();
        let pending_empty = self.pending.is_empty().await;
        let since_last_propose = now.duration_since(*self.last_propose_time.lock().await);

        if pending_empty || since_last_propose < self.config.propose_delay_min {
            self.grow_propose_delay().await;
            return Ok(());
        }

        let ids = self.pending.snapshot_ids(self.config.max_transaction_ids).await;
        let next_height = match self.latest_block().await {
            Some(block) => block.height() + 1,
            None => 1,
        };

        let block = Block::new(next_height, ids).expect("snapshot respects max_transaction_ids");
        info!(
            height = block.height(),
            tx_count = block.transaction_ids().len(),
            "proposing block"
        );

        self.sampler.lock().await.prefer(Arc::new(block));

        *self.last_propose_time.lock().await = now;
        *self.propose_delay.lock().await = self.config.propose_delay_min;

        Ok(())
    }

    async fn grow_propose_delay(&self) {
        let mut delay = self.propose_delay.lock().await;
        let span = self
            .config
            .propose_delay_max
            .saturating_sub(self.config.propose_delay_min);
        let step = span / 10;
        *delay = (*delay + step).min(self.config.propose_delay_max);
    }

    async fn finalize_step(&self, ctx: &Context) -> Result<(), ChainError> {
        if ctx.is_cancelled() {
            return Err(ChainError::Cancelled);
        }

        let preferred = self.sampler.lock().await.preferred().cloned();
        let Some(preferred) = preferred else {
            return Ok(());
        };

        let votes = vec![Vote {
            block: Some(preferred),
            tally: 1.0,
        }];

        let finalized = self.sampler.lock().await.update(&votes);

        if let Some(block) = finalized {
            for id in block.transaction_ids() {
                if self.pending.remove(id).await.is_none() {
                    return Err(ChainError::MissingFinalizedTransaction(*id));
                }
            }

            info!(
                height = block.height(),
                id = %block.id(),
                tx_count = block.transaction_ids().len(),
                "finalized block"
            );

            *self.latest_block.write().await = Some(block);
            self.sampler.lock().await.reset();
        }

        // Cooperatively yield so a tight finalize loop (single self-voter,
        // no network round trip) doesn't starve sibling tasks.
        tokio::task::yield_now().await;
        Ok(())
    }
}
