//! Snowball-style repeated-sampling consensus over [`Block`] candidates.
//!
//! `update` is deliberately polyadic — it accepts a slate of votes rather
//! than a single self-vote — so a future voter-network collaborator can
//! supply real tallies. The finalization math itself does not depend on
//! how many voters contributed the slate.

use crate::config::SamplerConfig;
use crate::ledger::Block;
use blockchain_crypto::Id;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One voter's opinion: which block they currently support, and with what
/// fraction of confidence (`tally` in `[0.0, 1.0]`).
#[derive(Debug, Clone)]
pub struct Vote {
    pub block: Option<Arc<Block>>,
    pub tally: f64,
}

#[derive(Debug, Default)]
pub struct Sampler {
    config: SamplerConfig,
    counts: HashMap<Id, u64>,
    consecutive_count: u32,
    stalled: u32,
    preferred: Option<Arc<Block>>,
    last: Option<Arc<Block>>,
}

impl Sampler {
    pub fn new(config: SamplerConfig) -> Self {
        Sampler {
            config,
            counts: HashMap::new(),
            consecutive_count: 0,
            stalled: 0,
            preferred: None,
            last: None,
        }
    }

    pub fn preferred(&self) -> Option<&Arc<Block>> {
        self.preferred.as_ref()
    }

    /// External injection used by the proposer: adopt `block` as preferred
    /// immediately, ahead of any sampling round.
    pub fn prefer(&mut self, block: Arc<Block>) {
        self.preferred = Some(block);
    }

    /// One round of Snowball sampling. Returns the finalized block once
    /// `beta + 1` consecutive strong majorities have been observed on the
    /// same block.
    pub fn update(&mut self, votes: &[Vote]) -> Option<Arc<Block>> {
        if votes.is_empty() {
            return None;
        }

        let majority = match votes
            .iter()
            .filter(|v| v.block.is_some())
            .max_by(|a, b| a.tally.partial_cmp(&b.tally).unwrap())
        {
            Some(majority) => majority,
            None => {
                // every vote in this round was null: no preference to update,
                // and any in-progress consecutive-majority streak is broken.
                self.consecutive_count = 0;
                return None;
            }
        };

        let majority_block = majority.block.as_ref().unwrap();

        if majority.tally < self.config.alpha {
            self.stalled += 1;
            if self.stalled >= self.config.beta {
                info!("sampler abandoning preference after {} stalled rounds", self.stalled);
                self.preferred = None;
                self.stalled = 0;
            }
            self.consecutive_count = 0;
            return None;
        }

        let count = self.counts.entry(majority_block.id()).or_insert(0);
        *count += 1;
        let new_count = *count;

        match self.preferred.as_ref().map(|b| b.id()) {
            Some(preferred_id) if preferred_id != majority_block.id() => {
                let preferred_count = self.counts.get(&preferred_id).copied().unwrap_or(0);
                if new_count > preferred_count {
                    debug!(
                        height = majority_block.height(),
                        "sampler switching preference"
                    );
                    self.preferred = Some(Arc::clone(majority_block));
                }
            }
            None => {
                self.preferred = Some(Arc::clone(majority_block));
            }
            _ => {}
        }

        let is_new_majority = match &self.last {
            Some(last) => last.id() != majority_block.id(),
            None => true,
        };

        if is_new_majority {
            self.last = Some(Arc::clone(majority_block));
            self.consecutive_count = 1;
            return None;
        }

        self.consecutive_count += 1;
        if self.consecutive_count > self.config.beta {
            info!(
                height = majority_block.height(),
                "sampler finalizing block after {} consecutive majorities", self.consecutive_count
            );
            return self.preferred.clone();
        }

        None
    }

    /// Clear all round-local state: counts, consecutive/stalled counters,
    /// and the `preferred`/`last` owners. Called after finalization.
    pub fn reset(&mut self) {
        self.counts.clear();
        self.consecutive_count = 0;
        self.stalled = 0;
        self.preferred = None;
        self.last = None;
    }

    pub fn stalled_count(&self) -> u32 {
        self.stalled
    }

    pub fn consecutive_count(&self) -> u32 {
        self.consecutive_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_at(height: u64) -> Arc<Block> {
        Arc::new(Block::new(height, vec![Id::of(height.to_le_bytes().as_slice())]).unwrap())
    }

    fn config(beta: u32) -> SamplerConfig {
        SamplerConfig { alpha: 0.80, beta }
    }

    #[test]
    fn finalizes_after_beta_plus_one_consecutive_majorities() {
        let beta = 150;
        let mut sampler = Sampler::new(config(beta));
        let block = block_at(1);
        sampler.prefer(Arc::clone(&block));

        let vote = Vote {
            block: Some(Arc::clone(&block)),
            tally: 1.0,
        };

        let mut last = None;
        for _ in 0..beta {
            last = sampler.update(std::slice::from_ref(&vote));
        }
        assert!(last.is_none(), "round {beta} should not finalize yet");

        let finalized = sampler.update(std::slice::from_ref(&vote));
        assert_eq!(finalized.map(|b| b.id()), Some(block.id()));
    }

    #[test]
    fn abandons_preference_after_beta_stalled_rounds() {
        let beta = 150;
        let mut sampler = Sampler::new(config(beta));
        let block = block_at(1);
        sampler.prefer(Arc::clone(&block));

        let vote = Vote {
            block: Some(Arc::clone(&block)),
            tally: 0.5,
        };

        for _ in 0..beta {
            sampler.update(std::slice::from_ref(&vote));
        }

        assert!(sampler.preferred().is_none());
        assert_eq!(sampler.stalled_count(), 0);
    }

    #[test]
    fn switching_majority_resets_consecutive_count() {
        let mut sampler = Sampler::new(config(150));
        let a = block_at(1);
        let b = block_at(2);

        sampler.update(&[Vote { block: Some(Arc::clone(&a)), tally: 1.0 }]);
        assert_eq!(sampler.consecutive_count(), 1);
        sampler.update(&[Vote { block: Some(Arc::clone(&a)), tally: 1.0 }]);
        assert_eq!(sampler.consecutive_count(), 2);

        sampler.update(&[Vote { block: Some(Arc::clone(&b)), tally: 1.0 }]);
        assert_eq!(sampler.consecutive_count(), 1);
    }

    #[test]
    fn empty_votes_are_a_no_decision() {
        let mut sampler = Sampler::new(config(150));
        assert!(sampler.update(&[]).is_none());
    }

    #[test]
    fn all_null_blocks_reset_consecutive_count() {
        let mut sampler = Sampler::new(config(150));
        sampler.update(&[Vote { block: None, tally: 1.0 }]);
        assert_eq!(sampler.consecutive_count(), 0);
    }

    #[test]
    fn all_null_blocks_reset_an_in_progress_streak() {
        let mut sampler = Sampler::new(config(150));
        let a = block_at(1);

        sampler.update(&[Vote { block: Some(Arc::clone(&a)), tally: 1.0 }]);
        sampler.update(&[Vote { block: Some(Arc::clone(&a)), tally: 1.0 }]);
        assert_eq!(sampler.consecutive_count(), 2);

        let decision = sampler.update(&[Vote { block: None, tally: 1.0 }]);
        assert!(decision.is_none());
        assert_eq!(sampler.consecutive_count(), 0);
    }
}
