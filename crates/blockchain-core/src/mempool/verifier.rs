//! Batched, pipelined, cancellation-aware signature verification.
//!
//! Transactions accumulate in an in-memory batch. The batch flushes either
//! when it reaches [`VerifierConfig::max_batch_size`] or on an adaptive
//! timer (see [`TransactionVerifier::run`]). Each flush is verified and
//! committed into the shared [`PendingPool`] on its own spawned task,
//! capped at [`VerifierConfig::max_parallel_tasks`] concurrent tasks via a
//! semaphore — the idiomatic stand-in for the source's task free-list plus
//! active-task counter and capacity parker.

use crate::config::VerifierConfig;
use crate::ledger::Transaction;
use crate::mempool::pending::PendingPool;
use blockchain_crypto::signature::{verify_batch, PublicKey, Signature};
use runtime::{Context, RuntimeError, WaitGroup};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

pub struct TransactionVerifier {
    config: VerifierConfig,
    pending: Arc<PendingPool>,
    entries: Mutex<Vec<Arc<Transaction>>>,
    semaphore: Arc<Semaphore>,
    wait_group: WaitGroup,
    last_flush_time: Mutex<Instant>,
}

impl TransactionVerifier {
    pub fn new(config: VerifierConfig, pending: Arc<PendingPool>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_tasks));
        TransactionVerifier {
            config,
            pending,
            entries: Mutex::new(Vec::new()),
            semaphore,
            wait_group: WaitGroup::new(),
            last_flush_time: Mutex::new(Instant::now()),
        }
    }

    /// Current number of dispatched-but-not-yet-complete verification
    /// tasks. Never exceeds `max_parallel_tasks`.
    pub fn active_tasks(&self) -> usize {
        self.config.max_parallel_tasks - self.semaphore.available_permits()
    }

    /// Enqueue a transaction. Suspends only when a flush is triggered and
    /// the task pool is saturated; fails only on cancellation.
    pub async fn push(&self, ctx: &Context, tx: Transaction) -> Result<(), RuntimeError> {
        let tx = Arc::new(tx);
        let should_flush = {
            let mut entries = self.entries.lock().await;
            entries.push(tx);
            entries.len() >= self.config.max_batch_size
        };

        if should_flush {
            self.flush(ctx).await?;
        }
        Ok(())
    }

    /// Background loop: adaptively sleeps, flushing whenever a partial
    /// batch has aged past `flush_delay_min`. Returns once `ctx` is
    /// cancelled.
    pub async fn run(&self, ctx: &Context) {
        let mut delay = self.config.flush_delay_min;

        loop {
            if ctx.sleep(delay).await.is_err() {
                return;
            }

            let has_entries = !self.entries.lock().await.is_empty();
            let elapsed_enough = {
                let last = *self.last_flush_time.lock().await;
                last.elapsed() >= self.config.flush_delay_min
            };

            if has_entries && elapsed_enough {
                if self.flush(ctx).await.is_err() {
                    return;
                }
                delay = self.config.flush_delay_min;
            } else {
                delay = (delay * 2).min(self.config.flush_delay_max);
            }
        }
    }

    /// Drain the current batch (if any) and dispatch it for verification.
    /// A no-op if the batch is currently empty.
    async fn flush(&self, ctx: &Context) -> Result<(), RuntimeError> {
        let batch = {
            let mut entries = self.entries.lock().await;
            if entries.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *entries)
        };

        let permit = tokio::select! {
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                permit.expect("verifier semaphore is never closed")
            }
            _ = ctx.cancelled() => return Err(RuntimeError::Cancelled),
        };

        *self.last_flush_time.lock().await = Instant::now();
        self.wait_group.add(1);

        debug!(batch_size = batch.len(), "dispatching verification batch");

        let pending = Arc::clone(&self.pending);
        let window = self.config.max_batch_size;
        let wait_group = self.wait_group.clone();

        tokio::spawn(async move {
            let _permit = permit; // released on drop, freeing a task slot
            verify_and_commit(batch, &pending, window).await;
            wait_group.done();
        });

        Ok(())
    }

    /// Wait for every dispatched task to complete, then release pool
    /// memory and any entries that never made it into a flush.
    pub async fn shutdown(&self) {
        self.wait_group.wait().await;

        let mut entries = self.entries.lock().await;
        if !entries.is_empty() {
            info!(dropped = entries.len(), "releasing un-flushed transactions on shutdown");
        }
        entries.clear();
    }
}

/// Verify a batch (CPU-bound: batch Ed25519 verification with per-window
/// fallback to individual checks) and commit the accepted prefix into
/// `pending`.
async fn verify_and_commit(entries: Vec<Arc<Transaction>>, pending: &PendingPool, window_size: usize) {
    // Signature verification is synchronous CPU work; hint the runtime
    // that this task should not be treated as yielding I/O-bound work.
    let accepted = tokio::task::block_in_place(|| verify_windows(entries, window_size));

    let index = accepted.len();
    if index == 0 {
        return;
    }

    if pending.reserve(index).await.is_err() {
        warn!(count = index, "dropping accepted batch: pending pool at capacity");
        return;
    }

    pending.insert_all(accepted).await;
}

fn verify_windows(entries: Vec<Arc<Transaction>>, window_size: usize) -> Vec<Arc<Transaction>> {
    let mut accepted = Vec::with_capacity(entries.len());

    for window in entries.chunks(window_size) {
        if window.len() == window_size && try_batch_verify(window) {
            accepted.extend(window.iter().cloned());
            continue;
        }

        for tx in window {
            if tx.verify_signature() {
                accepted.push(Arc::clone(tx));
            } else {
                warn!(id = %tx.id(), "rejecting transaction with invalid signature");
            }
        }
    }

    accepted
}

fn try_batch_verify(window: &[Arc<Transaction>]) -> bool {
    let payloads: Vec<Vec<u8>> = window.iter().map(|tx| tx.signature_payload()).collect();
    let messages: Vec<&[u8]> = payloads.iter().map(|p| p.as_slice()).collect();
    let signatures: Vec<Signature> = window.iter().map(|tx| *tx.signature()).collect();
    let public_keys: Vec<PublicKey> = window.iter().map(|tx| *tx.sender()).collect();

    verify_batch(&messages, &signatures, &public_keys).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Tag;
    use blockchain_crypto::Keypair;
    use std::time::Duration;

    fn config() -> VerifierConfig {
        VerifierConfig {
            max_parallel_tasks: 256,
            max_batch_size: 64,
            flush_delay_min: Duration::from_millis(5),
            flush_delay_max: Duration::from_millis(20),
        }
    }

    fn signed_tx(nonce: u64) -> Transaction {
        let keypair = Keypair::generate();
        Transaction::new(&keypair, nonce, 0, Tag::NoOp, b"hello world".to_vec())
    }

    fn tampered_tx(nonce: u64) -> Transaction {
        let keypair = Keypair::generate();
        let tx = Transaction::new(&keypair, nonce, 0, Tag::NoOp, b"hello world".to_vec());
        let mut bytes = tx.encode();
        bytes[32] ^= 0xFF;
        crate::ledger::transaction::decode(&bytes).unwrap().0
    }

    #[tokio::test]
    async fn push_below_threshold_does_not_dispatch() {
        let pending = Arc::new(PendingPool::new(1024));
        let verifier = TransactionVerifier::new(config(), pending);
        let ctx = Context::root();

        verifier.push(&ctx, signed_tx(1)).await.unwrap();
        assert_eq!(verifier.active_tasks(), 0);
    }

    // These exercise flush(), which uses `block_in_place` to hint the
    // runtime that batch verification is CPU-bound; that call requires a
    // multi-thread runtime.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn full_batch_flushes_and_populates_pending() {
        let pending = Arc::new(PendingPool::new(1024));
        let verifier = Arc::new(TransactionVerifier::new(config(), Arc::clone(&pending)));
        let ctx = Context::root();

        for i in 0..64u64 {
            verifier.push(&ctx, signed_tx(i)).await.unwrap();
        }

        // Give the spawned verification task a chance to run.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pending.len().await, 64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn invalid_signature_is_dropped_from_batch() {
        let pending = Arc::new(PendingPool::new(1024));
        let verifier = Arc::new(TransactionVerifier::new(config(), Arc::clone(&pending)));
        let ctx = Context::root();

        // 65 pushes: the 64th push crosses max_batch_size and flushes a
        // window of [0..64) (index 30 tampered, 63 accepted); the 65th tx
        // is left sitting in the batch and needs an explicit flush below.
        for i in 0..65u64 {
            let tx = if i == 30 { tampered_tx(i) } else { signed_tx(i) };
            verifier.push(&ctx, tx).await.unwrap();
        }
        verifier.flush(&ctx).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pending.len().await, 64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn adaptive_run_loop_flushes_partial_batch() {
        let pending = Arc::new(PendingPool::new(1024));
        let verifier = Arc::new(TransactionVerifier::new(config(), Arc::clone(&pending)));
        let ctx = Context::root();

        verifier.push(&ctx, signed_tx(1)).await.unwrap();

        let runner = Arc::clone(&verifier);
        let run_ctx = ctx.child();
        let handle = tokio::spawn(async move { runner.run(&run_ctx).await });

        tokio::time::sleep(Duration::from_millis(60)).await;
        ctx.cancel();
        let _ = handle.await;

        assert_eq!(pending.len().await, 1);
    }

    #[tokio::test]
    async fn shutdown_drops_unflushed_entries() {
        let pending = Arc::new(PendingPool::new(1024));
        let verifier = TransactionVerifier::new(config(), pending);
        let ctx = Context::root();

        verifier.push(&ctx, signed_tx(1)).await.unwrap();
        verifier.shutdown().await;
        assert_eq!(verifier.active_tasks(), 0);
    }
}
