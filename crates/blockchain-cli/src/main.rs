mod config;

use anyhow::Context as _;
use blockchain_core::{Chain, PendingPool, TransactionVerifier};
use blockchain_network::Listener;
use config::NodeConfig;
use runtime::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = NodeConfig::from_env();
    let ctx = Context::root();

    let pending = Arc::new(PendingPool::new(config.pending_capacity));
    let chain = Arc::new(Chain::new(
        config.chain.clone(),
        config.sampler,
        Arc::clone(&pending),
    ));
    let verifier = Arc::new(TransactionVerifier::new(
        config.verifier.clone(),
        Arc::clone(&pending),
    ));

    let listener = Listener::bind(config.listen_addr, config.backlog, Arc::clone(&verifier))
        .context("failed to bind listener")?;

    info!(addr = %config.listen_addr, "node starting");

    let chain_task = {
        let chain = Arc::clone(&chain);
        let ctx = ctx.clone();
        tokio::spawn(async move { chain.run(&ctx).await })
    };
    let verifier_task = {
        let verifier = Arc::clone(&verifier);
        let ctx = ctx.clone();
        tokio::spawn(async move { verifier.run(&ctx).await })
    };
    let listener_task = {
        let ctx = ctx.clone();
        tokio::spawn(async move { listener.run(&ctx).await })
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to install SIGINT handler")?;
    info!("received SIGINT, shutting down");
    ctx.cancel();

    // Verifier drains first: chain finalization must not race new
    // insertions into `pending` while the verifier still holds undispatched
    // entries.
    let _ = verifier_task.await;
    verifier.shutdown().await;
    let _ = chain_task.await;
    let _ = listener_task.await;

    info!("shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
