//! End-to-end ingress test over a real TCP loopback connection: ping
//! round-trip and push_transaction landing in the shared pending pool.

use blockchain_core::{PendingPool, Tag, Transaction, VerifierConfig};
use blockchain_core::TransactionVerifier;
use blockchain_crypto::Keypair;
use blockchain_network::protocol::{read_packet, write_packet, Op, Packet, Tag as WireTag};
use blockchain_network::Listener;
use runtime::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ping_then_push_transaction_round_trip() {
    let pending = Arc::new(PendingPool::new(1024));
    let verifier = Arc::new(TransactionVerifier::new(VerifierConfig::default(), Arc::clone(&pending)));

    let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), 16, Arc::clone(&verifier)).unwrap();
    let addr = listener.local_addr().unwrap();

    let ctx = Context::root();
    let accept_ctx = ctx.child();
    tokio::spawn(async move { listener.run(&accept_ctx).await });

    let verify_ctx = ctx.child();
    let verifier_runner = Arc::clone(&verifier);
    tokio::spawn(async move { verifier_runner.run(&verify_ctx).await });

    let mut stream = TcpStream::connect(addr).await.unwrap();

    let ping = Packet::ping_request(7);
    write_packet(&mut stream, &ping).await.unwrap();
    let response = read_packet(&mut stream).await.unwrap();
    assert_eq!(response.nonce, 7);
    assert_eq!(response.op, Op::Response);
    assert_eq!(response.tag, WireTag::Ping);
    assert_eq!(response.payload, b"hello world");

    let keypair = Keypair::generate();
    let tx = Transaction::new(&keypair, 1, 0, Tag::NoOp, Vec::new());
    let tx_id = tx.id();

    let push = Packet {
        nonce: 1,
        op: Op::Command,
        tag: WireTag::PushTransaction,
        payload: tx.encode(),
    };
    write_packet(&mut stream, &push).await.unwrap();

    let mut seen = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if pending.contains(&tx_id).await {
            seen = true;
            break;
        }
    }

    ctx.cancel();
    assert!(seen, "pushed transaction should appear in pending after verification");
}
