//! TCP listener and per-connection tasks for the ingress protocol.

use crate::error::NetworkError;
use crate::protocol::{self, decode_push_transaction, Op, Packet, Tag};
use blockchain_core::TransactionVerifier;
use runtime::Context;
use socket2::{Domain, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const DEFAULT_BACKLOG: i32 = 128;
/// Bounded to roughly 1 MiB of framed bytes, per the writer backpressure
/// policy.
const WRITER_QUEUE_CAPACITY: usize = 1024 * 1024 / protocol::HEADER_LEN;

pub struct Listener {
    listener: TcpListener,
    verifier: Arc<TransactionVerifier>,
}

impl Listener {
    /// Bind `addr` with `SO_REUSEADDR`/`SO_REUSEPORT` and the configured
    /// backlog. `TCP_FASTOPEN` is applied best-effort on Linux.
    pub fn bind(addr: SocketAddr, backlog: i32, verifier: Arc<TransactionVerifier>) -> Result<Self, NetworkError> {
        let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
        let socket = Socket::new(domain, Type::STREAM, None)?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        set_tcp_fastopen_best_effort(&socket);

        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(backlog)?;

        let listener = TcpListener::from_std(socket.into())?;
        info!(%addr, backlog, "listening");

        Ok(Listener { listener, verifier })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `ctx` is cancelled, spawning one task per
    /// accepted socket.
    pub async fn run(&self, ctx: &Context) {
        loop {
            let accepted = tokio::select! {
                result = self.listener.accept() => result,
                _ = ctx.cancelled() => return,
            };

            let (socket, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    continue;
                }
            };

            if let Err(err) = socket.set_nodelay(true) {
                debug!(error = %err, "failed to set TCP_NODELAY");
            }

            let verifier = Arc::clone(&self.verifier);
            let conn_ctx = ctx.child();
            tokio::spawn(async move {
                info!(%peer_addr, "connection accepted");
                if let Err(err) = handle_connection(socket, verifier, &conn_ctx).await {
                    warn!(%peer_addr, error = %err, "connection closed with error");
                } else {
                    info!(%peer_addr, "connection closed");
                }
            });
        }
    }
}

async fn handle_connection(
    socket: tokio::net::TcpStream,
    verifier: Arc<TransactionVerifier>,
    ctx: &Context,
) -> Result<(), NetworkError> {
    let (read_half, mut write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    let (tx, mut rx) = mpsc::channel::<Packet>(WRITER_QUEUE_CAPACITY);

    let writer_ctx = ctx.child();
    let writer = tokio::spawn(async move {
        loop {
            let packet = tokio::select! {
                packet = rx.recv() => match packet {
                    Some(packet) => packet,
                    None => return,
                },
                _ = writer_ctx.cancelled() => return,
            };

            if let Err(err) = protocol::write_packet(&mut write_half, &packet).await {
                warn!(error = %err, "failed to write packet");
                return;
            }
            let _ = write_half.flush().await;
        }
    });

    let result = read_loop(&mut reader, &verifier, &tx, ctx).await;
    drop(tx);
    let _ = writer.await;
    result
}

async fn read_loop(
    reader: &mut (impl tokio::io::AsyncRead + Unpin),
    verifier: &Arc<TransactionVerifier>,
    responses: &mpsc::Sender<Packet>,
    ctx: &Context,
) -> Result<(), NetworkError> {
    loop {
        let packet = tokio::select! {
            packet = protocol::read_packet(reader) => packet?,
            _ = ctx.cancelled() => return Ok(()),
        };

        match packet.tag {
            Tag::Ping if packet.op == Op::Request => {
                let response = Packet::ping_response(packet.nonce, packet.payload);
                if responses.send(response).await.is_err() {
                    return Ok(());
                }
            }
            Tag::PushTransaction => {
                let transactions = match decode_push_transaction(&packet.payload) {
                    Ok(transactions) => transactions,
                    Err(err) => {
                        warn!(error = %err, "dropping malformed push_transaction frame");
                        continue;
                    }
                };

                debug!(count = transactions.len(), "received transactions");
                for tx in transactions {
                    if verifier.push(ctx, tx).await.is_err() {
                        return Ok(());
                    }
                }
            }
            Tag::Ping => {
                // A ping response frame from a peer we never queried; ignore.
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn set_tcp_fastopen_best_effort(socket: &Socket) {
    use std::os::unix::io::AsRawFd;

    let qlen: libc::c_int = 128;
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_TCP,
            libc::TCP_FASTOPEN,
            &qlen as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        debug!(
            error = %std::io::Error::last_os_error(),
            "TCP_FASTOPEN not supported on this system, continuing without it"
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn set_tcp_fastopen_best_effort(_socket: &Socket) {
    debug!("TCP_FASTOPEN is only attempted on Linux");
}
