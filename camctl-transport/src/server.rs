//! TCP reply transport (server side)
//!
//! Accepts any number of client connections and funnels their requests into
//! one queue consumed by the control loop. Each connection follows a strict
//! request → reply cycle: after handing a request to the queue it waits for
//! the reply before reading its next frame.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::{error::*, frame, ReplyTransport};

/// Requests buffered between connection tasks and the control loop
const QUEUE_DEPTH: usize = 64;

struct Incoming {
    peer: SocketAddr,
    body: BytesMut,
    reply_tx: oneshot::Sender<Bytes>,
}

struct Pending {
    peer: SocketAddr,
    reply_tx: oneshot::Sender<Bytes>,
}

/// TCP reply transport
pub struct TcpReplyServer {
    addr: String,
    port: u16,
    local_addr: Option<SocketAddr>,
    incoming: Option<mpsc::Receiver<Incoming>>,
    pending: Option<Pending>,
    accept_task: Option<JoinHandle<()>>,
}

impl TcpReplyServer {
    /// Create a reply transport that will listen on `addr:port`
    ///
    /// Port 0 picks a free port on bind; see [`ReplyTransport::local_addr`].
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            local_addr: None,
            incoming: None,
            pending: None,
            accept_task: None,
        }
    }

    /// Bound socket address, once bound
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

#[async_trait]
impl ReplyTransport for TcpReplyServer {
    async fn bind(&mut self) -> Result<()> {
        if self.is_bound() {
            return Err(Error::AlreadyBound);
        }

        let addr_str = format!("{}:{}", self.addr, self.port);
        let listener = TcpListener::bind(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?;
        let local = listener.local_addr()?;

        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        self.accept_task = Some(tokio::spawn(accept_loop(listener, tx)));
        self.incoming = Some(rx);
        self.local_addr = Some(local);

        info!("Listening on {}", local);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(task) = self.accept_task.take() {
            debug!("Closing listener on {}...", self.local_addr());
            task.abort();
        }

        // Dropping the queue ends every connection task
        self.incoming = None;
        self.pending = None;
        self.local_addr = None;
        Ok(())
    }

    fn is_bound(&self) -> bool {
        self.incoming.is_some()
    }

    async fn receive(&mut self, wait: Duration) -> Result<Option<BytesMut>> {
        if self.pending.is_some() {
            return Err(Error::ReplyPending);
        }
        let incoming = self.incoming.as_mut().ok_or(Error::NotBound)?;

        let request = match timeout(wait, incoming.recv()).await {
            Err(_) => return Ok(None),
            Ok(None) => return Err(Error::NotBound),
            Ok(Some(request)) => request,
        };

        trace!("Request of {} bytes from {}", request.body.len(), request.peer);

        self.pending = Some(Pending {
            peer: request.peer,
            reply_tx: request.reply_tx,
        });
        Ok(Some(request.body))
    }

    async fn reply(&mut self, data: &[u8]) -> Result<()> {
        let pending = self.pending.take().ok_or(Error::NoPendingRequest)?;
        if data.len() > frame::MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge {
                size: data.len(),
                max: frame::MAX_FRAME_SIZE,
            });
        }

        if pending.reply_tx.send(Bytes::copy_from_slice(data)).is_err() {
            // Client left while its request was being served
            warn!("Dropping reply to disconnected client {}", pending.peer);
        }
        Ok(())
    }

    fn local_addr(&self) -> String {
        self.local_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for TcpReplyServer {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }
}

async fn accept_loop(listener: TcpListener, queue: mpsc::Sender<Incoming>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("Client connected: {}", peer);
                if let Err(e) = stream.set_nodelay(true) {
                    warn!("Could not disable Nagle for {}: {}", peer, e);
                }
                tokio::spawn(serve_connection(stream, peer, queue.clone()));
            }
            Err(e) => {
                warn!("Accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

async fn serve_connection(mut stream: TcpStream, peer: SocketAddr, queue: mpsc::Sender<Incoming>) {
    loop {
        let body = match frame::read_frame(&mut stream).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                info!("Client disconnected: {}", peer);
                return;
            }
            Err(e) => {
                warn!("Dropping client {}: {}", peer, e);
                return;
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = Incoming { peer, body, reply_tx };
        if queue.send(request).await.is_err() {
            debug!("Server closed, dropping client {}", peer);
            return;
        }

        let reply = match reply_rx.await {
            Ok(reply) => reply,
            Err(_) => {
                debug!("No reply produced for {}, closing connection", peer);
                return;
            }
        };

        if let Err(e) = frame::write_frame(&mut stream, &reply).await {
            warn!("Failed to send reply to {}: {}", peer, e);
            return;
        }
    }
}
