//! Transport layer for the camera control protocol
//!
//! Provides length-prefixed TCP request/reply communication: a reply
//! transport for the server and a request transport for clients.

pub mod error;
pub mod frame;
pub mod server;
pub mod tcp;

pub use error::{Error, Result};
pub use server::TcpReplyServer;
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Server side of a request/reply channel
///
/// Every request returned by [`receive`](ReplyTransport::receive) must be
/// answered with exactly one [`reply`](ReplyTransport::reply) before the
/// next `receive`.
#[async_trait]
pub trait ReplyTransport: Send {
    /// Start listening
    async fn bind(&mut self) -> Result<()>;

    /// Stop listening and drop every client
    async fn close(&mut self) -> Result<()>;

    /// Check if listening
    fn is_bound(&self) -> bool;

    /// Wait up to `timeout` for the next request
    ///
    /// Returns `Ok(None)` when the timeout elapses first.
    async fn receive(&mut self, timeout: Duration) -> Result<Option<BytesMut>>;

    /// Answer the request returned by the last `receive`
    async fn reply(&mut self, data: &[u8]) -> Result<()>;

    /// Get listen address
    fn local_addr(&self) -> String;
}

/// Client side of a request/reply channel
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Connect to server
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from server
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send one request
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one reply (with timeout)
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
