//! TCP request transport (client side)

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::{error::*, frame, RequestTransport};

/// Client connection to a camera control server
pub struct TcpTransport {
    host: String,
    port: u16,
    /// Server address of the live connection
    peer: Option<SocketAddr>,
    stream: Option<TcpStream>,
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            peer: None,
            stream: None,
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Per-address connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn server(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Try every address the host name resolves to, in order
    async fn open_stream(&self) -> Result<(TcpStream, SocketAddr)> {
        let server = self.server();
        let candidates: Vec<SocketAddr> = tokio::net::lookup_host(&server)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", server, e)))?
            .collect();

        let mut reason = format!("{} resolves to no address", self.host);
        for addr in candidates {
            debug!("Trying camera server at {}", addr);
            match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => return Ok((stream, addr)),
                Ok(Err(e)) => reason = format!("{}: {}", addr, e),
                Err(_) => reason = format!("{}: no answer within {:?}", addr, self.connect_timeout),
            }
        }

        Err(Error::ServerUnreachable { server, reason })
    }
}

#[async_trait]
impl RequestTransport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let (stream, addr) = self.open_stream().await?;
        // Requests are small and latency bound
        stream.set_nodelay(true)?;

        info!("Connected to camera server {}", addr);
        self.peer = Some(addr);
        self.stream = Some(stream);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let peer = self.peer.take();
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Shutdown of {:?} failed: {}", peer, e);
            }
            info!("Disconnected from camera server {}", self.server());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        trace!("Sending {} byte request", data.len());

        frame::write_frame(stream, data).await
    }

    async fn receive(&mut self, timeout_dur: Duration) -> Result<BytesMut> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let body = timeout(timeout_dur, frame::read_frame(stream))
            .await
            .map_err(|_| Error::ReadTimeout)??;

        match body {
            Some(body) => {
                trace!("Received {} byte reply", body.len());
                Ok(body)
            }
            None => {
                // Server went away; the stream is useless from here on
                self.stream = None;
                self.peer = None;
                Err(Error::ConnectionClosed)
            }
        }
    }

    /// Resolved server address while connected, the configured one otherwise
    fn remote_addr(&self) -> String {
        match self.peer {
            Some(addr) => addr.to_string(),
            None => self.server(),
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("Connection to camera server {} dropped without disconnect", self.server());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_remote_addr_before_connect() {
        let transport = TcpTransport::new("localhost", 5555);
        assert!(!transport.is_connected());
        assert_eq!(transport.remote_addr(), "localhost:5555");
    }

    #[tokio::test]
    async fn test_connect_refused_on_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = TcpTransport::new("127.0.0.1", port)
            .with_connect_timeout(Duration::from_millis(500));

        let result = transport.connect().await;
        assert!(
            matches!(&result, Err(Error::ServerUnreachable { server, .. }) if *server == format!("127.0.0.1:{}", port)),
            "{:?}",
            result
        );
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_twice_and_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut transport = TcpTransport::new("127.0.0.1", addr.port());
        transport.connect().await.unwrap();
        assert_eq!(transport.remote_addr(), addr.to_string());
        assert!(matches!(transport.connect().await, Err(Error::AlreadyConnected)));

        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
        assert_eq!(transport.remote_addr(), format!("127.0.0.1:{}", addr.port()));
    }

    #[tokio::test]
    async fn test_server_hangup_closes_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut transport = TcpTransport::new("127.0.0.1", port);
        transport.connect().await.unwrap();
        server.await.unwrap();

        let result = transport.receive(Duration::from_secs(2)).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)), "{:?}", result);
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let mut transport = TcpTransport::new("127.0.0.1", 5555);
        let result = transport.send(b"{}").await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }
}
