//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,
    
    #[error("Already connected")]
    AlreadyConnected,

    #[error("Not bound")]
    NotBound,

    #[error("Already bound")]
    AlreadyBound,
    
    #[error("Read timeout")]
    ReadTimeout,
    
    #[error("No camera server reachable at {server}: {reason}")]
    ServerUnreachable {
        server: String,
        reason: String,
    },
    
    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("Reply still pending for the previous request")]
    ReplyPending,

    #[error("No request waiting for a reply")]
    NoPendingRequest,

    #[error("Frame too large: {size} bytes (max: {max} bytes)")]
    FrameTooLarge {
        size: usize,
        max: usize,
    },
    
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
