//! High-level error types

use camctl_core::{CameraIdentity, ResultCode};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] camctl_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] camctl_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] camctl_types::Error),

    #[error("Vendor call failed: {0}")]
    Sdk(#[from] ResultCode),

    #[error("Camera enumeration failed: {0}")]
    Enumeration(ResultCode),

    #[error("No cameras found")]
    NoCameras,

    #[error("Camera '{0}' not found among connected cameras")]
    CameraNotFound(String),

    #[error("No camera could be opened")]
    NoCamerasOpened,

    #[error("Cameras '{first}' and '{second}' share identity {identity}")]
    IdentityCollision {
        identity: CameraIdentity,
        first: String,
        second: String,
    },

    #[error("Server not connected")]
    NotConnected,

    #[error("Server rejected '{verb}': {code}")]
    Rejected { verb: String, code: ResultCode },

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Result code carried by a rejected request, if any
    pub fn result_code(&self) -> Option<ResultCode> {
        match self {
            Self::Rejected { code, .. } | Self::Enumeration(code) | Self::Sdk(code) => Some(*code),
            _ => None,
        }
    }
}
