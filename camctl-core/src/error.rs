//! Error types for camctl-core

use crate::result_code::ResultCode;

/// Result type alias for camctl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown command code
    #[error("Unknown command code: {0}")]
    UnknownCommand(i32),

    /// Unknown verb in `cmd_type`
    #[error("Unknown verb: '{0}'")]
    UnknownVerb(String),

    /// Command exists but is not valid for this verb
    #[error("Command {command} does not support '{verb}'")]
    UnsupportedAccess {
        command: crate::command::Command,
        verb: &'static str,
    },

    /// Argument could not be decoded into the command's value shape
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Wrong number of arguments for a fixed-arity command
    #[error("Wrong argument count: expected {expected}, got {actual}")]
    WrongArity {
        expected: usize,
        actual: usize,
    },

    /// Capture state transition not allowed from the current state
    #[error("Invalid capture state: {0}")]
    InvalidCaptureState(String),

    /// Packet body is not a valid JSON record
    #[error("Malformed packet: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Encoded packet exceeds the frame limit
    #[error("Packet too large: {size} bytes (max: {max} bytes)")]
    PacketTooLarge {
        size: usize,
        max: usize,
    },
}

impl Error {
    /// Result code reported to a client for this error
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::UnknownCommand(_)
            | Self::UnsupportedAccess { .. }
            | Self::InvalidArgument(_)
            | Self::WrongArity { .. } => ResultCode::WRONG_TYPE,
            Self::UnknownVerb(_) | Self::Malformed(_) => ResultCode::BAD_PARAMETER,
            Self::InvalidCaptureState(_) => ResultCode::INVALID_CALL,
            Self::PacketTooLarge { .. } => ResultCode::BAD_PARAMETER,
        }
    }
}
