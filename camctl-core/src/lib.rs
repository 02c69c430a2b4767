//! # camctl-core
//!
//! Core protocol implementation for the camera control server.
//!
//! This crate provides the protocol primitives:
//! - Packet structure and JSON encoding/decoding
//! - Command codes, value shapes and access rules
//! - Result codes shared with the vendor SDK
//! - Camera identity hashing
//! - Capture session state machine and capture-time ceiling
//! - Protocol constants

pub mod capture;
pub mod command;
pub mod constants;
pub mod error;
pub mod hasher;
pub mod packet;
pub mod result_code;
pub mod value;

pub use capture::{CaptureLimit, CaptureSession, CaptureState};
pub use command::{Access, Command, ValueShape};
pub use error::{Error, Result};
pub use hasher::IdentityHasher;
pub use packet::{Packet, Target, Verb};
pub use result_code::ResultCode;

pub use camctl_types::{CameraDescriptor, CameraIdentity};

/// Protocol version information
pub const PROTOCOL_VERSION: &str = "1.0";

/// Maximum encoded packet size (1 MiB)
pub const MAX_PACKET_SIZE: usize = 1 << 20;
