//! # camctl
//!
//! Request/reply control server for a fleet of scientific cameras.
//!
//! ## Features
//!
//! - Stable 32-bit camera identities derived from vendor id strings
//! - Typed parameter access through a declarative command table
//! - Capture sessions with a process-wide capture-time ceiling
//! - Frame sync: a digital output line toggles on every delivered frame
//! - Async client over the same length-prefixed JSON protocol
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use camctl::sim::{SimulatedDio, SimulatedSdk};
//! use camctl::{DigitalOutput, IdentityHasher, Registry, Server, TcpReplyServer};
//!
//! #[tokio::main]
//! async fn main() -> camctl::Result<()> {
//!     let sdk = SimulatedSdk::new(2);
//!     let dio: Arc<dyn DigitalOutput> = Arc::new(SimulatedDio::open(0)?);
//!     camctl::init_sync_port(dio.as_ref());
//!
//!     let registry = Registry::build(&sdk, &IdentityHasher::new(), None, Some(dio))?;
//!     let mut server = Server::new(TcpReplyServer::new("0.0.0.0", 5555), registry);
//!
//!     server.run().await
//! }
//! ```

pub mod camera;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod sdk;
pub mod server;
pub mod sim;

// Re-exports
pub use camera::{CameraHandle, FrameSync};
pub use client::{CameraStatus, CameraStatusEntry, Client};
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use registry::Registry;
pub use sdk::{init_sync_port, CameraSdk, CameraSession, DigitalOutput, FrameCallback, SdkResult};
pub use server::Server;

// Re-export protocol types
pub use camctl_core::{
    CameraDescriptor, CameraIdentity, CaptureLimit, CaptureState, Command, IdentityHasher, Packet,
    ResultCode, Verb, PROTOCOL_VERSION,
};
pub use camctl_transport::{ReplyTransport, RequestTransport, TcpReplyServer, TcpTransport};
