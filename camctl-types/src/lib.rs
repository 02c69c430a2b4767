//! Type definitions for camctl

pub mod descriptor;
pub mod error;
pub mod identity;

pub use descriptor::CameraDescriptor;
pub use error::{Error, Result};
pub use identity::CameraIdentity;
