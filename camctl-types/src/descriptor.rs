//! Camera descriptor structures

use std::fmt;

use crate::error::{Error, Result};

/// Camera descriptor as reported by enumeration
///
/// Immutable once created. `id` is assigned by the vendor and is unique
/// per physical camera.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CameraDescriptor {
    /// Vendor identifier string
    pub id: String,

    /// Display name
    pub name: String,

    /// Camera model
    pub model: String,

    /// Serial number
    pub serial: String,
}

impl CameraDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        model: impl Into<String>,
        serial: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::Validation("camera identifier string is empty".into()));
        }

        Ok(Self {
            id,
            name: name.into(),
            model: model.into(),
            serial: serial.into(),
        })
    }

    /// Multi-line identity block returned by the `camera_info` command
    pub fn info_block(&self) -> String {
        format!(
            "ID: {},\nName: {},\nModel: {},\nSerial: {},\n",
            self.id, self.name, self.model, self.serial
        )
    }
}

impl fmt::Display for CameraDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Camera[{} | {}]", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_descriptor_info_block() {
        let desc = CameraDescriptor::new("DEV_1AB22C00", "Alvium 1800", "1800 U-240m", "0042").unwrap();

        assert_eq!(
            desc.info_block(),
            "ID: DEV_1AB22C00,\nName: Alvium 1800,\nModel: 1800 U-240m,\nSerial: 0042,\n"
        );
    }

    #[test]
    fn test_descriptor_empty_id_rejected() {
        let result = CameraDescriptor::new("", "name", "model", "serial");
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_descriptor_display() {
        let desc = CameraDescriptor::new("A", "Left", "M", "S").unwrap();
        assert_eq!(desc.to_string(), "Camera[A | Left]");
    }
}
