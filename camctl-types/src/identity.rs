//! Wire-level camera identity

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// 32-bit camera identity
///
/// Derived from [`CameraDescriptor::id`](crate::CameraDescriptor) by the
/// identity hasher. Travels on the wire as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CameraIdentity(pub u32);

impl CameraIdentity {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for CameraIdentity {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl FromStr for CameraIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|e| Error::Parse(format!("camera identity '{}': {}", s, e)))
    }
}

impl fmt::Display for CameraIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parse() {
        let id: CameraIdentity = "3735928559".parse().unwrap();
        assert_eq!(id, CameraIdentity(0xDEADBEEF));
        assert_eq!(id.to_string(), "3735928559");
    }

    #[test]
    fn test_identity_parse_rejects_garbage() {
        assert!("cam0".parse::<CameraIdentity>().is_err());
        assert!("".parse::<CameraIdentity>().is_err());
        assert!("-1".parse::<CameraIdentity>().is_err());
        assert!("4294967296".parse::<CameraIdentity>().is_err());
    }
}
