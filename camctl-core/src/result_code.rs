//! Reply result codes
//!
//! Locally generated codes share the numbering of the vendor camera SDK so
//! that vendor failures can be passed through to clients unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result code carried in every reply packet
///
/// `0` is success, negative values are errors. Codes not listed as constants
/// are still valid: they come straight from the vendor SDK.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(pub i32);

impl ResultCode {
    pub const SUCCESS: Self = Self(0);
    pub const INTERNAL_FAULT: Self = Self(-1);
    pub const API_NOT_STARTED: Self = Self(-2);
    pub const NOT_FOUND: Self = Self(-3);
    pub const BAD_HANDLE: Self = Self(-4);
    pub const DEVICE_NOT_OPEN: Self = Self(-5);
    pub const INVALID_ACCESS: Self = Self(-6);
    pub const BAD_PARAMETER: Self = Self(-7);
    pub const WRONG_TYPE: Self = Self(-10);
    pub const INVALID_VALUE: Self = Self(-11);
    pub const TIMEOUT: Self = Self(-12);
    pub const OTHER: Self = Self(-13);
    pub const INVALID_CALL: Self = Self(-15);
    pub const NOT_SUPPORTED: Self = Self(-18);
    pub const IO: Self = Self(-20);
    pub const BUSY: Self = Self(-24);
    pub const NO_DATA: Self = Self(-25);
    pub const IN_USE: Self = Self(-27);
    pub const NOT_AVAILABLE: Self = Self(-30);
    pub const ALREADY: Self = Self(-33);

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Convert to `Result`, treating anything but success as an error
    pub fn ok(self) -> std::result::Result<(), Self> {
        if self.is_success() { Ok(()) } else { Err(self) }
    }

    /// Symbolic name used in log lines
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "SUCCESS",
            -1 => "INTERNAL_FAULT",
            -2 => "API_NOT_STARTED",
            -3 => "NOT_FOUND",
            -4 => "BAD_HANDLE",
            -5 => "DEVICE_NOT_OPEN",
            -6 => "INVALID_ACCESS",
            -7 => "BAD_PARAMETER",
            -10 => "WRONG_TYPE",
            -11 => "INVALID_VALUE",
            -12 => "TIMEOUT",
            -13 => "OTHER",
            -15 => "INVALID_CALL",
            -18 => "NOT_SUPPORTED",
            -20 => "IO",
            -24 => "BUSY",
            -25 => "NO_DATA",
            -27 => "IN_USE",
            -30 => "NOT_AVAILABLE",
            -33 => "ALREADY",
            _ => "UNKNOWN",
        }
    }
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> i32 {
        code.0
    }
}

impl fmt::Debug for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultCode({}, {})", self.0, self.name())
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

impl std::error::Error for ResultCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_names() {
        assert_eq!(ResultCode::SUCCESS.name(), "SUCCESS");
        assert_eq!(ResultCode::NOT_FOUND.name(), "NOT_FOUND");
        assert_eq!(ResultCode(-999).name(), "UNKNOWN");
        assert_eq!(ResultCode::NO_DATA.to_string(), "NO_DATA(-25)");
    }

    #[test]
    fn test_result_code_ok() {
        assert!(ResultCode::SUCCESS.ok().is_ok());
        assert_eq!(ResultCode::BUSY.ok(), Err(ResultCode::BUSY));
    }

    #[test]
    fn test_vendor_code_passthrough() {
        // Codes outside the named set survive conversion untouched
        let code = ResultCode::from(-41);
        assert_eq!(i32::from(code), -41);
        assert!(!code.is_success());
    }
}
