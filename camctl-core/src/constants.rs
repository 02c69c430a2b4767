//! Protocol constants

/// Default listen port
pub const DEFAULT_PORT: u16 = 5555;

/// Lowest accepted listen port
pub const MIN_PORT: u16 = 5000;

/// Default poll timeout / ceiling check interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default capture-time ceiling (milliseconds)
pub const DEFAULT_CAPTURE_LIMIT_MS: u64 = 5000;

/// Capture-time ceiling floor (milliseconds)
pub const MIN_CAPTURE_LIMIT_MS: u64 = 1000;

/// Digital output layout
pub mod dio {
    /// Port that carries frame-sync lines
    pub const SYNC_PORT: u8 = 0;

    /// Bits per port
    pub const PORT_WIDTH: u8 = 8;

    /// All bits of a port configured as outputs
    pub const ALL_OUTPUT: u8 = 0xFF;

    /// Wire value of an unassigned bit
    pub const BIT_UNSET: i64 = -1;
}

/// Trigger line modes
pub mod trigger {
    /// Line mode used for frame-sync output
    pub const MODE_OUTPUT: &str = "Output";
}
