//! Capture session state machine
//!
//! A capture session tracks:
//! - Capture state (idle / capturing)
//! - Start timestamp of the running capture
//! - Elapsed time against the process-wide capture ceiling
//!
//! Timestamps are passed in by the caller so the control loop can evaluate
//! every camera against one `now` per polling tick.

use std::time::{Duration, Instant};

use crate::constants::{DEFAULT_CAPTURE_LIMIT_MS, MIN_CAPTURE_LIMIT_MS};
use crate::error::{Error, Result};

/// Capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Not capturing, no start timestamp
    Idle,

    /// Vendor acquisition active
    Capturing,
}

/// Capture session
///
/// Owned by the control loop; never touched by the frame callback.
#[derive(Debug, Clone, Default)]
pub struct CaptureSession {
    started_at: Option<Instant>,
}

impl CaptureSession {
    /// Create an idle session
    pub fn new() -> Self {
        Self { started_at: None }
    }

    /// Get current state
    pub fn state(&self) -> CaptureState {
        if self.started_at.is_some() {
            CaptureState::Capturing
        } else {
            CaptureState::Idle
        }
    }

    /// Check if capturing
    pub fn is_capturing(&self) -> bool {
        matches!(self.state(), CaptureState::Capturing)
    }

    /// Start timestamp of the running capture
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Enter `Capturing` at `now`
    pub fn begin(&mut self, now: Instant) -> Result<()> {
        if self.is_capturing() {
            return Err(Error::InvalidCaptureState(format!(
                "Cannot begin capture from state: {:?}",
                self.state()
            )));
        }

        self.started_at = Some(now);
        Ok(())
    }

    /// Return to `Idle`
    ///
    /// Always succeeds; ending an idle session is a no-op.
    pub fn end(&mut self) {
        self.started_at = None;
    }

    /// Time spent capturing as of `now`, `None` when idle
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
    }

    /// Check if the running capture has outlived `limit`
    ///
    /// The bound is strict: a capture is expired only once its elapsed time
    /// is greater than the limit.
    pub fn is_expired(&self, now: Instant, limit: CaptureLimit) -> bool {
        self.elapsed(now)
            .map(|elapsed| elapsed > limit.as_duration())
            .unwrap_or(false)
    }
}

/// Process-wide capture-time ceiling
///
/// Never below [`CaptureLimit::FLOOR_MS`]; lower requests are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureLimit {
    millis: u64,
}

impl CaptureLimit {
    /// Lowest accepted ceiling (milliseconds)
    pub const FLOOR_MS: u64 = MIN_CAPTURE_LIMIT_MS;

    /// Create a ceiling, clamping to the floor
    pub fn new(millis: u64) -> Self {
        Self {
            millis: millis.max(Self::FLOOR_MS),
        }
    }

    /// Change the ceiling
    ///
    /// Negative or too-small values are clamped to the floor.
    /// Returns the applied value.
    pub fn set(&mut self, millis: i64) -> u64 {
        let requested = u64::try_from(millis).unwrap_or(0);
        *self = Self::new(requested);
        self.millis
    }

    pub fn millis(&self) -> u64 {
        self.millis
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.millis)
    }

    /// Time left for a capture that has been running for `elapsed`
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.as_duration().saturating_sub(elapsed)
    }
}

impl Default for CaptureLimit {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_LIMIT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new() {
        let session = CaptureSession::new();
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(!session.is_capturing());
        assert!(session.started_at().is_none());
        assert!(session.elapsed(Instant::now()).is_none());
    }

    #[test]
    fn test_session_begin_end() {
        let mut session = CaptureSession::new();
        let t0 = Instant::now();

        session.begin(t0).unwrap();
        assert_eq!(session.state(), CaptureState::Capturing);
        assert_eq!(session.started_at(), Some(t0));
        assert_eq!(
            session.elapsed(t0 + Duration::from_millis(250)),
            Some(Duration::from_millis(250))
        );

        session.end();
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(session.started_at().is_none());
    }

    #[test]
    fn test_session_double_begin_rejected() {
        let mut session = CaptureSession::new();
        let t0 = Instant::now();
        session.begin(t0).unwrap();

        let result = session.begin(t0 + Duration::from_secs(1));
        assert!(matches!(result, Err(Error::InvalidCaptureState(_))));

        // The original start timestamp is kept
        assert_eq!(session.started_at(), Some(t0));
    }

    #[test]
    fn test_session_end_idle_is_noop() {
        let mut session = CaptureSession::new();
        session.end();
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[test]
    fn test_session_expiry() {
        let mut session = CaptureSession::new();
        let limit = CaptureLimit::new(5000);
        let t0 = Instant::now();
        session.begin(t0).unwrap();

        assert!(!session.is_expired(t0 + Duration::from_millis(4000), limit));
        assert!(!session.is_expired(t0 + Duration::from_millis(5000), limit));
        assert!(session.is_expired(t0 + Duration::from_millis(6000), limit));

        session.end();
        assert!(!session.is_expired(t0 + Duration::from_secs(60), limit));
    }

    #[test]
    fn test_limit_clamped_to_floor() {
        let mut limit = CaptureLimit::default();
        assert_eq!(limit.millis(), 5000);

        assert_eq!(limit.set(500), 1000);
        assert_eq!(limit.millis(), 1000);

        assert_eq!(limit.set(-20), 1000);
        assert_eq!(limit.set(12_000), 12_000);
        assert_eq!(CaptureLimit::new(0).millis(), CaptureLimit::FLOOR_MS);
    }

    #[test]
    fn test_limit_remaining() {
        let limit = CaptureLimit::new(5000);
        assert_eq!(limit.remaining(Duration::from_millis(1500)), Duration::from_millis(3500));
        assert_eq!(limit.remaining(Duration::from_secs(10)), Duration::ZERO);
    }
}
