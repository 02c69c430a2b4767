//! Camera handle
//!
//! One [`CameraHandle`] per opened camera. It owns:
//! - the vendor session
//! - the capture session (idle / capturing, start timestamp)
//! - the frame-sync state shared with the SDK's frame callback
//!
//! The frame callback runs on an SDK thread. It only touches [`FrameSync`],
//! whose lock also covers the digital-output writes so that a stop's
//! force-low cannot be overtaken by an in-flight toggle.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use camctl_core::constants::{dio, trigger};
use camctl_core::{CameraDescriptor, CameraIdentity, CaptureLimit, CaptureSession, CaptureState, ResultCode};

use crate::sdk::{CameraSdk, CameraSession, DigitalOutput, FrameCallback, SdkResult};

#[derive(Debug, Default)]
struct SyncState {
    frames: u64,
    level: bool,
    bit: Option<u8>,
}

/// Frame counter and sync-bit state touched by the frame callback
pub struct FrameSync {
    output: Option<Arc<dyn DigitalOutput>>,
    state: Mutex<SyncState>,
}

impl FrameSync {
    pub fn new(output: Option<Arc<dyn DigitalOutput>>) -> Self {
        Self {
            output,
            state: Mutex::new(SyncState::default()),
        }
    }

    /// Count one frame and toggle the sync bit, if assigned
    pub fn on_frame(&self) {
        let mut state = self.state.lock();
        state.frames += 1;

        if let (Some(output), Some(bit)) = (&self.output, state.bit) {
            state.level = !state.level;
            if let Err(code) = output.write_bit(dio::SYNC_PORT, bit, state.level) {
                warn!("Frame sync write to bit {} failed: {}", bit, code);
            }
        }
        trace!("Frame {} (level={})", state.frames, state.level);
    }

    pub fn frames(&self) -> u64 {
        self.state.lock().frames
    }

    /// Current output level of the sync bit
    pub fn level(&self) -> bool {
        self.state.lock().level
    }

    pub fn bit(&self) -> Option<u8> {
        self.state.lock().bit
    }

    fn reset_frames(&self) {
        self.state.lock().frames = 0;
    }

    /// Drive the sync bit low
    fn drive_low(&self) {
        let mut state = self.state.lock();
        Self::write_low(&self.output, &mut state);
    }

    /// Reassign the sync bit; a high output is driven low first
    fn assign(&self, bit: Option<u8>) {
        let mut state = self.state.lock();
        if state.level {
            Self::write_low(&self.output, &mut state);
        }
        state.bit = bit;
    }

    fn write_low(output: &Option<Arc<dyn DigitalOutput>>, state: &mut SyncState) {
        state.level = false;
        if let (Some(output), Some(bit)) = (output, state.bit) {
            if let Err(code) = output.write_bit(dio::SYNC_PORT, bit, false) {
                warn!("Could not drive bit {} low: {}", bit, code);
            }
        }
    }
}

impl fmt::Debug for FrameSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSync")
            .field("output", &self.output.is_some())
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Opened camera
pub struct CameraHandle {
    identity: CameraIdentity,
    descriptor: CameraDescriptor,
    session: Option<Box<dyn CameraSession>>,
    capture: CaptureSession,
    sync: Arc<FrameSync>,
}

impl CameraHandle {
    /// Open a camera and switch its trigger lines to output
    pub fn open(
        sdk: &dyn CameraSdk,
        identity: CameraIdentity,
        descriptor: CameraDescriptor,
        output: Option<Arc<dyn DigitalOutput>>,
    ) -> SdkResult<Self> {
        debug!("Opening camera {}...", descriptor.id);
        let session = sdk.open(&descriptor)?;

        let mut handle = Self::from_session(identity, descriptor, session, output);
        handle.prepare_trigger_lines();

        info!("Opened {} as {}", handle.descriptor, handle.identity);
        Ok(handle)
    }

    /// Wrap an already-open vendor session
    pub fn from_session(
        identity: CameraIdentity,
        descriptor: CameraDescriptor,
        session: Box<dyn CameraSession>,
        output: Option<Arc<dyn DigitalOutput>>,
    ) -> Self {
        Self {
            identity,
            descriptor,
            session: Some(session),
            capture: CaptureSession::new(),
            sync: Arc::new(FrameSync::new(output)),
        }
    }

    /// Put every trigger line in output mode, then reselect the original line
    ///
    /// Best effort: a camera without configurable lines is still usable.
    fn prepare_trigger_lines(&mut self) {
        let Some(session) = self.session.as_deref_mut() else {
            return;
        };

        let original = match session.trigline() {
            Ok(line) => line,
            Err(code) => {
                warn!("{}: trigger lines not configurable: {}", self.descriptor.id, code);
                return;
            }
        };
        let lines = match session.triglines_list() {
            Ok(lines) => lines,
            Err(code) => {
                warn!("{}: could not list trigger lines: {}", self.descriptor.id, code);
                return;
            }
        };

        for line in &lines {
            let result = session
                .set_trigline(line)
                .and_then(|_| session.set_trigline_mode(trigger::MODE_OUTPUT));
            if let Err(code) = result {
                warn!("{}: could not set {} to output: {}", self.descriptor.id, line, code);
            }
        }

        if let Err(code) = session.set_trigline(&original) {
            warn!("{}: could not reselect {}: {}", self.descriptor.id, original, code);
        }
    }

    pub fn identity(&self) -> CameraIdentity {
        self.identity
    }

    pub fn descriptor(&self) -> &CameraDescriptor {
        &self.descriptor
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_capturing()
    }

    /// Frames delivered since the last capture start
    pub fn frames(&self) -> u64 {
        self.sync.frames()
    }

    /// Frame-sync state shared with the SDK callback
    pub fn sync(&self) -> &Arc<FrameSync> {
        &self.sync
    }

    /// Vendor session, for reads
    pub fn session(&self) -> SdkResult<&dyn CameraSession> {
        self.session.as_deref().ok_or(ResultCode::DEVICE_NOT_OPEN)
    }

    /// Vendor session, for writes
    pub fn session_mut(&mut self) -> SdkResult<&mut (dyn CameraSession + 'static)> {
        self.session.as_deref_mut().ok_or(ResultCode::DEVICE_NOT_OPEN)
    }

    /// Assigned sync bit, `-1` when unassigned
    pub fn adio_bit(&self) -> i64 {
        self.sync.bit().map(i64::from).unwrap_or(dio::BIT_UNSET)
    }

    /// Assign the sync bit
    ///
    /// Negative values unassign it. Returns the applied value.
    pub fn set_adio_bit(&mut self, bit: i64) -> SdkResult<i64> {
        let bit = if bit < 0 {
            None
        } else {
            match u8::try_from(bit) {
                Ok(bit) if bit < dio::PORT_WIDTH => Some(bit),
                _ => return Err(ResultCode::INVALID_VALUE),
            }
        };

        self.sync.assign(bit);
        Ok(self.adio_bit())
    }

    /// Start acquisition at `now`
    ///
    /// Starting a camera that is already capturing succeeds without touching
    /// the vendor session, the frame counter or the start timestamp.
    pub fn start_capture(&mut self, now: Instant) -> SdkResult<()> {
        if self.capture.is_capturing() {
            debug!("{} already capturing", self.identity);
            return Ok(());
        }

        let session = match self.session.as_deref_mut() {
            Some(session) => session,
            None => return Err(ResultCode::DEVICE_NOT_OPEN),
        };

        self.sync.reset_frames();
        let sync = Arc::clone(&self.sync);
        let on_frame: FrameCallback = Arc::new(move || sync.on_frame());
        session.start_capture(on_frame)?;

        self.capture.begin(now).map_err(|e| e.result_code())?;
        info!("{}: capture started", self.identity);
        Ok(())
    }

    /// Stop acquisition
    ///
    /// The sync bit is driven low and the session returns to idle even when
    /// the vendor stop fails; the vendor code is still returned.
    pub fn stop_capture(&mut self) -> SdkResult<()> {
        if !self.capture.is_capturing() {
            return Ok(());
        }

        let result = match self.session.as_deref_mut() {
            Some(session) => session.stop_capture(),
            None => Ok(()),
        };

        self.sync.drive_low();
        self.capture.end();

        match result {
            Ok(()) => info!("{}: capture stopped after {} frames", self.identity, self.frames()),
            Err(code) => warn!("{}: vendor stop failed: {}", self.identity, code),
        }
        result
    }

    /// Time spent capturing as of `now`
    pub fn capture_elapsed(&self, now: Instant) -> Option<Duration> {
        self.capture.elapsed(now)
    }

    /// Check if the running capture has outlived `limit`
    pub fn is_expired(&self, now: Instant, limit: CaptureLimit) -> bool {
        self.capture.is_expired(now, limit)
    }

    /// Stop any capture and release the vendor session
    pub fn close(&mut self) -> SdkResult<()> {
        if self.capture.is_capturing() {
            let _ = self.stop_capture();
        }

        match self.session.take() {
            Some(mut session) => {
                debug!("Closing camera {}...", self.descriptor.id);
                session.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        if let Err(code) = self.close() {
            warn!("Closing camera {} failed: {}", self.descriptor.id, code);
        }
    }
}

impl fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraHandle")
            .field("identity", &self.identity)
            .field("descriptor", &self.descriptor)
            .field("open", &self.is_open())
            .field("capture", &self.capture)
            .field("sync", &self.sync)
            .finish()
    }
}
