//! Vendor collaborator interfaces
//!
//! The server never talks to hardware directly. A backend provides:
//! - [`CameraSdk`]: enumeration and opening of cameras
//! - [`CameraSession`]: typed parameter access and acquisition for one open camera
//! - [`DigitalOutput`]: the digital-I/O port used for frame sync
//!
//! Vendor failures are reported as [`ResultCode`] and passed to clients
//! unchanged.

use std::sync::Arc;

use tracing::{error, info};

use camctl_core::constants::dio;
use camctl_core::{CameraDescriptor, ResultCode};

/// Result of a vendor call
pub type SdkResult<T> = std::result::Result<T, ResultCode>;

/// Frame-arrival callback
///
/// Invoked by the SDK on its own thread once per delivered frame.
pub type FrameCallback = Arc<dyn Fn() + Send + Sync>;

/// Camera SDK entry points
#[cfg_attr(test, mockall::automock)]
pub trait CameraSdk: Send {
    /// Enumerate connected cameras
    fn list_cameras(&self) -> SdkResult<Vec<CameraDescriptor>>;

    /// Open a vendor session for one camera
    fn open(&self, descriptor: &CameraDescriptor) -> SdkResult<Box<dyn CameraSession>>;
}

/// Open vendor session for one camera
///
/// Getters take `&self`, setters `&mut self`. Setters may clamp or round;
/// callers read the value back to learn what was applied.
#[cfg_attr(test, mockall::automock)]
pub trait CameraSession: Send {
    fn image_format(&self) -> SdkResult<String>;
    fn set_image_format(&mut self, value: &str) -> SdkResult<()>;
    fn image_format_list(&self) -> SdkResult<Vec<String>>;

    fn sensor_bit_depth(&self) -> SdkResult<String>;
    fn set_sensor_bit_depth(&mut self, value: &str) -> SdkResult<()>;
    fn sensor_bit_depth_list(&self) -> SdkResult<Vec<String>>;

    /// Currently selected trigger line
    fn trigline(&self) -> SdkResult<String>;
    fn set_trigline(&mut self, value: &str) -> SdkResult<()>;
    fn triglines_list(&self) -> SdkResult<Vec<String>>;

    /// Mode of the selected trigger line
    fn trigline_mode(&self) -> SdkResult<String>;
    fn set_trigline_mode(&mut self, value: &str) -> SdkResult<()>;

    /// Signal source of the selected trigger line
    fn trigline_src(&self) -> SdkResult<String>;
    fn set_trigline_src(&mut self, value: &str) -> SdkResult<()>;
    fn trigline_src_list(&self) -> SdkResult<Vec<String>>;

    fn exposure_us(&self) -> SdkResult<f64>;
    fn set_exposure_us(&mut self, value: f64) -> SdkResult<()>;

    fn acq_framerate(&self) -> SdkResult<f64>;
    fn set_acq_framerate(&mut self, value: f64) -> SdkResult<()>;

    fn acq_framerate_auto(&self) -> SdkResult<bool>;
    fn set_acq_framerate_auto(&mut self, value: bool) -> SdkResult<()>;

    /// Bytes per frame at the current format and size
    fn frame_size(&self) -> SdkResult<i64>;

    fn image_size(&self) -> SdkResult<(i64, i64)>;
    fn set_image_size(&mut self, width: i64, height: i64) -> SdkResult<()>;

    fn image_ofst(&self) -> SdkResult<(i64, i64)>;
    fn set_image_ofst(&mut self, x: i64, y: i64) -> SdkResult<()>;

    fn sensor_size(&self) -> SdkResult<(i64, i64)>;

    fn throughput_limit(&self) -> SdkResult<i64>;
    fn set_throughput_limit(&mut self, value: i64) -> SdkResult<()>;

    /// Allowed throughput limit as (min, max)
    fn throughput_limit_range(&self) -> SdkResult<(i64, i64)>;

    fn temperature(&self) -> SdkResult<f64>;
    fn temperature_src(&self) -> SdkResult<String>;

    /// Start acquisition, delivering frame events to `on_frame`
    fn start_capture(&mut self, on_frame: FrameCallback) -> SdkResult<()>;

    /// Stop acquisition; no callback runs after this returns
    fn stop_capture(&mut self) -> SdkResult<()>;

    /// Release the vendor session
    fn close(&mut self) -> SdkResult<()>;
}

/// Digital-I/O port driver
///
/// Shared between the control loop and frame callbacks.
#[cfg_attr(test, mockall::automock)]
pub trait DigitalOutput: Send + Sync {
    /// Set port direction; a set bit in `output_mask` makes that line an output
    fn configure_port(&self, port: u8, output_mask: u8) -> SdkResult<()>;

    /// Write all lines of a port
    fn write_port(&self, port: u8, value: u8) -> SdkResult<()>;

    /// Drive one line high or low
    fn write_bit(&self, port: u8, bit: u8, high: bool) -> SdkResult<()>;
}

/// Configure the frame-sync port as outputs and drive every line low
///
/// Failures are logged; frame sync is best effort.
pub fn init_sync_port(output: &dyn DigitalOutput) {
    if let Err(code) = output.configure_port(dio::SYNC_PORT, dio::ALL_OUTPUT) {
        error!("Could not set port {} to output: {}", dio::SYNC_PORT, code);
        return;
    }
    if let Err(code) = output.write_port(dio::SYNC_PORT, 0) {
        error!("Could not drive port {} low: {}", dio::SYNC_PORT, code);
        return;
    }
    info!("Digital output port {} ready", dio::SYNC_PORT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_init_sync_port_configures_then_clears() {
        let mut output = MockDigitalOutput::new();
        let mut seq = mockall::Sequence::new();
        output
            .expect_configure_port()
            .with(eq(0u8), eq(0xFFu8))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        output
            .expect_write_port()
            .with(eq(0u8), eq(0u8))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        init_sync_port(&output);
    }

    #[test]
    fn test_init_sync_port_stops_after_direction_failure() {
        let mut output = MockDigitalOutput::new();
        output
            .expect_configure_port()
            .returning(|_, _| Err(ResultCode::IO));
        output.expect_write_port().never();

        init_sync_port(&output);
    }
}
