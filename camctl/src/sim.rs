//! Simulated vendor backend
//!
//! Stands in for camera and digital-I/O hardware. Behaves like the real SDK
//! where clients can observe it: values are clamped or rounded on write,
//! enumerated lists are enforced, and frames arrive on an SDK-owned thread
//! at the configured frame rate.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use camctl_core::constants::dio;
use camctl_core::{CameraDescriptor, ResultCode};

use crate::sdk::{CameraSdk, CameraSession, DigitalOutput, FrameCallback, SdkResult};

const SENSOR_SIZE: (i64, i64) = (2048, 1536);
const SIZE_STEP: i64 = 8;
const EXPOSURE_RANGE_US: (f64, f64) = (10.0, 10_000_000.0);
const MIN_FRAMERATE: f64 = 0.1;
const MAX_FRAMERATE: f64 = 200.0;
const THROUGHPUT_RANGE: (i64, i64) = (4_000_000, 450_000_000);

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Simulated camera SDK
#[derive(Debug, Clone, Default)]
pub struct SimulatedSdk {
    cameras: Vec<CameraDescriptor>,
    unavailable: HashSet<String>,
    enumeration_error: Option<ResultCode>,
}

impl SimulatedSdk {
    /// SDK reporting `count` cameras named `DEV_SIM000`, `DEV_SIM001`, ...
    pub fn new(count: usize) -> Self {
        let cameras = (0..count)
            .filter_map(|i| {
                CameraDescriptor::new(
                    format!("DEV_SIM{:03}", i),
                    format!("Simulated camera {}", i),
                    "Sim 1800 U-319m",
                    format!("SIM{:05}", i),
                )
                .ok()
            })
            .collect();
        Self::with_cameras(cameras)
    }

    pub fn with_cameras(cameras: Vec<CameraDescriptor>) -> Self {
        Self {
            cameras,
            ..Default::default()
        }
    }

    /// Make opening camera `id` fail as if another process holds it
    pub fn with_unavailable(mut self, id: impl Into<String>) -> Self {
        self.unavailable.insert(id.into());
        self
    }

    /// Make enumeration fail
    pub fn with_enumeration_error(mut self, code: ResultCode) -> Self {
        self.enumeration_error = Some(code);
        self
    }

    pub fn cameras(&self) -> &[CameraDescriptor] {
        &self.cameras
    }
}

impl CameraSdk for SimulatedSdk {
    fn list_cameras(&self) -> SdkResult<Vec<CameraDescriptor>> {
        match self.enumeration_error {
            Some(code) => Err(code),
            None => Ok(self.cameras.clone()),
        }
    }

    fn open(&self, descriptor: &CameraDescriptor) -> SdkResult<Box<dyn CameraSession>> {
        if !self.cameras.contains(descriptor) {
            return Err(ResultCode::NOT_FOUND);
        }
        if self.unavailable.contains(&descriptor.id) {
            return Err(ResultCode::INVALID_ACCESS);
        }
        debug!("Simulated open of {}", descriptor.id);
        Ok(Box::new(SimulatedCamera::new()))
    }
}

struct Acquisition {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Simulated camera session
pub struct SimulatedCamera {
    image_format: String,
    sensor_bit_depth: String,
    trigline: String,
    trigline_modes: HashMap<String, String>,
    trigline_sources: HashMap<String, String>,
    exposure_us: f64,
    acq_framerate: f64,
    acq_framerate_auto: bool,
    image_size: (i64, i64),
    image_ofst: (i64, i64),
    throughput_limit: i64,
    temperature: f64,
    acquisition: Option<Acquisition>,
    closed: bool,
}

impl SimulatedCamera {
    const FORMATS: &'static [&'static str] = &["Mono8", "Mono10", "Mono12", "Mono16"];
    const BIT_DEPTHS: &'static [&'static str] = &["Bpp8", "Bpp10", "Bpp12"];
    const LINES: &'static [&'static str] = &["Line0", "Line1", "Line2", "Line3"];
    const LINE_MODES: &'static [&'static str] = &["Input", "Output"];
    const LINE_SOURCES: &'static [&'static str] =
        &["Off", "ExposureActive", "FrameTriggerWait", "AcquisitionActive"];

    pub fn new() -> Self {
        let lines = Self::LINES.iter().map(|l| l.to_string());
        Self {
            image_format: "Mono8".to_string(),
            sensor_bit_depth: "Bpp8".to_string(),
            trigline: "Line0".to_string(),
            trigline_modes: lines.clone().map(|l| (l, "Input".to_string())).collect(),
            trigline_sources: lines.map(|l| (l, "Off".to_string())).collect(),
            exposure_us: 5000.0,
            acq_framerate: 30.0,
            acq_framerate_auto: false,
            image_size: SENSOR_SIZE,
            image_ofst: (0, 0),
            throughput_limit: THROUGHPUT_RANGE.1,
            temperature: 38.5,
            acquisition: None,
            closed: false,
        }
    }

    fn check_open(&self) -> SdkResult<()> {
        if self.closed {
            return Err(ResultCode::DEVICE_NOT_OPEN);
        }
        Ok(())
    }

    fn check_idle(&self) -> SdkResult<()> {
        self.check_open()?;
        if self.acquisition.is_some() {
            return Err(ResultCode::INVALID_ACCESS);
        }
        Ok(())
    }

    fn check_listed(list: &[&str], value: &str) -> SdkResult<()> {
        if list.contains(&value) {
            Ok(())
        } else {
            Err(ResultCode::INVALID_VALUE)
        }
    }

    /// Highest frame rate the current exposure allows
    fn max_framerate(&self) -> f64 {
        (1e6 / self.exposure_us).min(MAX_FRAMERATE)
    }

    fn bytes_per_pixel(&self) -> i64 {
        if self.image_format == "Mono8" { 1 } else { 2 }
    }

    /// Round down to the size step and clamp into `[min, max]`
    fn snap(value: i64, min: i64, max: i64) -> i64 {
        (value - value.rem_euclid(SIZE_STEP)).clamp(min, max.max(min))
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraSession for SimulatedCamera {
    fn image_format(&self) -> SdkResult<String> {
        self.check_open()?;
        Ok(self.image_format.clone())
    }

    fn set_image_format(&mut self, value: &str) -> SdkResult<()> {
        self.check_idle()?;
        Self::check_listed(Self::FORMATS, value)?;
        self.image_format = value.to_string();
        Ok(())
    }

    fn image_format_list(&self) -> SdkResult<Vec<String>> {
        self.check_open()?;
        Ok(names(Self::FORMATS))
    }

    fn sensor_bit_depth(&self) -> SdkResult<String> {
        self.check_open()?;
        Ok(self.sensor_bit_depth.clone())
    }

    fn set_sensor_bit_depth(&mut self, value: &str) -> SdkResult<()> {
        self.check_idle()?;
        Self::check_listed(Self::BIT_DEPTHS, value)?;
        self.sensor_bit_depth = value.to_string();
        Ok(())
    }

    fn sensor_bit_depth_list(&self) -> SdkResult<Vec<String>> {
        self.check_open()?;
        Ok(names(Self::BIT_DEPTHS))
    }

    fn trigline(&self) -> SdkResult<String> {
        self.check_open()?;
        Ok(self.trigline.clone())
    }

    fn set_trigline(&mut self, value: &str) -> SdkResult<()> {
        self.check_open()?;
        Self::check_listed(Self::LINES, value)?;
        self.trigline = value.to_string();
        Ok(())
    }

    fn triglines_list(&self) -> SdkResult<Vec<String>> {
        self.check_open()?;
        Ok(names(Self::LINES))
    }

    fn trigline_mode(&self) -> SdkResult<String> {
        self.check_open()?;
        self.trigline_modes
            .get(&self.trigline)
            .cloned()
            .ok_or(ResultCode::NOT_FOUND)
    }

    fn set_trigline_mode(&mut self, value: &str) -> SdkResult<()> {
        self.check_open()?;
        Self::check_listed(Self::LINE_MODES, value)?;
        self.trigline_modes
            .insert(self.trigline.clone(), value.to_string());
        Ok(())
    }

    fn trigline_src(&self) -> SdkResult<String> {
        self.check_open()?;
        self.trigline_sources
            .get(&self.trigline)
            .cloned()
            .ok_or(ResultCode::NOT_FOUND)
    }

    fn set_trigline_src(&mut self, value: &str) -> SdkResult<()> {
        self.check_open()?;
        Self::check_listed(Self::LINE_SOURCES, value)?;
        if self.trigline_modes.get(&self.trigline).map(String::as_str) != Some("Output") {
            return Err(ResultCode::INVALID_ACCESS);
        }
        self.trigline_sources
            .insert(self.trigline.clone(), value.to_string());
        Ok(())
    }

    fn trigline_src_list(&self) -> SdkResult<Vec<String>> {
        self.check_open()?;
        Ok(names(Self::LINE_SOURCES))
    }

    fn exposure_us(&self) -> SdkResult<f64> {
        self.check_open()?;
        Ok(self.exposure_us)
    }

    fn set_exposure_us(&mut self, value: f64) -> SdkResult<()> {
        self.check_open()?;
        self.exposure_us = value.round().clamp(EXPOSURE_RANGE_US.0, EXPOSURE_RANGE_US.1);
        self.acq_framerate = self.acq_framerate.min(self.max_framerate());
        Ok(())
    }

    fn acq_framerate(&self) -> SdkResult<f64> {
        self.check_open()?;
        if self.acq_framerate_auto {
            return Ok(self.max_framerate());
        }
        Ok(self.acq_framerate)
    }

    fn set_acq_framerate(&mut self, value: f64) -> SdkResult<()> {
        self.check_open()?;
        if self.acq_framerate_auto {
            return Err(ResultCode::INVALID_ACCESS);
        }
        self.acq_framerate = value.clamp(MIN_FRAMERATE, self.max_framerate());
        Ok(())
    }

    fn acq_framerate_auto(&self) -> SdkResult<bool> {
        self.check_open()?;
        Ok(self.acq_framerate_auto)
    }

    fn set_acq_framerate_auto(&mut self, value: bool) -> SdkResult<()> {
        self.check_open()?;
        self.acq_framerate_auto = value;
        Ok(())
    }

    fn frame_size(&self) -> SdkResult<i64> {
        self.check_open()?;
        Ok(self.image_size.0 * self.image_size.1 * self.bytes_per_pixel())
    }

    fn image_size(&self) -> SdkResult<(i64, i64)> {
        self.check_open()?;
        Ok(self.image_size)
    }

    fn set_image_size(&mut self, width: i64, height: i64) -> SdkResult<()> {
        self.check_idle()?;
        self.image_size = (
            Self::snap(width, SIZE_STEP, SENSOR_SIZE.0 - self.image_ofst.0),
            Self::snap(height, SIZE_STEP, SENSOR_SIZE.1 - self.image_ofst.1),
        );
        Ok(())
    }

    fn image_ofst(&self) -> SdkResult<(i64, i64)> {
        self.check_open()?;
        Ok(self.image_ofst)
    }

    fn set_image_ofst(&mut self, x: i64, y: i64) -> SdkResult<()> {
        self.check_idle()?;
        self.image_ofst = (
            Self::snap(x, 0, SENSOR_SIZE.0 - self.image_size.0),
            Self::snap(y, 0, SENSOR_SIZE.1 - self.image_size.1),
        );
        Ok(())
    }

    fn sensor_size(&self) -> SdkResult<(i64, i64)> {
        self.check_open()?;
        Ok(SENSOR_SIZE)
    }

    fn throughput_limit(&self) -> SdkResult<i64> {
        self.check_open()?;
        Ok(self.throughput_limit)
    }

    fn set_throughput_limit(&mut self, value: i64) -> SdkResult<()> {
        self.check_open()?;
        self.throughput_limit = value.clamp(THROUGHPUT_RANGE.0, THROUGHPUT_RANGE.1);
        Ok(())
    }

    fn throughput_limit_range(&self) -> SdkResult<(i64, i64)> {
        self.check_open()?;
        Ok(THROUGHPUT_RANGE)
    }

    fn temperature(&self) -> SdkResult<f64> {
        self.check_open()?;
        let heating = if self.acquisition.is_some() { 4.0 } else { 0.0 };
        Ok(self.temperature + heating)
    }

    fn temperature_src(&self) -> SdkResult<String> {
        self.check_open()?;
        Ok("Sensor".to_string())
    }

    fn start_capture(&mut self, on_frame: FrameCallback) -> SdkResult<()> {
        self.check_idle()?;

        let period = Duration::from_secs_f64(1.0 / self.acq_framerate()?);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("sim-acquisition".to_string())
            .spawn(move || {
                while !stop_flag.load(Ordering::Acquire) {
                    thread::park_timeout(period);
                    if stop_flag.load(Ordering::Acquire) {
                        break;
                    }
                    on_frame();
                }
            })
            .map_err(|_| ResultCode::INTERNAL_FAULT)?;

        trace!("Simulated acquisition at {:?} per frame", period);
        self.acquisition = Some(Acquisition { stop, thread });
        Ok(())
    }

    fn stop_capture(&mut self) -> SdkResult<()> {
        self.check_open()?;
        let Some(acquisition) = self.acquisition.take() else {
            return Err(ResultCode::INVALID_CALL);
        };

        acquisition.stop.store(true, Ordering::Release);
        acquisition.thread.thread().unpark();
        acquisition
            .thread
            .join()
            .map_err(|_| ResultCode::INTERNAL_FAULT)
    }

    fn close(&mut self) -> SdkResult<()> {
        if self.acquisition.is_some() {
            self.stop_capture()?;
        }
        self.closed = true;
        Ok(())
    }
}

impl Drop for SimulatedCamera {
    fn drop(&mut self) {
        if self.acquisition.is_some() {
            let _ = self.stop_capture();
        }
    }
}

/// Simulated digital-I/O board
///
/// Records the level of every line so tests can observe frame sync.
#[derive(Debug, Default)]
pub struct SimulatedDio {
    levels: Mutex<HashMap<u8, u8>>,
    outputs: Mutex<HashMap<u8, u8>>,
    writes: AtomicU64,
}

impl SimulatedDio {
    /// Highest minor number with a board present
    pub const MAX_MINOR: u32 = 3;

    /// Open the board at `minor`
    pub fn open(minor: u32) -> SdkResult<Self> {
        if minor > Self::MAX_MINOR {
            return Err(ResultCode::NOT_FOUND);
        }
        debug!("Simulated digital I/O board {} opened", minor);
        Ok(Self::default())
    }

    /// Level of one line
    pub fn level(&self, port: u8, bit: u8) -> bool {
        self.port_value(port) & (1 << bit) != 0
    }

    pub fn port_value(&self, port: u8) -> u8 {
        self.levels.lock().get(&port).copied().unwrap_or(0)
    }

    /// Number of successful writes so far
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn check_output(&self, port: u8, mask: u8) -> SdkResult<()> {
        let outputs = self.outputs.lock().get(&port).copied().unwrap_or(0);
        if outputs & mask != mask {
            return Err(ResultCode::INVALID_CALL);
        }
        Ok(())
    }
}

impl DigitalOutput for SimulatedDio {
    fn configure_port(&self, port: u8, output_mask: u8) -> SdkResult<()> {
        self.outputs.lock().insert(port, output_mask);
        Ok(())
    }

    fn write_port(&self, port: u8, value: u8) -> SdkResult<()> {
        self.check_output(port, dio::ALL_OUTPUT)?;
        self.levels.lock().insert(port, value);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_bit(&self, port: u8, bit: u8, high: bool) -> SdkResult<()> {
        if bit >= dio::PORT_WIDTH {
            return Err(ResultCode::BAD_PARAMETER);
        }
        self.check_output(port, 1 << bit)?;

        let mut levels = self.levels.lock();
        let value = levels.entry(port).or_insert(0);
        if high {
            *value |= 1 << bit;
        } else {
            *value &= !(1 << bit);
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
