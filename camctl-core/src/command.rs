//! Camera command definitions

use std::fmt;

use bitflags::bitflags;

use crate::error::{Error, Result};

bitflags! {
    /// Verbs a command accepts
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u8 {
        const GET = 1;
        const SET = 1 << 1;
        const GET_SET = Self::GET.bits() | Self::SET.bits();
    }
}

/// Value shape of a command's arguments and return values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Single string value
    Str,

    /// Single 64-bit integer
    Int,

    /// Double, formatted with 6 decimals
    Double,

    /// Boolean, formatted `True` / `False`
    Bool,

    /// Two integers (width x height, offset x offset, min/max)
    Pair,

    /// Variable-length list of strings
    List,

    /// Preformatted text block
    Text,
}

/// Numeric command codes for `get` / `set`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Command {
    // Digital output
    AdioBit = 10,

    // Scalar camera features
    ImageFormat = 100,
    SensorBitDepth = 101,
    TrigLine = 102,
    TrigLineMode = 103,
    TrigLineSrc = 104,
    ExposureUs = 105,
    AcqFramerate = 106,
    AcqFramerateAuto = 107,
    FrameSize = 108,

    // Geometry
    ImageSize = 200,
    ImageOfst = 201,
    SensorSize = 202,

    // Link and identity
    ThroughputLimit = 300,
    ThroughputLimitRange = 301,
    CameraInfo = 302,
    TrigLineSrcList = 303,
    TrigLinesList = 304,
    ImageFormatList = 305,
    SensorBitDepthList = 306,

    // Server
    CaptureMaxLen = 400,
}

impl Command {
    /// Every command, in code order
    pub const ALL: [Command; 21] = [
        Self::AdioBit,
        Self::ImageFormat,
        Self::SensorBitDepth,
        Self::TrigLine,
        Self::TrigLineMode,
        Self::TrigLineSrc,
        Self::ExposureUs,
        Self::AcqFramerate,
        Self::AcqFramerateAuto,
        Self::FrameSize,
        Self::ImageSize,
        Self::ImageOfst,
        Self::SensorSize,
        Self::ThroughputLimit,
        Self::ThroughputLimitRange,
        Self::CameraInfo,
        Self::TrigLineSrcList,
        Self::TrigLinesList,
        Self::ImageFormatList,
        Self::SensorBitDepthList,
        Self::CaptureMaxLen,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::AdioBit => "adio_bit",
            Self::ImageFormat => "image_format",
            Self::SensorBitDepth => "sensor_bit_depth",
            Self::TrigLine => "trigline",
            Self::TrigLineMode => "trigline_mode",
            Self::TrigLineSrc => "trigline_src",
            Self::ExposureUs => "exposure_us",
            Self::AcqFramerate => "acq_framerate",
            Self::AcqFramerateAuto => "acq_framerate_auto",
            Self::FrameSize => "frame_size",
            Self::ImageSize => "image_size",
            Self::ImageOfst => "image_ofst",
            Self::SensorSize => "sensor_size",
            Self::ThroughputLimit => "throughput_limit",
            Self::ThroughputLimitRange => "throughput_limit_range",
            Self::CameraInfo => "camera_info",
            Self::TrigLineSrcList => "trigline_src_list",
            Self::TrigLinesList => "triglines_list",
            Self::ImageFormatList => "image_format_list",
            Self::SensorBitDepthList => "sensor_bit_depth_list",
            Self::CaptureMaxLen => "capture_maxlen",
        }
    }

    /// Value shape of this command
    pub fn shape(self) -> ValueShape {
        match self {
            Self::ImageFormat
            | Self::SensorBitDepth
            | Self::TrigLine
            | Self::TrigLineMode
            | Self::TrigLineSrc => ValueShape::Str,
            Self::ExposureUs | Self::AcqFramerate => ValueShape::Double,
            Self::AcqFramerateAuto => ValueShape::Bool,
            Self::FrameSize | Self::ThroughputLimit | Self::AdioBit | Self::CaptureMaxLen => {
                ValueShape::Int
            }
            Self::ImageSize | Self::ImageOfst | Self::SensorSize | Self::ThroughputLimitRange => {
                ValueShape::Pair
            }
            Self::TrigLineSrcList
            | Self::TrigLinesList
            | Self::ImageFormatList
            | Self::SensorBitDepthList => ValueShape::List,
            Self::CameraInfo => ValueShape::Text,
        }
    }

    /// Verbs this command accepts
    pub fn access(self) -> Access {
        match self {
            Self::FrameSize
            | Self::SensorSize
            | Self::ThroughputLimitRange
            | Self::CameraInfo
            | Self::TrigLineSrcList
            | Self::TrigLinesList
            | Self::ImageFormatList
            | Self::SensorBitDepthList => Access::GET,
            _ => Access::GET_SET,
        }
    }

    /// Check if this command applies to the whole server rather than one camera
    pub fn is_process_wide(self) -> bool {
        matches!(self, Self::CaptureMaxLen)
    }

    /// Check the command accepts `verb`, reporting which verb failed
    pub fn check_access(self, access: Access) -> Result<()> {
        if self.access().contains(access) {
            return Ok(());
        }
        let verb = if access.contains(Access::SET) { "set" } else { "get" };
        Err(Error::UnsupportedAccess { command: self, verb })
    }
}

impl From<Command> for i32 {
    fn from(cmd: Command) -> i32 {
        cmd as i32
    }
}

impl TryFrom<i32> for Command {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.code() == value)
            .ok_or(Error::UnknownCommand(value))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_conversion() {
        assert_eq!(i32::from(Command::ExposureUs), 105);
        assert_eq!(Command::try_from(105).unwrap(), Command::ExposureUs);
        assert_eq!(Command::try_from(10).unwrap(), Command::AdioBit);
        assert_eq!(Command::try_from(400).unwrap(), Command::CaptureMaxLen);
    }

    #[test]
    fn test_all_codes_round_trip() {
        for cmd in Command::ALL {
            assert_eq!(Command::try_from(cmd.code()).unwrap(), cmd);
        }
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(Command::try_from(9999), Err(Error::UnknownCommand(9999))));
        assert!(Command::try_from(-1).is_err());
        assert!(Command::try_from(0).is_err());
    }

    #[test]
    fn test_read_only_commands() {
        assert_eq!(Command::FrameSize.access(), Access::GET);
        assert_eq!(Command::CameraInfo.access(), Access::GET);
        assert!(Command::FrameSize.check_access(Access::SET).is_err());
        assert!(Command::ImageSize.check_access(Access::SET).is_ok());
        assert!(Command::CaptureMaxLen.check_access(Access::GET).is_ok());
    }

    #[test]
    fn test_command_shapes() {
        assert_eq!(Command::ImageFormat.shape(), ValueShape::Str);
        assert_eq!(Command::ExposureUs.shape(), ValueShape::Double);
        assert_eq!(Command::AcqFramerateAuto.shape(), ValueShape::Bool);
        assert_eq!(Command::ImageOfst.shape(), ValueShape::Pair);
        assert_eq!(Command::TrigLinesList.shape(), ValueShape::List);
    }

    #[test]
    fn test_process_wide() {
        assert!(Command::CaptureMaxLen.is_process_wide());
        assert!(!Command::AdioBit.is_process_wide());
    }
}
