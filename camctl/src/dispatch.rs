//! Command dispatch
//!
//! Maps each camera-scoped [`Command`] to the vendor accessors that serve it.
//! A `set` writes through the vendor, then reads the value back; the reply
//! carries the read-back, not the request.

use tracing::{debug, info, warn};

use camctl_core::value::{
    format_bool, format_double, parse_bool, parse_double, parse_int, parse_pair,
};
use camctl_core::{Access, Command, ResultCode};

use crate::camera::CameraHandle;
use crate::sdk::{CameraSession, SdkResult};

/// Outcome of a command: return values or a result code
pub type Outcome = std::result::Result<Vec<String>, ResultCode>;

type Getter<T> = fn(&dyn CameraSession) -> SdkResult<T>;
type Setter<T> = fn(&mut dyn CameraSession, T) -> SdkResult<()>;
type StrSetter = fn(&mut dyn CameraSession, &str) -> SdkResult<()>;
type PairSetter = fn(&mut dyn CameraSession, i64, i64) -> SdkResult<()>;

/// How a command reaches its value
#[derive(Clone, Copy)]
enum Accessor {
    Str(Getter<String>, Option<StrSetter>),
    Int(Getter<i64>, Option<Setter<i64>>),
    Double(Getter<f64>, Option<Setter<f64>>),
    Bool(Getter<bool>, Option<Setter<bool>>),
    Pair(Getter<(i64, i64)>, Option<PairSetter>),
    List(Getter<Vec<String>>),

    /// Digital-output bit, held by the handle
    AdioBit,

    /// Descriptor text block, held by the handle
    CameraInfo,
}

fn accessor(command: Command) -> Option<Accessor> {
    use Accessor::*;

    let accessor = match command {
        Command::AdioBit => AdioBit,
        Command::ImageFormat => Str(|s| s.image_format(), Some(|s, v| s.set_image_format(v))),
        Command::SensorBitDepth => Str(
            |s| s.sensor_bit_depth(),
            Some(|s, v| s.set_sensor_bit_depth(v)),
        ),
        Command::TrigLine => Str(|s| s.trigline(), Some(|s, v| s.set_trigline(v))),
        Command::TrigLineMode => Str(|s| s.trigline_mode(), Some(|s, v| s.set_trigline_mode(v))),
        Command::TrigLineSrc => Str(|s| s.trigline_src(), Some(|s, v| s.set_trigline_src(v))),
        Command::ExposureUs => Double(|s| s.exposure_us(), Some(|s, v| s.set_exposure_us(v))),
        Command::AcqFramerate => Double(|s| s.acq_framerate(), Some(|s, v| s.set_acq_framerate(v))),
        Command::AcqFramerateAuto => Bool(
            |s| s.acq_framerate_auto(),
            Some(|s, v| s.set_acq_framerate_auto(v)),
        ),
        Command::FrameSize => Int(|s| s.frame_size(), None),
        Command::ImageSize => Pair(|s| s.image_size(), Some(|s, w, h| s.set_image_size(w, h))),
        Command::ImageOfst => Pair(|s| s.image_ofst(), Some(|s, x, y| s.set_image_ofst(x, y))),
        Command::SensorSize => Pair(|s| s.sensor_size(), None),
        Command::ThroughputLimit => Int(
            |s| s.throughput_limit(),
            Some(|s, v| s.set_throughput_limit(v)),
        ),
        Command::ThroughputLimitRange => Pair(|s| s.throughput_limit_range(), None),
        Command::CameraInfo => CameraInfo,
        Command::TrigLineSrcList => List(|s| s.trigline_src_list()),
        Command::TrigLinesList => List(|s| s.triglines_list()),
        Command::ImageFormatList => List(|s| s.image_format_list()),
        Command::SensorBitDepthList => List(|s| s.sensor_bit_depth_list()),
        Command::CaptureMaxLen => return None,
    };
    Some(accessor)
}

fn lookup(command: Command, access: Access) -> std::result::Result<Accessor, ResultCode> {
    command.check_access(access).map_err(|e| {
        warn!("{}", e);
        e.result_code()
    })?;
    accessor(command).ok_or(ResultCode::WRONG_TYPE)
}

/// Read a camera-scoped command
pub fn get(camera: &CameraHandle, command: Command) -> Outcome {
    let values = match lookup(command, Access::GET)? {
        Accessor::AdioBit => vec![camera.adio_bit().to_string()],
        Accessor::CameraInfo => vec![camera.descriptor().info_block()],
        other => read(camera.session()?, other)?,
    };

    debug!("get ({}): {} = {}", camera.identity(), command.name(), values.join(", "));
    Ok(values)
}

fn read(session: &dyn CameraSession, accessor: Accessor) -> Outcome {
    let values = match accessor {
        Accessor::Str(get, _) => vec![get(session)?],
        Accessor::Int(get, _) => vec![get(session)?.to_string()],
        Accessor::Double(get, _) => vec![format_double(get(session)?)],
        Accessor::Bool(get, _) => vec![format_bool(get(session)?)],
        Accessor::Pair(get, _) => {
            let (a, b) = get(session)?;
            vec![a.to_string(), b.to_string()]
        }
        Accessor::List(get) => get(session)?,
        Accessor::AdioBit | Accessor::CameraInfo => return Err(ResultCode::WRONG_TYPE),
    };
    Ok(values)
}

/// Write a camera-scoped command, then read back the applied value
///
/// Arguments must be non-empty.
pub fn set(camera: &mut CameraHandle, command: Command, args: &[String]) -> Outcome {
    let accessor = lookup(command, Access::SET)?;
    let first = args.first().ok_or(ResultCode::NO_DATA)?;

    info!("set ({}): {} -> {}", camera.identity(), command.name(), args.join(", "));

    if let Accessor::AdioBit = accessor {
        let bit = parse_int(first).map_err(|e| e.result_code())?;
        camera.set_adio_bit(bit)?;
    } else {
        write(camera.session_mut()?, accessor, first, args)?;
    }

    let values = get(camera, command)?;
    info!("set ({}): {} = {}", camera.identity(), command.name(), values.join(", "));
    Ok(values)
}

fn write(
    session: &mut dyn CameraSession,
    accessor: Accessor,
    first: &str,
    args: &[String],
) -> SdkResult<()> {
    let invalid = |e: camctl_core::Error| e.result_code();

    match accessor {
        Accessor::Str(_, Some(set)) => set(session, first),
        Accessor::Int(_, Some(set)) => set(session, parse_int(first).map_err(invalid)?),
        Accessor::Double(_, Some(set)) => set(session, parse_double(first).map_err(invalid)?),
        Accessor::Bool(_, Some(set)) => set(session, parse_bool(first)),
        Accessor::Pair(_, Some(set)) => {
            let (a, b) = parse_pair(args).map_err(invalid)?;
            set(session, a, b)
        }
        _ => Err(ResultCode::WRONG_TYPE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::MockCameraSession;
    use camctl_core::{CameraDescriptor, CameraIdentity, ValueShape};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn camera(session: MockCameraSession) -> CameraHandle {
        let descriptor = CameraDescriptor::new("DEV_A", "Alpha", "Alvium 1800", "0001").unwrap();
        CameraHandle::from_session(CameraIdentity(11), descriptor, Box::new(session), None)
    }

    fn session() -> MockCameraSession {
        let mut session = MockCameraSession::new();
        session.expect_close().returning(|| Ok(()));
        session
    }

    #[test]
    fn test_every_camera_command_has_accessor() {
        for command in Command::ALL {
            assert_eq!(
                accessor(command).is_none(),
                command.is_process_wide(),
                "{}",
                command
            );
        }
    }

    #[test]
    fn test_accessor_matches_shape_and_access() {
        for command in Command::ALL {
            let Some(entry) = accessor(command) else {
                continue;
            };
            let (shape, writable) = match entry {
                Accessor::Str(_, set) => (ValueShape::Str, set.is_some()),
                Accessor::Int(_, set) => (ValueShape::Int, set.is_some()),
                Accessor::Double(_, set) => (ValueShape::Double, set.is_some()),
                Accessor::Bool(_, set) => (ValueShape::Bool, set.is_some()),
                Accessor::Pair(_, set) => (ValueShape::Pair, set.is_some()),
                Accessor::List(_) => (ValueShape::List, false),
                Accessor::AdioBit => (ValueShape::Int, true),
                Accessor::CameraInfo => (ValueShape::Text, false),
            };
            assert_eq!(shape, command.shape(), "{}", command);
            assert_eq!(writable, command.access().contains(Access::SET), "{}", command);
        }
    }

    #[test]
    fn test_get_double_formatted() {
        let mut session = session();
        session.expect_exposure_us().returning(|| Ok(1000.0));

        let camera = camera(session);
        assert_eq!(get(&camera, Command::ExposureUs), Ok(vec!["1000.000000".to_string()]));
    }

    #[test]
    fn test_get_bool_and_pair() {
        let mut session = session();
        session.expect_acq_framerate_auto().returning(|| Ok(false));
        session.expect_sensor_size().returning(|| Ok((2048, 1536)));

        let camera = camera(session);
        assert_eq!(get(&camera, Command::AcqFramerateAuto), Ok(vec!["False".to_string()]));
        assert_eq!(
            get(&camera, Command::SensorSize),
            Ok(vec!["2048".to_string(), "1536".to_string()])
        );
    }

    #[test]
    fn test_get_camera_info() {
        let camera = camera(session());
        assert_eq!(
            get(&camera, Command::CameraInfo),
            Ok(vec!["ID: DEV_A,\nName: Alpha,\nModel: Alvium 1800,\nSerial: 0001,\n".to_string()])
        );
    }

    #[test]
    fn test_get_vendor_error_passthrough() {
        let mut session = session();
        session
            .expect_image_format()
            .returning(|| Err(ResultCode::NOT_AVAILABLE));

        let camera = camera(session);
        assert_eq!(get(&camera, Command::ImageFormat), Err(ResultCode::NOT_AVAILABLE));
    }

    #[test]
    fn test_set_returns_read_back() {
        let mut session = session();
        session
            .expect_set_exposure_us()
            .with(eq(1234.5))
            .times(1)
            .returning(|_| Ok(()));
        session.expect_exposure_us().returning(|| Ok(1234.0));

        let mut camera = camera(session);
        let args = vec!["1234.5".to_string()];
        assert_eq!(
            set(&mut camera, Command::ExposureUs, &args),
            Ok(vec!["1234.000000".to_string()])
        );
    }

    #[test]
    fn test_set_write_failure_skips_read_back() {
        let mut session = session();
        session
            .expect_set_trigline_mode()
            .returning(|_| Err(ResultCode::INVALID_VALUE));
        session.expect_trigline_mode().never();

        let mut camera = camera(session);
        let args = vec!["Sideways".to_string()];
        assert_eq!(
            set(&mut camera, Command::TrigLineMode, &args),
            Err(ResultCode::INVALID_VALUE)
        );
    }

    #[test]
    fn test_set_read_only_rejected() {
        let mut session = session();
        session.expect_frame_size().never();

        let mut camera = camera(session);
        let args = vec!["1".to_string()];
        assert_eq!(set(&mut camera, Command::FrameSize, &args), Err(ResultCode::WRONG_TYPE));
        assert_eq!(set(&mut camera, Command::CameraInfo, &args), Err(ResultCode::WRONG_TYPE));
    }

    #[test]
    fn test_set_malformed_arguments() {
        let mut session = session();
        session.expect_set_throughput_limit().never();
        session.expect_set_image_size().never();

        let mut camera = camera(session);
        assert_eq!(
            set(&mut camera, Command::ThroughputLimit, &["fast".to_string()]),
            Err(ResultCode::WRONG_TYPE)
        );
        assert_eq!(
            set(&mut camera, Command::ImageSize, &["640".to_string()]),
            Err(ResultCode::WRONG_TYPE)
        );
    }

    #[test]
    fn test_set_pair() {
        let mut session = session();
        session
            .expect_set_image_size()
            .with(eq(640), eq(480))
            .times(1)
            .returning(|_, _| Ok(()));
        session.expect_image_size().returning(|| Ok((640, 480)));

        let mut camera = camera(session);
        let args = vec!["640".to_string(), "480".to_string()];
        assert_eq!(
            set(&mut camera, Command::ImageSize, &args),
            Ok(vec!["640".to_string(), "480".to_string()])
        );
    }

    #[test]
    fn test_set_bool_lenient() {
        let mut session = session();
        session
            .expect_set_acq_framerate_auto()
            .with(eq(false))
            .times(1)
            .returning(|_| Ok(()));
        session.expect_acq_framerate_auto().returning(|| Ok(false));

        let mut camera = camera(session);
        assert_eq!(
            set(&mut camera, Command::AcqFramerateAuto, &["yes".to_string()]),
            Ok(vec!["False".to_string()])
        );
    }

    #[test]
    fn test_set_adio_bit() {
        let mut camera = camera(session());
        assert_eq!(
            set(&mut camera, Command::AdioBit, &["4".to_string()]),
            Ok(vec!["4".to_string()])
        );
        assert_eq!(
            set(&mut camera, Command::AdioBit, &["9".to_string()]),
            Err(ResultCode::INVALID_VALUE)
        );
        assert_eq!(get(&camera, Command::AdioBit), Ok(vec!["4".to_string()]));
    }

    #[test]
    fn test_set_empty_arguments() {
        let mut camera = camera(session());
        assert_eq!(set(&mut camera, Command::ImageFormat, &[]), Err(ResultCode::NO_DATA));
    }
}
