//! Request/reply packet and its JSON encoding

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use camctl_types::CameraIdentity;

use crate::{
    error::{Error, Result},
    result_code::ResultCode,
};

/// Top-level operation requested by a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Quit,
    Status,
    List,
    StartCapture,
    StopCapture,
    StartCaptureAll,
    StopCaptureAll,
    Get,
    Set,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Status => "status",
            Self::List => "list",
            Self::StartCapture => "start_capture",
            Self::StopCapture => "stop_capture",
            Self::StartCaptureAll => "start_capture_all",
            Self::StopCaptureAll => "stop_capture_all",
            Self::Get => "get",
            Self::Set => "set",
        }
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "quit" => Ok(Self::Quit),
            "status" => Ok(Self::Status),
            "list" => Ok(Self::List),
            "start_capture" => Ok(Self::StartCapture),
            "stop_capture" => Ok(Self::StopCapture),
            "start_capture_all" => Ok(Self::StartCaptureAll),
            "stop_capture_all" => Ok(Self::StopCaptureAll),
            "get" => Ok(Self::Get),
            "set" => Ok(Self::Set),
            other => Err(Error::UnknownVerb(other.to_string())),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera addressed by a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Empty camera field: unaddressed / all cameras
    All,

    /// A well-formed camera identity
    Camera(CameraIdentity),

    /// Camera field present but not a valid identity
    Invalid,
}

/// Request/reply packet
///
/// Requests and replies share one schema. On the wire it is a JSON object
/// with exactly six fields:
///
/// ```text
/// {
///   "cmd_type":  "get",            verb
///   "cam_id":    "1311397654",     camera identity, "" = all
///   "command":   105,              command code, 0 when irrelevant
///   "arguments": ["1000"],         set arguments
///   "retcode":   0,                result code (replies)
///   "retargs":   ["1000.000000"]   return values (replies)
/// }
/// ```
///
/// # Examples
///
/// ```
/// use camctl_core::{Packet, Verb};
///
/// let request = Packet::new(Verb::List);
/// let encoded = request.encode().unwrap();
///
/// let decoded = Packet::decode(&encoded).unwrap();
/// assert_eq!(decoded.verb().unwrap(), Verb::List);
/// ```
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Packet {
    /// Verb string
    #[serde(rename = "cmd_type")]
    pub verb: String,

    /// Camera identity as decimal string, empty when unaddressed
    #[serde(rename = "cam_id")]
    pub camera: String,

    /// Command code for `get` / `set`
    pub command: i32,

    /// Arguments for `set`
    pub arguments: Vec<String>,

    /// Result code (replies only)
    #[serde(rename = "retcode")]
    pub result: ResultCode,

    /// Return values (replies only)
    #[serde(rename = "retargs")]
    pub values: Vec<String>,
}

impl Packet {
    /// Maximum encoded size in bytes
    pub const MAX_SIZE: usize = crate::MAX_PACKET_SIZE;

    /// Create an unaddressed request
    pub fn new(verb: Verb) -> Self {
        Self {
            verb: verb.as_str().to_string(),
            ..Default::default()
        }
    }

    /// Create a request addressed to one camera
    pub fn for_camera(verb: Verb, camera: CameraIdentity) -> Self {
        Self {
            verb: verb.as_str().to_string(),
            camera: camera.to_string(),
            ..Default::default()
        }
    }

    /// Set the command code
    pub fn with_command(mut self, command: impl Into<i32>) -> Self {
        self.command = command.into();
        self
    }

    /// Set the arguments
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Parse the verb
    pub fn verb(&self) -> Result<Verb> {
        self.verb.parse()
    }

    /// Resolve the camera field
    pub fn target(&self) -> Target {
        if self.camera.is_empty() {
            return Target::All;
        }
        match self.camera.parse::<CameraIdentity>() {
            Ok(id) => Target::Camera(id),
            Err(_) => Target::Invalid,
        }
    }

    /// Start a reply for this request
    ///
    /// Verb, camera, command and arguments are echoed; return values are
    /// cleared and the result code starts at success.
    pub fn reply(&self) -> Packet {
        Packet {
            verb: self.verb.clone(),
            camera: self.camera.clone(),
            command: self.command,
            arguments: self.arguments.clone(),
            result: ResultCode::SUCCESS,
            values: Vec::new(),
        }
    }

    /// Reply for a request body that could not be decoded
    pub fn malformed_reply() -> Packet {
        Packet {
            result: ResultCode::BAD_PARAMETER,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// Encode packet to JSON bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::PacketTooLarge`] if the encoded body exceeds
    /// [`Packet::MAX_SIZE`].
    pub fn encode(&self) -> Result<BytesMut> {
        let body = serde_json::to_vec(self)?;
        if body.len() > Self::MAX_SIZE {
            return Err(Error::PacketTooLarge {
                size: body.len(),
                max: Self::MAX_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(body.len());
        buf.put_slice(&body);
        Ok(buf)
    }

    /// Decode packet from JSON bytes
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() > Self::MAX_SIZE {
            return Err(Error::PacketTooLarge {
                size: buf.len(),
                max: Self::MAX_SIZE,
            });
        }
        Ok(serde_json::from_slice(buf)?)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("verb", &self.verb)
            .field("camera", &self.camera)
            .field("command", &self.command)
            .field("arguments", &self.arguments)
            .field("result", &self.result)
            .field("values", &self.values)
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}](camera={:?}, command={}, args={}, result={}, values={})",
            self.verb,
            self.camera,
            self.command,
            self.arguments.len(),
            self.result,
            self.values.len()
        )
    }
}
