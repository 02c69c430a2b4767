//! High-level client interface

use std::time::Duration;

use tracing::{debug, info, trace};

use camctl_core::{CameraIdentity, Command, Packet, Verb};
use camctl_transport::{RequestTransport, TcpTransport};

use crate::error::{Error, Result};

/// Status of one camera
#[derive(Debug, Clone, PartialEq)]
pub struct CameraStatus {
    pub capturing: bool,
    pub temperature_source: String,
    pub temperature: f64,
}

impl CameraStatus {
    fn parse(fields: &[String]) -> Result<Self> {
        let [capturing, source, temperature] = fields else {
            return Err(Error::InvalidResponse(format!(
                "Status has {} fields, expected 3",
                fields.len()
            )));
        };

        Ok(Self {
            capturing: capturing.eq_ignore_ascii_case("true"),
            temperature_source: source.clone(),
            temperature: temperature
                .parse()
                .map_err(|_| Error::InvalidResponse(format!("Bad temperature '{}'", temperature)))?,
        })
    }
}

/// Status entry returned for every camera
#[derive(Debug, Clone, PartialEq)]
pub struct CameraStatusEntry {
    pub identity: CameraIdentity,
    pub id: String,
    pub status: CameraStatus,
}

/// Camera control client
///
/// # Examples
///
/// ```no_run
/// use camctl::Client;
///
/// #[tokio::main]
/// async fn main() -> camctl::Result<()> {
///     let mut client = Client::new("127.0.0.1", 5555);
///     client.connect().await?;
///
///     for camera in client.list().await? {
///         println!("{}: {:?}", camera, client.status(camera).await?);
///     }
///
///     client.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Client {
    transport: Box<dyn RequestTransport>,
    timeout: Duration,
}

impl Client {
    /// Create a client for a server at `addr:port`
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self::with_transport(Box::new(TcpTransport::new(addr, port)))
    }

    /// Create a client over any request transport
    pub fn with_transport(transport: Box<dyn RequestTransport>) -> Self {
        Self {
            transport,
            timeout: Duration::from_secs(5),
        }
    }

    /// Set reply timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Connect to server
    pub async fn connect(&mut self) -> Result<()> {
        info!("Connecting to {}...", self.transport.remote_addr());
        self.transport.connect().await?;
        Ok(())
    }

    /// Disconnect from server
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        self.transport.disconnect().await?;
        debug!("Disconnected");
        Ok(())
    }

    /// Identities of every camera the server controls
    pub async fn list(&mut self) -> Result<Vec<CameraIdentity>> {
        let values = self.call(Packet::new(Verb::List)).await?;
        values
            .iter()
            .map(|v| v.parse::<CameraIdentity>().map_err(Error::from))
            .collect()
    }

    /// Status of one camera
    pub async fn status(&mut self, camera: CameraIdentity) -> Result<CameraStatus> {
        let values = self.call(Packet::for_camera(Verb::Status, camera)).await?;
        CameraStatus::parse(&values)
    }

    /// Status of every camera
    pub async fn status_all(&mut self) -> Result<Vec<CameraStatusEntry>> {
        let values = self.call(Packet::new(Verb::Status)).await?;
        if values.len() % 5 != 0 {
            return Err(Error::InvalidResponse(format!(
                "Status of all cameras has {} fields",
                values.len()
            )));
        }

        values
            .chunks(5)
            .map(|chunk| -> Result<CameraStatusEntry> {
                Ok(CameraStatusEntry {
                    identity: chunk[0].parse::<CameraIdentity>()?,
                    id: chunk[1].clone(),
                    status: CameraStatus::parse(&chunk[2..])?,
                })
            })
            .collect()
    }

    /// Read a camera parameter
    pub async fn get(&mut self, camera: CameraIdentity, command: Command) -> Result<Vec<String>> {
        self.call(Packet::for_camera(Verb::Get, camera).with_command(command))
            .await
    }

    /// Write a camera parameter; returns the value the camera applied
    pub async fn set<I, S>(
        &mut self,
        camera: CameraIdentity,
        command: Command,
        arguments: I,
    ) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packet = Packet::for_camera(Verb::Set, camera)
            .with_command(command)
            .with_arguments(arguments);
        self.call(packet).await
    }

    /// Read the capture ceiling (milliseconds)
    pub async fn capture_limit(&mut self) -> Result<u64> {
        let values = self
            .call(Packet::new(Verb::Get).with_command(Command::CaptureMaxLen))
            .await?;
        parse_millis(&values)
    }

    /// Change the capture ceiling; returns the applied value
    pub async fn set_capture_limit(&mut self, millis: u64) -> Result<u64> {
        let packet = Packet::new(Verb::Set)
            .with_command(Command::CaptureMaxLen)
            .with_arguments([millis.to_string()]);
        let values = self.call(packet).await?;
        parse_millis(&values)
    }

    pub async fn start_capture(&mut self, camera: CameraIdentity) -> Result<()> {
        self.call(Packet::for_camera(Verb::StartCapture, camera)).await?;
        Ok(())
    }

    pub async fn stop_capture(&mut self, camera: CameraIdentity) -> Result<()> {
        self.call(Packet::for_camera(Verb::StopCapture, camera)).await?;
        Ok(())
    }

    pub async fn start_capture_all(&mut self) -> Result<()> {
        self.call(Packet::new(Verb::StartCaptureAll)).await?;
        Ok(())
    }

    pub async fn stop_capture_all(&mut self) -> Result<()> {
        self.call(Packet::new(Verb::StopCaptureAll)).await?;
        Ok(())
    }

    /// Ask the server to shut down
    pub async fn quit(&mut self) -> Result<()> {
        self.call(Packet::new(Verb::Quit)).await?;
        Ok(())
    }

    /// Send a raw request and return the raw reply
    pub async fn request(&mut self, packet: &Packet) -> Result<Packet> {
        self.ensure_connected()?;

        trace!("Sending: {:?}", packet);
        let data = packet.encode()?;
        self.transport.send(&data).await?;

        let buf = self.transport.receive(self.timeout).await?;
        let reply = Packet::decode(&buf)?;
        trace!("Received: {:?}", reply);

        Ok(reply)
    }

    /// Send a request and fail on a non-success reply
    async fn call(&mut self, packet: Packet) -> Result<Vec<String>> {
        let reply = self.request(&packet).await?;
        if !reply.is_success() {
            return Err(Error::Rejected {
                verb: packet.verb,
                code: reply.result,
            });
        }
        Ok(reply.values)
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }
}

fn parse_millis(values: &[String]) -> Result<u64> {
    values
        .first()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::InvalidResponse(format!("Bad capture ceiling {:?}", values)))
}
