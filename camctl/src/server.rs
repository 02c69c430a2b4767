//! Control server
//!
//! Single-threaded request loop:
//! 1. wait up to one poll interval for a request
//! 2. stop every capture that outlived the ceiling
//! 3. dispatch the request and send exactly one reply
//!
//! All camera state is mutated here; frame callbacks only touch
//! [`FrameSync`](crate::camera::FrameSync).

use std::future::Future;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::{debug, error, info, warn};

use camctl_core::constants::DEFAULT_POLL_INTERVAL_MS;
use camctl_core::value::{format_bool, format_double, parse_int};
use camctl_core::{CameraIdentity, CaptureLimit, Command, Packet, ResultCode, Target, Verb};
use camctl_transport::ReplyTransport;

use crate::camera::CameraHandle;
use crate::dispatch::{self, Outcome};
use crate::error::Result;
use crate::registry::Registry;

/// Current time on the runtime clock
///
/// Follows tokio's clock so a paused test runtime controls capture timing.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Camera control server
pub struct Server<T: ReplyTransport> {
    transport: T,
    registry: Registry,
    limit: CaptureLimit,
    poll_interval: Duration,
    shutdown: bool,
}

impl<T: ReplyTransport> Server<T> {
    pub fn new(transport: T, registry: Registry) -> Self {
        Self {
            transport,
            registry,
            limit: CaptureLimit::default(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            shutdown: false,
        }
    }

    /// Set the capture ceiling
    pub fn with_capture_limit(mut self, limit: CaptureLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Set the request wait between ceiling checks
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn capture_limit(&self) -> CaptureLimit {
        self.limit
    }

    /// Check if a `quit` was received
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown
    }

    /// Serve until `quit` or Ctrl-C
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(tokio::signal::ctrl_c()).await
    }

    /// Serve until `quit` or until `signal` completes
    ///
    /// On exit every capture is stopped, every sync bit driven low and every
    /// camera closed.
    pub async fn run_until<F>(&mut self, signal: F) -> Result<()>
    where
        F: Future + Send,
    {
        if !self.transport.is_bound() {
            self.transport.bind().await?;
        }
        info!(
            "Serving {} camera(s) on {} (capture ceiling {} ms)",
            self.registry.len(),
            self.transport.local_addr(),
            self.limit.millis()
        );

        tokio::pin!(signal);
        let result = loop {
            if self.shutdown {
                break Ok(());
            }

            let received = tokio::select! {
                received = self.transport.receive(self.poll_interval) => received,
                _ = &mut signal => {
                    info!("Interrupted, shutting down");
                    self.shutdown = true;
                    continue;
                }
            };

            self.enforce_capture_limit(now());

            let body = match received {
                Ok(Some(body)) => body,
                Ok(None) => continue,
                Err(e) => break Err(e.into()),
            };

            let reply = self.handle_bytes(&body);
            if let Err(e) = self.transport.reply(&reply).await {
                break Err(e.into());
            }
        };

        self.shut_down().await;
        result
    }

    async fn shut_down(&mut self) {
        info!("Stopping cameras...");
        self.registry.close_all();
        if let Err(e) = self.transport.close().await {
            warn!("Closing transport failed: {}", e);
        }
        info!("Server stopped");
    }

    /// Stop every capture that has outlived the ceiling as of `now`
    ///
    /// Returns the cameras that were stopped.
    pub fn enforce_capture_limit(&mut self, now: Instant) -> Vec<CameraIdentity> {
        let limit = self.limit;
        let mut stopped = Vec::new();

        for camera in self.registry.handles_mut() {
            let Some(elapsed) = camera.capture_elapsed(now) else {
                continue;
            };

            if camera.is_expired(now, limit) {
                warn!(
                    "{}: capture ran {} ms, over the {} ms ceiling; stopping",
                    camera.identity(),
                    elapsed.as_millis(),
                    limit.millis()
                );
                if let Err(code) = camera.stop_capture() {
                    error!("{}: forced stop failed: {}", camera.identity(), code);
                }
                stopped.push(camera.identity());
            } else {
                debug!(
                    "{}: {} ms of capture left",
                    camera.identity(),
                    limit.remaining(elapsed).as_millis()
                );
            }
        }
        stopped
    }

    /// Decode, dispatch and encode one request
    ///
    /// Undecodable bodies get a bad-parameter reply.
    pub fn handle_bytes(&mut self, body: &[u8]) -> BytesMut {
        let reply = match Packet::decode(body) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!("Malformed request: {}", e);
                Packet::malformed_reply()
            }
        };

        match reply.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Could not encode reply: {}", e);
                let mut fallback = Packet::malformed_reply();
                fallback.verb = reply.verb;
                fallback.result = ResultCode::INTERNAL_FAULT;
                BytesMut::from(serde_json::to_vec(&fallback).unwrap_or_default().as_slice())
            }
        }
    }

    /// Dispatch one request
    pub fn handle(&mut self, request: Packet) -> Packet {
        let mut reply = request.reply();

        let verb = match request.verb() {
            Ok(verb) => verb,
            Err(e) => {
                warn!("{}", e);
                reply.result = e.result_code();
                return reply;
            }
        };

        let outcome = match verb {
            Verb::Quit => {
                info!("Quit requested");
                self.shutdown = true;
                Ok(Vec::new())
            }
            Verb::List => Ok(self.registry.listed().iter().map(ToString::to_string).collect()),
            Verb::Status => self.status(request.target()),
            Verb::StartCapture => self.start_capture(request.target()),
            Verb::StopCapture => self.stop_capture(request.target()),
            Verb::StartCaptureAll => self.start_capture_all(),
            Verb::StopCaptureAll => self.stop_capture_all(),
            Verb::Get => self.get(&request),
            Verb::Set => self.set(&request),
        };

        match outcome {
            Ok(values) => reply.values = values,
            Err(code) => {
                warn!(
                    "{} (camera={:?}, command={}) failed: {}",
                    verb, request.camera, request.command, code
                );
                reply.result = code;
            }
        }
        reply
    }

    fn status(&mut self, target: Target) -> Outcome {
        if let Target::All = target {
            let mut values = Vec::new();
            for camera in self.registry.handles() {
                values.push(camera.identity().to_string());
                values.push(camera.descriptor().id.clone());
                values.extend(camera_status(camera)?);
            }
            return Ok(values);
        }

        let camera = self.registry.resolve(target)?;
        camera_status(camera)
    }

    fn start_capture(&mut self, target: Target) -> Outcome {
        let camera = self.registry.resolve(target)?;
        camera.start_capture(now())?;
        Ok(Vec::new())
    }

    fn stop_capture(&mut self, target: Target) -> Outcome {
        let camera = self.registry.resolve(target)?;
        camera.stop_capture()?;
        Ok(Vec::new())
    }

    fn start_capture_all(&mut self) -> Outcome {
        let now = now();
        for camera in self.registry.handles_mut() {
            camera.start_capture(now)?;
        }
        Ok(Vec::new())
    }

    fn stop_capture_all(&mut self) -> Outcome {
        for camera in self.registry.handles_mut() {
            camera.stop_capture()?;
        }
        Ok(Vec::new())
    }

    fn get(&mut self, request: &Packet) -> Outcome {
        let command = Command::try_from(request.command);
        if matches!(command, Ok(c) if c.is_process_wide()) {
            self.check_process_wide_target(request.target())?;
            return Ok(vec![self.limit.millis().to_string()]);
        }

        let camera = self.registry.resolve(request.target())?;
        let command = command.map_err(|e| e.result_code())?;
        dispatch::get(camera, command)
    }

    fn set(&mut self, request: &Packet) -> Outcome {
        let Some(first) = request.arguments.first() else {
            return Err(ResultCode::NO_DATA);
        };

        let command = Command::try_from(request.command);
        if matches!(command, Ok(c) if c.is_process_wide()) {
            self.check_process_wide_target(request.target())?;
            let requested = parse_int(first).map_err(|e| e.result_code())?;
            let applied = self.limit.set(requested);
            if i64::try_from(applied) != Ok(requested) {
                warn!("Capture ceiling {} ms clamped to {} ms", requested, applied);
            }
            info!("Capture ceiling now {} ms", applied);
            return Ok(vec![applied.to_string()]);
        }

        let camera = self.registry.resolve(request.target())?;
        let command = command.map_err(|e| e.result_code())?;
        dispatch::set(camera, command, &request.arguments)
    }

    /// Process-wide commands accept no camera or any registered camera
    fn check_process_wide_target(&self, target: Target) -> std::result::Result<(), ResultCode> {
        match target {
            Target::All => Ok(()),
            Target::Camera(id) if self.registry.contains(id) => Ok(()),
            _ => Err(ResultCode::NOT_FOUND),
        }
    }
}

fn camera_status(camera: &CameraHandle) -> Outcome {
    let session = camera.session()?;
    let source = session.temperature_src()?;
    let temperature = session.temperature()?;
    Ok(vec![
        format_bool(camera.is_capturing()),
        source,
        format_double(temperature),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{CameraSession, MockCameraSession};
    use crate::sim::SimulatedSdk;
    use async_trait::async_trait;
    use camctl_core::{CameraDescriptor, IdentityHasher};
    use pretty_assertions::assert_eq;

    /// Transport that never receives anything
    #[derive(Default)]
    struct IdleTransport {
        bound: bool,
    }

    #[async_trait]
    impl ReplyTransport for IdleTransport {
        async fn bind(&mut self) -> camctl_transport::Result<()> {
            self.bound = true;
            Ok(())
        }

        async fn close(&mut self) -> camctl_transport::Result<()> {
            self.bound = false;
            Ok(())
        }

        fn is_bound(&self) -> bool {
            self.bound
        }

        async fn receive(&mut self, wait: Duration) -> camctl_transport::Result<Option<BytesMut>> {
            tokio::time::sleep(wait).await;
            Ok(None)
        }

        async fn reply(&mut self, _data: &[u8]) -> camctl_transport::Result<()> {
            Err(camctl_transport::Error::NoPendingRequest)
        }

        fn local_addr(&self) -> String {
            "idle".to_string()
        }
    }

    fn mock_session() -> MockCameraSession {
        let mut session = MockCameraSession::new();
        session.expect_start_capture().returning(|_| Ok(()));
        session.expect_stop_capture().returning(|| Ok(()));
        session.expect_close().returning(|| Ok(()));
        session.expect_temperature_src().returning(|| Ok("Sensor".to_string()));
        session.expect_temperature().returning(|| Ok(41.25));
        session
    }

    fn server_with(sessions: Vec<(u32, MockCameraSession)>) -> Server<IdleTransport> {
        let handles = sessions.into_iter().map(|(id, session)| {
            let descriptor =
                CameraDescriptor::new(format!("DEV_{}", id), "Cam", "Model", "S").unwrap();
            CameraHandle::from_session(
                CameraIdentity(id),
                descriptor,
                Box::new(session) as Box<dyn CameraSession>,
                None,
            )
        });
        Server::new(IdleTransport::default(), Registry::from_handles(handles))
    }

    fn request(verb: Verb, camera: u32) -> Packet {
        Packet::for_camera(verb, CameraIdentity(camera))
    }

    #[tokio::test]
    async fn test_list_returns_identities() {
        let mut server = server_with(vec![(20, mock_session()), (10, mock_session())]);

        let reply = server.handle(Packet::new(Verb::List));
        assert_eq!(reply.result, ResultCode::SUCCESS);
        assert_eq!(reply.values, vec!["20".to_string(), "10".to_string()]);
    }

    #[tokio::test]
    async fn test_list_includes_filtered_cameras() {
        let hasher = IdentityHasher::from_seed(3);
        let registry =
            Registry::build(&SimulatedSdk::new(3), &hasher, Some("DEV_SIM001"), None).unwrap();
        let mut server = Server::new(IdleTransport::default(), registry);

        let reply = server.handle(Packet::new(Verb::List));
        let expected: Vec<String> = ["DEV_SIM000", "DEV_SIM001", "DEV_SIM002"]
            .iter()
            .map(|id| hasher.hash(id).to_string())
            .collect();
        assert_eq!(reply.values, expected);

        // Listed but not opened
        let reply = server.handle(
            Packet::for_camera(Verb::Get, hasher.hash("DEV_SIM000")).with_command(Command::ExposureUs),
        );
        assert_eq!(reply.result, ResultCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_single_and_all() {
        let mut server = server_with(vec![(1, mock_session()), (2, mock_session())]);
        server.handle(request(Verb::StartCapture, 2));

        let reply = server.handle(request(Verb::Status, 2));
        assert_eq!(reply.values, vec!["True", "Sensor", "41.250000"]);

        let reply = server.handle(Packet::new(Verb::Status));
        assert_eq!(
            reply.values,
            vec![
                "1", "DEV_1", "False", "Sensor", "41.250000", "2", "DEV_2", "True", "Sensor",
                "41.250000"
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_camera_not_found() {
        let mut server = server_with(vec![(1, mock_session())]);

        for verb in [Verb::Status, Verb::StartCapture, Verb::StopCapture, Verb::Get] {
            let reply = server.handle(request(verb, 99).with_command(Command::ExposureUs));
            assert_eq!(reply.result, ResultCode::NOT_FOUND, "{}", verb);
            assert!(reply.values.is_empty());
        }

        // Not-found wins over an unknown command code
        let reply = server.handle(request(Verb::Get, 99).with_command(9999));
        assert_eq!(reply.result, ResultCode::NOT_FOUND);

        let mut garbled = Packet::new(Verb::Status);
        garbled.camera = "None".to_string();
        assert_eq!(server.handle(garbled).result, ResultCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_verb_and_command() {
        let mut server = server_with(vec![(1, mock_session())]);

        let mut packet = Packet::new(Verb::List);
        packet.verb = "reboot".to_string();
        assert_eq!(server.handle(packet).result, ResultCode::BAD_PARAMETER);

        let reply = server.handle(request(Verb::Get, 1).with_command(9999));
        assert_eq!(reply.result, ResultCode::WRONG_TYPE);
        assert!(reply.values.is_empty());
    }

    #[tokio::test]
    async fn test_set_without_arguments() {
        let mut server = server_with(vec![(1, mock_session())]);

        let reply = server.handle(request(Verb::Set, 1).with_command(Command::ExposureUs));
        assert_eq!(reply.result, ResultCode::NO_DATA);

        let reply = server.handle(Packet::new(Verb::Set).with_command(Command::CaptureMaxLen));
        assert_eq!(reply.result, ResultCode::NO_DATA);
        assert_eq!(server.capture_limit().millis(), 5000);
    }

    #[tokio::test]
    async fn test_capture_maxlen_clamped() {
        let mut server = server_with(vec![(1, mock_session())]);

        let reply = server.handle(
            Packet::new(Verb::Set)
                .with_command(Command::CaptureMaxLen)
                .with_arguments(["500"]),
        );
        assert_eq!(reply.result, ResultCode::SUCCESS);
        assert_eq!(reply.values, vec!["1000".to_string()]);

        let reply = server.handle(request(Verb::Get, 1).with_command(Command::CaptureMaxLen));
        assert_eq!(reply.values, vec!["1000".to_string()]);

        let reply = server.handle(request(Verb::Get, 77).with_command(Command::CaptureMaxLen));
        assert_eq!(reply.result, ResultCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_double_start_is_idempotent() {
        let mut session = MockCameraSession::new();
        session.expect_start_capture().times(1).returning(|_| Ok(()));
        session.expect_stop_capture().returning(|| Ok(()));
        session.expect_close().returning(|| Ok(()));

        let mut server = server_with(vec![(1, session)]);
        assert!(server.handle(request(Verb::StartCapture, 1)).is_success());
        assert!(server.handle(request(Verb::StartCapture, 1)).is_success());
    }

    #[tokio::test]
    async fn test_start_all_stops_at_first_failure() {
        let mut failing = MockCameraSession::new();
        failing
            .expect_start_capture()
            .returning(|_| Err(ResultCode::BUSY));
        failing.expect_close().returning(|| Ok(()));

        let mut server = server_with(vec![(1, mock_session()), (2, failing)]);

        let reply = server.handle(Packet::new(Verb::StartCaptureAll));
        assert_eq!(reply.result, ResultCode::BUSY);
        assert!(server.registry().get(CameraIdentity(1)).unwrap().is_capturing());
        assert!(!server.registry().get(CameraIdentity(2)).unwrap().is_capturing());

        let reply = server.handle(Packet::new(Verb::StopCaptureAll));
        assert!(reply.is_success());
        assert!(!server.registry().get(CameraIdentity(1)).unwrap().is_capturing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_stops_capture() {
        let mut server = server_with(vec![(1, mock_session()), (2, mock_session())]);
        server.handle(request(Verb::StartCapture, 1));
        let started = now();

        tokio::time::advance(Duration::from_millis(3000)).await;
        server.handle(request(Verb::StartCapture, 2));

        assert!(server.enforce_capture_limit(started + Duration::from_millis(5000)).is_empty());
        assert_eq!(
            server.enforce_capture_limit(started + Duration::from_millis(6000)),
            vec![CameraIdentity(1)]
        );

        let camera = server.registry().get(CameraIdentity(1)).unwrap();
        assert!(!camera.is_capturing());
        assert!(!camera.sync().level());
        assert!(server.registry().get(CameraIdentity(2)).unwrap().is_capturing());
    }

    #[tokio::test]
    async fn test_quit_sets_shutdown() {
        let mut server = server_with(vec![(1, mock_session())]);
        let reply = server.handle(Packet::new(Verb::Quit));
        assert!(reply.is_success());
        assert!(server.is_shutting_down());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut server = server_with(vec![(1, mock_session())]);
        let reply = Packet::decode(&server.handle_bytes(b"{not json")).unwrap();
        assert_eq!(reply.result, ResultCode::BAD_PARAMETER);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_signal_closes_cameras() {
        let mut server = server_with(vec![(1, mock_session())])
            .with_poll_interval(Duration::from_millis(100));
        server.handle(request(Verb::StartCapture, 1));

        server
            .run_until(tokio::time::sleep(Duration::from_millis(350)))
            .await
            .unwrap();

        let camera = server.registry().get(CameraIdentity(1)).unwrap();
        assert!(!camera.is_open());
        assert!(!camera.is_capturing());
        assert!(!server.transport().is_bound());
    }
}
