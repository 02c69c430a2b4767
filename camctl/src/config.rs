//! Server configuration from the command line

use std::time::Duration;

use clap::Parser;

use camctl_core::constants::{
    DEFAULT_CAPTURE_LIMIT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PORT, MIN_PORT,
};
use camctl_core::{CaptureLimit, IdentityHasher};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Request/reply control server for camera fleets")]
pub struct ServerConfig {
    /// Serve only the camera with this vendor id string
    #[arg(short = 'c', long)]
    pub camera_id: Option<String>,

    /// Minor number of the digital-I/O device used for frame sync
    #[arg(short = 'a', long, default_value_t = 0)]
    pub adio_minor: u32,

    /// Listen port
    #[arg(
        short = 'p',
        long,
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u16).range(i64::from(MIN_PORT)..)
    )]
    pub port: u16,

    /// Listen address
    #[arg(short = 'b', long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Initial capture ceiling in milliseconds (never below 1000)
    #[arg(long, default_value_t = DEFAULT_CAPTURE_LIMIT_MS)]
    pub capture_limit_ms: u64,

    /// Request wait between capture ceiling checks, in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: u64,

    /// Seed for the identity hash table; random when omitted
    #[arg(long)]
    pub hash_seed: Option<u64>,

    /// Number of cameras the simulated backend reports
    #[arg(long, default_value_t = 2)]
    pub sim_cameras: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ServerConfig {
    pub fn capture_limit(&self) -> CaptureLimit {
        CaptureLimit::new(self.capture_limit_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Identity hasher; identities are stable only within one process unless seeded
    pub fn hasher(&self) -> IdentityHasher {
        match self.hash_seed {
            Some(seed) => IdentityHasher::from_seed(seed),
            None => IdentityHasher::new(),
        }
    }

    /// Default log filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
