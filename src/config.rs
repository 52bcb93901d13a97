use crate::presence::client::{is_placeholder, PLACEHOLDER_USER_ID};
use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub(crate) const DEFAULT_SOCKET_URL: &str = "wss://api.lanyard.rest/socket";

#[derive(Parser, Debug, Clone)]
#[command(name = "spacepresence")]
#[command(about = "Animated space backdrop with a live Discord/Spotify presence card")]
pub(crate) struct Args {
    /// Frame rate cap
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// RNG seed for the scene (0 = derive from the clock)
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Discord user id to follow. Leave unset for demo mode.
    #[arg(long, env = "LANYARD_USER_ID", default_value = PLACEHOLDER_USER_ID)]
    user_id: String,

    /// Presence socket endpoint
    #[arg(long, env = "LANYARD_SOCKET_URL", default_value = DEFAULT_SOCKET_URL)]
    socket_url: String,

    /// Fixed delay before reconnecting after a drop, at least one second
    #[arg(long, default_value_t = 5)]
    reconnect_secs: u64,

    /// Logical pixels per braille dot
    #[arg(long, default_value_t = 4.0)]
    px_per_dot: f32,

    /// No colors
    #[arg(long, default_value_t = false)]
    mono: bool,

    /// Write logs here (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) fps: u32,
    pub(crate) seed: u64,
    pub(crate) user_id: String,
    pub(crate) socket_url: String,
    pub(crate) reconnect_delay: Duration,
    pub(crate) px_per_dot: f32,
    pub(crate) mono: bool,
    pub(crate) log_file: Option<PathBuf>,
}

impl Config {
    pub(crate) fn from_args(args: Args) -> Result<Self> {
        if !(args.px_per_dot.is_finite() && args.px_per_dot > 0.0) {
            bail!("--px-per-dot must be a positive number, got {}", args.px_per_dot);
        }
        let url = args.socket_url.trim();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            bail!("--socket-url must be a ws:// or wss:// url, got {url:?}");
        }
        let seed = if args.seed == 0 {
            clock_seed()
        } else {
            args.seed
        };
        Ok(Self {
            fps: args.fps.clamp(10, 240),
            seed,
            user_id: args.user_id.trim().to_string(),
            socket_url: url.to_string(),
            reconnect_delay: Duration::from_secs(args.reconnect_secs.max(1)),
            px_per_dot: args.px_per_dot,
            mono: args.mono,
            log_file: args.log_file,
        })
    }

    pub(crate) fn demo_mode(&self) -> bool {
        is_placeholder(&self.user_id)
    }
}

fn clock_seed() -> u64 {
    let now = chrono::Utc::now();
    ((now.timestamp() as u64).rotate_left(20) ^ u64::from(now.timestamp_subsec_nanos())) | 1
}
