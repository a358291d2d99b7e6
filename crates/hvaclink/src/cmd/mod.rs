use std::net::SocketAddr;

use clap::{Args, Subcommand};
use hvaclink::frame::{Delimiters, FrameConfig, ReassemblyMode, DEFAULT_MAX_RESIDUAL};
use hvaclink::server::{
    ServerConfig, WritePolicy, DEFAULT_EVENTS_CAPACITY, DEFAULT_HOST, DEFAULT_MAX_PENDING_BYTES,
    DEFAULT_MAX_READS_PER_EVENT, DEFAULT_PORT, DEFAULT_READ_BUFFER_SIZE,
};
use hvaclink::transport::Endpoint;
use hvaclink::zone::DEFAULT_SET_TEMPERATURE;

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve thermostat zone commands.
    Serve(ServeArgs),
    /// Send a single packet.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Packet framing options shared by `serve` and `send`.
#[derive(Args, Debug, Clone)]
pub struct FrameArgs {
    /// Start, field separator and end bytes, in that order.
    #[arg(long, env = "HVACLINK_DELIMITERS", default_value = "*|&")]
    pub delimiters: Delimiters,
    /// Keep an unterminated trailing packet for the next read (strict) or drop it (per-read).
    #[arg(long, env = "HVACLINK_REASSEMBLY", default_value = "strict")]
    pub reassembly: ReassemblyMode,
    /// Largest unterminated fragment kept between reads, in bytes.
    #[arg(long, env = "HVACLINK_MAX_RESIDUAL", default_value_t = DEFAULT_MAX_RESIDUAL)]
    pub max_residual: usize,
}

impl FrameArgs {
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            delimiters: self.delimiters,
            reassembly: self.reassembly,
            max_residual_size: self.max_residual,
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host name or address to listen on.
    #[arg(long, env = "HVACLINK_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    /// Port to listen on (1-65535).
    #[arg(
        long,
        env = "HVACLINK_PORT",
        default_value_t = i64::from(DEFAULT_PORT),
        allow_negative_numbers = true
    )]
    pub port: i64,
    /// Bytes read from a connection per framing pass.
    #[arg(long, env = "HVACLINK_READ_BUFFER_SIZE", default_value_t = DEFAULT_READ_BUFFER_SIZE)]
    pub read_buffer_size: usize,
    /// Queue unwritten responses (buffered) or drop them (best-effort).
    #[arg(long, env = "HVACLINK_WRITE_POLICY", default_value = "buffered")]
    pub write_policy: WritePolicy,
    /// Refuse connections beyond this many open sessions.
    #[arg(long, env = "HVACLINK_MAX_CONNECTIONS")]
    pub max_connections: Option<usize>,
    /// Chunks read from one connection before other connections get a turn.
    #[arg(long, env = "HVACLINK_MAX_READS_PER_EVENT", default_value_t = DEFAULT_MAX_READS_PER_EVENT)]
    pub max_reads_per_event: usize,
    /// Unsent response bytes per connection before reading from it pauses.
    #[arg(long, env = "HVACLINK_MAX_PENDING_BYTES", default_value_t = DEFAULT_MAX_PENDING_BYTES)]
    pub max_pending_bytes: usize,
    /// How long the server waits for the zone processor per packet (e.g. 2s, 500ms).
    #[arg(long, env = "HVACLINK_REPLY_TIMEOUT", default_value = "2s")]
    pub reply_timeout: String,
    /// Initial zone 1 set temperature.
    #[arg(long, default_value_t = DEFAULT_SET_TEMPERATURE, allow_negative_numbers = true)]
    pub set_temperature: i32,
    #[command(flatten)]
    pub frame: FrameArgs,
}

impl ServeArgs {
    /// Build the server configuration, rejecting an empty host or a port
    /// outside `1..=65535`.
    pub fn server_config(&self) -> CliResult<ServerConfig> {
        let endpoint = Endpoint::with_port_number(self.host.clone(), self.port)
            .map_err(|err| transport_error("invalid listen address", err))?;
        Ok(ServerConfig {
            read_buffer_size: self.read_buffer_size,
            write_policy: self.write_policy,
            frame: self.frame.frame_config(),
            max_connections: self.max_connections,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            max_reads_per_event: self.max_reads_per_event,
            max_pending_bytes: self.max_pending_bytes,
            ..ServerConfig::new(endpoint.host(), endpoint.port())
        })
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Server address, e.g. 127.0.0.1:62501.
    pub addr: SocketAddr,
    /// Command field of the packet.
    #[arg(long, short = 'c')]
    pub command: String,
    /// Data field of the packet.
    #[arg(long, short = 'd', default_value = "")]
    pub data: String,
    /// Wait for one response packet and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        std::time::Duration::from_millis(value)
    } else {
        std::time::Duration::from_secs(value)
    })
}
