use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use pacerlink_channel::{ChannelConfig, ChannelManager};
use pacerlink_frame::{Direction, FrameFormat, Kind};
use pacerlink_transport::{SerialConfig, SerialPort, Transport};
use tracing::info;

use crate::exit::{channel_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::{print_stats, OutputFormat};

pub mod decode;
pub mod encode;
pub mod monitor;
pub mod send;
pub mod version;

/// Serial read timeout used by the CLI. Bounds how long `stop` waits on the
/// receive worker.
const PORT_READ_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the link as the host and print every received message.
    Monitor(MonitorArgs),
    /// Send a single message to the MCU.
    Send(SendArgs),
    /// Decode one frame given as hex.
    Decode(DecodeArgs),
    /// Encode one message and print the frame as hex.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PortArgs {
    /// Serial device path.
    #[arg(env = "PACERLINK_DEVICE", default_value = "/dev/ttyS2")]
    pub device: PathBuf,
    /// Line speed in bits per second.
    #[arg(long, env = "PACERLINK_BAUD", default_value = "115200")]
    pub baud: u32,
    /// Frames carry a 4-byte millisecond timestamp.
    #[arg(long)]
    pub timestamp: bool,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit after this long (e.g. 10s, 500ms).
    #[arg(long)]
    pub duration: Option<String>,
    /// Print link counters on exit.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Payload as hex bytes (e.g. "F4 01 0C FE").
    #[arg(long, conflicts_with = "text")]
    pub hex: Option<String>,
    /// Payload as UTF-8 text.
    #[arg(long, conflicts_with = "hex")]
    pub text: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Message kind (e.g. motor-command, host-ack).
    #[arg(long, short = 'k')]
    pub kind: Kind,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Maximum time to wait for the frame to leave the queue.
    #[arg(long, default_value = "2s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex.
    pub hex: String,
    /// Frames carry a 4-byte millisecond timestamp.
    #[arg(long)]
    pub timestamp: bool,
    /// Accept zero-length payloads.
    #[arg(long)]
    pub allow_empty: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message kind (e.g. motor-command, telemetry-imu).
    #[arg(long, short = 'k')]
    pub kind: Kind,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Travel direction. Defaults to the side that normally sends the kind.
    #[arg(long)]
    pub direction: Option<DirectionArg>,
    /// Include a timestamp field with this value in milliseconds.
    #[arg(long, value_name = "MILLIS")]
    pub timestamp: Option<u32>,
    /// Accept zero-length payloads.
    #[arg(long)]
    pub allow_empty: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum DirectionArg {
    /// Host to MCU (SYNC 0xA5).
    Host,
    /// MCU to host (SYNC 0x5A).
    Mcu,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Host => Direction::HostToMcu,
            DirectionArg::Mcu => Direction::McuToHost,
        }
    }
}

/// Host channel over the serial device named by `port`.
pub(crate) fn open_host(port: &PortArgs) -> CliResult<ChannelManager> {
    let format = FrameFormat {
        timestamp: port.timestamp,
        ..FrameFormat::default()
    };
    let config = ChannelConfig {
        format,
        baud_rate: port.baud,
        ..ChannelConfig::host()
    };
    let serial = SerialPort::new(SerialConfig {
        path: port.device.clone(),
        baud_rate: port.baud,
        read_timeout: PORT_READ_TIMEOUT,
    });

    let mut manager = ChannelManager::new(config);
    manager
        .init(Arc::new(serial) as Arc<dyn Transport>)
        .map_err(|err| channel_error("open failed", err))?;
    manager
        .start()
        .map_err(|err| channel_error("start failed", err))?;
    info!(device = %port.device.display(), baud = port.baud, "link up");
    Ok(manager)
}

/// Stop and release a channel, optionally printing its counters first.
pub(crate) fn close_host(
    mut manager: ChannelManager,
    stats: Option<OutputFormat>,
) -> CliResult<()> {
    let handle = manager
        .handle()
        .map_err(|err| channel_error("close failed", err))?;
    if manager.is_running() {
        manager
            .stop()
            .map_err(|err| channel_error("stop failed", err))?;
    }
    if let Some(format) = stats {
        print_stats(handle.run_status(), handle.stats(), format);
    }
    manager
        .deinit()
        .map_err(|err| channel_error("close failed", err))
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub(crate) fn resolve_payload(args: &PayloadArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(text) = &args.text {
        return Ok(text.as_bytes().to_vec());
    }
    Ok(Vec::new())
}

/// Parse hex bytes. Accepts separators (space, `:`, `,`, `-`) and `0x`
/// prefixes, or one unbroken run of digits.
pub(crate) fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let mut digits = String::with_capacity(input.len());
    for token in input.split(|c: char| c.is_whitespace() || matches!(c, ':' | ',' | '-')) {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if token.len() == 1 {
            digits.push('0');
        }
        digits.push_str(token);
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, format!("odd number of hex digits: {input}")));
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CliError::new(USAGE, format!("invalid hex: {input}")))
        })
        .collect()
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
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
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_accepts_common_spellings() {
        let want = vec![0xA5, 0x08, 0x04];
        assert_eq!(parse_hex("A5 08 04").unwrap(), want);
        assert_eq!(parse_hex("a50804").unwrap(), want);
        assert_eq!(parse_hex("0xA5,0x08,0x04").unwrap(), want);
        assert_eq!(parse_hex("a5:8:4").unwrap(), want);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn hex_rejects_garbage() {
        assert_eq!(parse_hex("A5G0").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("A50").unwrap_err().code, USAGE);
    }

    #[test]
    fn payload_defaults_to_empty() {
        let args = PayloadArgs {
            hex: None,
            text: None,
        };
        assert!(resolve_payload(&args).unwrap().is_empty());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }

    #[test]
    fn direction_arg_maps_to_sync() {
        assert_eq!(Direction::from(DirectionArg::Host).sync(), 0xA5);
        assert_eq!(Direction::from(DirectionArg::Mcu).sync(), 0x5A);
    }
}
