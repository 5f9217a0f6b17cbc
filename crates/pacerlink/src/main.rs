mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "pacerlink", version, about = "PacerBot host/MCU serial link tool")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacerlink_frame::Kind;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "pacerlink",
            "send",
            "/dev/ttyUSB0",
            "--kind",
            "motor-command",
            "--hex",
            "F4 01 0C FE",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.kind, Kind::MotorCommand);
                assert_eq!(args.port.baud, 115_200);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "pacerlink",
            "encode",
            "--kind",
            "host-ack",
            "--hex",
            "01",
            "--text",
            "hi",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = Cli::try_parse_from(["pacerlink", "encode", "--kind", "warp-drive"])
            .expect_err("unknown kind should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_monitor_subcommand() {
        let cli = Cli::try_parse_from([
            "pacerlink",
            "monitor",
            "/dev/ttyS2",
            "--baud",
            "57600",
            "--count",
            "3",
        ])
        .expect("monitor args should parse");
        match cli.command {
            Command::Monitor(args) => {
                assert_eq!(args.port.baud, 57_600);
                assert_eq!(args.count, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
