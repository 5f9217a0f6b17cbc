use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pacerlink_channel::{LinkStatsSnapshot, RunStatus};
use pacerlink_frame::{Decoded, Direction, Message};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    direction: &'a str,
    kind: &'a str,
    tag: u8,
    category: &'a str,
    len: usize,
    timestamp: Option<u32>,
    payload_hex: String,
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_len: Option<usize>,
}

impl<'a> MessageOutput<'a> {
    fn new(direction: Direction, message: &'a Message, frame_len: Option<usize>) -> Self {
        Self {
            direction: direction.name(),
            kind: message.kind().name(),
            tag: message.kind().tag(),
            category: message.category().name(),
            len: message.len(),
            timestamp: message.timestamp(),
            payload_hex: to_hex(message.payload()),
            text: message.text().filter(|text| is_printable(text)),
            frame_len,
        }
    }
}

/// Print a message that arrived from `direction`'s sender.
pub fn print_message(direction: Direction, message: &Message, format: OutputFormat) {
    emit(MessageOutput::new(direction, message, None), message, format);
}

/// Print an offline-decoded frame.
pub fn print_decoded(decoded: &Decoded, format: OutputFormat) {
    emit(
        MessageOutput::new(decoded.direction, &decoded.message, Some(decoded.frame_len)),
        &decoded.message,
        format,
    );
}

fn emit(out: MessageOutput<'_>, message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FROM", "KIND", "CATEGORY", "LEN", "PAYLOAD"])
                .add_row(vec![
                    out.direction.to_string(),
                    out.kind.to_string(),
                    out.category.to_string(),
                    out.len.to_string(),
                    payload_preview(&out),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let stamp = out
                .timestamp
                .map(|ms| format!(" t={ms}ms"))
                .unwrap_or_default();
            println!(
                "{} {} (0x{:02X}) [{}] len={}{} payload={}",
                out.direction,
                out.kind,
                out.tag,
                out.category,
                out.len,
                stamp,
                payload_preview(&out)
            );
        }
        OutputFormat::Raw => print_raw(message.payload()),
    }
}

#[derive(Serialize)]
struct StatsOutput {
    status: RunStatus,
    #[serde(flatten)]
    stats: LinkStatsSnapshot,
}

/// Print link counters after a session.
pub fn print_stats(status: RunStatus, stats: LinkStatsSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = StatsOutput { status, stats };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in stats_rows(&stats) {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let rows: Vec<String> = stats_rows(&stats)
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            println!("status={status:?} {}", rows.join(" "));
        }
        OutputFormat::Raw => {}
    }
}

fn stats_rows(stats: &LinkStatsSnapshot) -> [(&'static str, u64); 11] {
    [
        ("rx_frames", stats.rx_frames),
        ("rx_dropped", stats.rx_dropped),
        ("rx_errors", stats.rx_errors),
        ("noise_bytes", stats.noise_bytes),
        ("bad_kind", stats.bad_kind),
        ("bad_length", stats.bad_length),
        ("bad_checksum", stats.bad_checksum),
        ("tx_frames", stats.tx_frames),
        ("tx_bytes", stats.tx_bytes),
        ("tx_dropped", stats.tx_dropped),
        ("tx_errors", stats.tx_errors),
    ]
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Uppercase hex, one space between bytes.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{byte:02X}"));
    }
    out
}

fn payload_preview(out: &MessageOutput<'_>) -> String {
    match out.text {
        Some(text) => format!("{text:?}"),
        None => out.payload_hex.clone(),
    }
}

fn is_printable(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| !c.is_control() || c == '\n')
}
