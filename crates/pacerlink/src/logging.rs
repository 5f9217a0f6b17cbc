use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Overrides `--log-level` with full filter directives when set.
pub const LOG_ENV: &str = "PACERLINK_LOG";

/// Crates whose events the CLI shows; everything else stays off.
const LINK_TARGETS: [&str; 4] = [
    "pacerlink",
    "pacerlink_channel",
    "pacerlink_frame",
    "pacerlink_transport",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Filter for `level` across the link crates, or `directives` if they parse.
pub fn log_filter(level: LogLevel, directives: Option<&str>) -> EnvFilter {
    if let Some(directives) = directives.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    if level == LogLevel::Off {
        return EnvFilter::new("off");
    }
    let mut spec = String::from("off");
    for target in LINK_TARGETS {
        spec.push(',');
        spec.push_str(target);
        spec.push('=');
        spec.push_str(level.as_str());
    }
    EnvFilter::new(spec)
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
///
/// Targets are printed so receive-worker events (`pacerlink_channel`) can be
/// told apart from parser events (`pacerlink_frame`).
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let directives = std::env::var(LOG_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(level, directives.as_deref()))
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
