//! Packet kinds, event categories and link directions.
//!
//! Tags 0x00-0x07 originate on the microcontroller, 0x08-0x0E on the host.
//! Any other tag is rejected by the codec and the stream parser.

use std::fmt;
use std::str::FromStr;

/// SYNC byte of frames sent by the host to the microcontroller.
pub const HOST_SYNC: u8 = 0xA5;

/// SYNC byte of frames sent by the microcontroller to the host.
pub const MCU_SYNC: u8 = 0x5A;

/// Which way a frame travels. Determines its SYNC byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    HostToMcu,
    McuToHost,
}

impl Direction {
    /// SYNC byte for frames travelling this way.
    pub const fn sync(self) -> u8 {
        match self {
            Direction::HostToMcu => HOST_SYNC,
            Direction::McuToHost => MCU_SYNC,
        }
    }

    /// Direction announced by a SYNC byte.
    pub const fn from_sync(byte: u8) -> Option<Self> {
        match byte {
            HOST_SYNC => Some(Direction::HostToMcu),
            MCU_SYNC => Some(Direction::McuToHost),
            _ => None,
        }
    }

    /// The other direction.
    pub const fn reverse(self) -> Self {
        match self {
            Direction::HostToMcu => Direction::McuToHost,
            Direction::McuToHost => Direction::HostToMcu,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Direction::HostToMcu => "host-to-mcu",
            Direction::McuToHost => "mcu-to-host",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What "new data" a notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    None,
    Telemetry,
    Status,
    Ack,
    Debug,
    /// Motion commands (seen by the MCU).
    Command,
    /// Tuning and sensor configuration (seen by the MCU).
    Config,
    /// Host status and acknowledgements (seen by the MCU).
    Host,
}

impl Category {
    pub const fn name(self) -> &'static str {
        match self {
            Category::None => "none",
            Category::Telemetry => "telemetry",
            Category::Status => "status",
            Category::Ack => "ack",
            Category::Debug => "debug",
            Category::Command => "command",
            Category::Config => "config",
            Category::Host => "host",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Packet kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Kind {
    TelemetryImu = 0x00,
    TelemetryUltrasonic = 0x01,
    TelemetryEncoder = 0x02,
    TelemetryPid = 0x03,
    TelemetryBattery = 0x04,
    McuStatus = 0x05,
    McuAck = 0x06,
    McuDebug = 0x07,
    MotorCommand = 0x08,
    NavCommand = 0x09,
    PidSpeedConfig = 0x0A,
    PidLaneConfig = 0x0B,
    SensorRateConfig = 0x0C,
    HostStatus = 0x0D,
    HostAck = 0x0E,
}

impl Kind {
    /// Every kind, in tag order.
    pub const ALL: [Kind; 15] = [
        Kind::TelemetryImu,
        Kind::TelemetryUltrasonic,
        Kind::TelemetryEncoder,
        Kind::TelemetryPid,
        Kind::TelemetryBattery,
        Kind::McuStatus,
        Kind::McuAck,
        Kind::McuDebug,
        Kind::MotorCommand,
        Kind::NavCommand,
        Kind::PidSpeedConfig,
        Kind::PidLaneConfig,
        Kind::SensorRateConfig,
        Kind::HostStatus,
        Kind::HostAck,
    ];

    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        if (tag as usize) < Self::ALL.len() {
            Some(Self::ALL[tag as usize])
        } else {
            None
        }
    }

    /// Event category raised when a message of this kind is received.
    pub const fn category(self) -> Category {
        match self {
            Kind::TelemetryImu
            | Kind::TelemetryUltrasonic
            | Kind::TelemetryEncoder
            | Kind::TelemetryPid
            | Kind::TelemetryBattery => Category::Telemetry,
            Kind::McuStatus => Category::Status,
            Kind::McuAck => Category::Ack,
            Kind::McuDebug => Category::Debug,
            Kind::MotorCommand | Kind::NavCommand => Category::Command,
            Kind::PidSpeedConfig | Kind::PidLaneConfig | Kind::SensorRateConfig => {
                Category::Config
            }
            Kind::HostStatus | Kind::HostAck => Category::Host,
        }
    }

    /// Side of the link that normally emits this kind.
    pub const fn origin(self) -> Direction {
        if (self as u8) < Kind::MotorCommand as u8 {
            Direction::McuToHost
        } else {
            Direction::HostToMcu
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Kind::TelemetryImu => "telemetry-imu",
            Kind::TelemetryUltrasonic => "telemetry-ultrasonic",
            Kind::TelemetryEncoder => "telemetry-encoder",
            Kind::TelemetryPid => "telemetry-pid",
            Kind::TelemetryBattery => "telemetry-battery",
            Kind::McuStatus => "mcu-status",
            Kind::McuAck => "mcu-ack",
            Kind::McuDebug => "mcu-debug",
            Kind::MotorCommand => "motor-command",
            Kind::NavCommand => "nav-command",
            Kind::PidSpeedConfig => "pid-speed-config",
            Kind::PidLaneConfig => "pid-lane-config",
            Kind::SensorRateConfig => "sensor-rate-config",
            Kind::HostStatus => "host-status",
            Kind::HostAck => "host-ack",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Kind {
    type Error = crate::error::FrameError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Kind::from_tag(tag).ok_or(crate::error::FrameError::BadKind(tag))
    }
}

/// Error returned when parsing an unknown kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown packet kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Kind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_bytes_differ() {
        assert_ne!(HOST_SYNC, MCU_SYNC);
        assert_eq!(Direction::from_sync(HOST_SYNC), Some(Direction::HostToMcu));
        assert_eq!(Direction::from_sync(MCU_SYNC), Some(Direction::McuToHost));
        assert_eq!(Direction::from_sync(0x00), None);
    }

    #[test]
    fn tags_round_trip() {
        for (i, kind) in Kind::ALL.iter().enumerate() {
            assert_eq!(kind.tag() as usize, i);
            assert_eq!(Kind::from_tag(kind.tag()), Some(*kind));
        }
        assert_eq!(Kind::from_tag(0x0F), None);
        assert_eq!(Kind::from_tag(0xFF), None);
    }

    #[test]
    fn categories_follow_origin() {
        assert_eq!(Kind::TelemetryBattery.category(), Category::Telemetry);
        assert_eq!(Kind::McuAck.category(), Category::Ack);
        assert_eq!(Kind::McuDebug.category(), Category::Debug);
        assert_eq!(Kind::MotorCommand.category(), Category::Command);
        assert_eq!(Kind::SensorRateConfig.category(), Category::Config);
        assert_eq!(Kind::HostAck.category(), Category::Host);

        assert_eq!(Kind::McuStatus.origin(), Direction::McuToHost);
        assert_eq!(Kind::NavCommand.origin(), Direction::HostToMcu);
    }

    #[test]
    fn names_parse_back() {
        for kind in Kind::ALL {
            assert_eq!(kind.name().parse::<Kind>(), Ok(kind));
        }
        assert_eq!("MOTOR_COMMAND".parse::<Kind>(), Ok(Kind::MotorCommand));
        assert!("warp-drive".parse::<Kind>().is_err());
    }

    #[test]
    fn try_from_rejects_unknown_tag() {
        assert!(matches!(
            Kind::try_from(0x42),
            Err(crate::error::FrameError::BadKind(0x42))
        ));
    }
}
