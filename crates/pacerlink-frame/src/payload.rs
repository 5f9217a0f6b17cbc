//! Typed views over common payloads.

use crate::codec::{Message, MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::kind::Kind;

/// Raw accelerometer and gyroscope reading, little-endian `i16` per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImuSample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

impl ImuSample {
    pub const LEN: usize = 12;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        for (i, value) in self.accel.iter().chain(self.gyro.iter()).enumerate() {
            out[i * 2..i * 2 + 2].copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(FrameError::UnexpectedPayload {
                kind: Kind::TelemetryImu,
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let axis = |i: usize| i16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
        Ok(Self {
            accel: [axis(0), axis(1), axis(2)],
            gyro: [axis(3), axis(4), axis(5)],
        })
    }

    pub fn from_message(message: &Message) -> Result<Self> {
        Self::from_bytes(message.payload())
    }

    pub fn into_message(self) -> Result<Message> {
        Message::new(Kind::TelemetryImu, self.to_bytes().to_vec())
    }
}

/// Signed duty cycle for the left and right motors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorDuty {
    pub left: i16,
    pub right: i16,
}

impl MotorDuty {
    pub const LEN: usize = 4;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let [l0, l1] = self.left.to_le_bytes();
        let [r0, r1] = self.right.to_le_bytes();
        [l0, l1, r0, r1]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [l0, l1, r0, r1] => Ok(Self {
                left: i16::from_le_bytes([*l0, *l1]),
                right: i16::from_le_bytes([*r0, *r1]),
            }),
            _ => Err(FrameError::UnexpectedPayload {
                kind: Kind::MotorCommand,
                expected: Self::LEN,
                actual: bytes.len(),
            }),
        }
    }

    pub fn from_message(message: &Message) -> Result<Self> {
        Self::from_bytes(message.payload())
    }

    pub fn into_message(self) -> Result<Message> {
        Message::new(Kind::MotorCommand, self.to_bytes().to_vec())
    }
}

/// A debug text message, truncated to [`MAX_PAYLOAD`] bytes on a character
/// boundary.
pub fn debug_text(text: &str) -> Message {
    let mut end = text.len().min(MAX_PAYLOAD);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    Message::bounded(Kind::McuDebug, text[..end].as_bytes().to_vec().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imu_layout() {
        let sample = ImuSample {
            accel: [1, -1, 256],
            gyro: [0, i16::MAX, i16::MIN],
        };
        let bytes = sample.to_bytes();
        assert_eq!(&bytes[..6], &[0x01, 0x00, 0xFF, 0xFF, 0x00, 0x01]);
        assert_eq!(ImuSample::from_bytes(&bytes).unwrap(), sample);

        let msg = sample.into_message().unwrap();
        assert_eq!(msg.kind(), Kind::TelemetryImu);
        assert_eq!(ImuSample::from_message(&msg).unwrap(), sample);
    }

    #[test]
    fn imu_wrong_size() {
        assert!(matches!(
            ImuSample::from_bytes(&[0u8; 11]),
            Err(FrameError::UnexpectedPayload {
                expected: 12,
                actual: 11,
                ..
            })
        ));
    }

    #[test]
    fn motor_duty_layout() {
        let duty = MotorDuty {
            left: 500,
            right: -500,
        };
        assert_eq!(duty.to_bytes(), [0xF4, 0x01, 0x0C, 0xFE]);
        let msg = duty.into_message().unwrap();
        assert_eq!(MotorDuty::from_message(&msg).unwrap(), duty);
        assert!(MotorDuty::from_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn debug_text_truncates_on_char_boundary() {
        let short = debug_text("battery low");
        assert_eq!(short.kind(), Kind::McuDebug);
        assert_eq!(short.text(), Some("battery low"));

        // 99 ASCII bytes followed by a two-byte character straddling the limit.
        let long = format!("{}é", "a".repeat(99));
        let msg = debug_text(&long);
        assert_eq!(msg.len(), 99);
        assert!(msg.text().is_some());

        assert_eq!(debug_text(&"x".repeat(300)).len(), MAX_PAYLOAD);
    }
}
