use pacerlink_frame::{encode_frame, Direction, FrameFormat, Message, MAX_FRAME_LEN};

use crate::cmd::{resolve_payload, EncodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::to_hex;

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let frame = encode(&args)?;
    println!("{}", to_hex(&frame));
    Ok(SUCCESS)
}

fn encode(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    let payload = resolve_payload(&args.payload)?;
    let mut message =
        Message::new(args.kind, payload).map_err(|err| frame_error("invalid payload", err))?;
    if let Some(millis) = args.timestamp {
        message = message.with_timestamp(millis);
    }

    let direction = args
        .direction
        .map(Direction::from)
        .unwrap_or_else(|| args.kind.origin());
    let format = FrameFormat {
        timestamp: args.timestamp.is_some(),
        allow_empty: args.allow_empty,
    };

    let mut buf = [0u8; MAX_FRAME_LEN];
    let len = encode_frame(direction, &message, format, &mut buf)
        .map_err(|err| frame_error("encode failed", err))?;
    Ok(buf[..len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{DirectionArg, PayloadArgs};
    use crate::exit::DATA_INVALID;
    use pacerlink_frame::Kind;

    fn args(kind: Kind, hex: &str) -> EncodeArgs {
        EncodeArgs {
            kind,
            payload: PayloadArgs {
                hex: Some(hex.to_string()),
                text: None,
            },
            direction: None,
            timestamp: None,
            allow_empty: false,
        }
    }

    #[test]
    fn direction_follows_kind_origin() {
        let frame = encode(&args(Kind::McuAck, "01 02 03")).unwrap();
        assert_eq!(frame, vec![0x5A, 0x06, 0x03, 0x01, 0x02, 0x03, 0x55]);

        let frame = encode(&args(Kind::MotorCommand, "F4 01 0C FE")).unwrap();
        assert_eq!(frame[0], 0xA5);
        assert_eq!(frame.len(), 8);
    }

    #[test]
    fn direction_override() {
        let mut a = args(Kind::McuAck, "01");
        a.direction = Some(DirectionArg::Host);
        assert_eq!(encode(&a).unwrap()[0], 0xA5);
    }

    #[test]
    fn timestamp_widens_header() {
        let mut a = args(Kind::TelemetryBattery, "2C 01");
        a.timestamp = Some(0x0102_0304);
        let frame = encode(&a).unwrap();
        assert_eq!(&frame[2..6], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(frame[6], 2);
        assert_eq!(frame.len(), 10);
    }

    #[test]
    fn empty_payload_needs_flag() {
        let mut a = args(Kind::HostAck, "");
        assert_eq!(encode(&a).unwrap_err().code, DATA_INVALID);
        a.allow_empty = true;
        assert_eq!(encode(&a).unwrap(), {
            let mut want = vec![0xA5, 0x0E, 0x00];
            want.push(pacerlink_frame::crc8(&want));
            want
        });
    }
}
