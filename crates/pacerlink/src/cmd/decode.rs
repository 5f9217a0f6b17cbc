use pacerlink_frame::{decode_exact, FrameFormat};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_decoded, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;
    let frame_format = FrameFormat {
        timestamp: args.timestamp,
        allow_empty: args.allow_empty,
    };
    let decoded =
        decode_exact(&bytes, frame_format).map_err(|err| frame_error("decode failed", err))?;
    print_decoded(&decoded, format);
    Ok(SUCCESS)
}
