use ahdlc_frame::{Channel, FrameConfig};
use tracing::debug;

use crate::cmd::{parse_hex_bytes, EncodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{hex, print_encode, EncodeOutput, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = parse_hex_bytes(&args.bytes)?;
    let mut channel = Channel::new(FrameConfig::with_max_payload(args.max_payload))
        .map_err(|err| frame_error("invalid configuration", err))?;

    let frame = channel
        .encode(&payload)
        .map_err(|err| frame_error("encode failed", err))?;
    debug!(
        payload_size = payload.len(),
        frame_size = frame.len(),
        "encoded frame"
    );

    let out = EncodeOutput {
        payload_size: payload.len(),
        frame_size: frame.len(),
        payload: hex(&payload),
        frame: hex(&frame),
    };
    print_encode(&out, format);
    Ok(SUCCESS)
}
