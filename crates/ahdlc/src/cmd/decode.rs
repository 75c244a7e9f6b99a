use ahdlc_frame::{Channel, FrameConfig, FrameError, FrameReader};
use tracing::{debug, info};

use crate::cmd::{parse_hex_bytes, DecodeArgs};
use crate::exit::{frame_error, io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decode, DecodeOutput, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = FrameConfig::with_max_payload(args.max_payload);

    let out = match &args.file {
        Some(path) => {
            let wire = std::fs::read(path).map_err(|err| io_error("read failed", err))?;
            decode_stream(&wire, config)?
        }
        None => {
            let wire = parse_hex_bytes(&args.bytes)?;
            decode_bytes(&wire, config)?
        }
    };

    print_decode(&out, format);
    if out.frames.is_empty() {
        info!("no valid frame in input");
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

/// Feed wire bytes one at a time, collecting every frame completed along the way.
fn decode_bytes(wire: &[u8], config: FrameConfig) -> CliResult<DecodeOutput> {
    let mut channel =
        Channel::new(config).map_err(|err| frame_error("invalid configuration", err))?;
    let mut frames = Vec::new();

    for &byte in wire {
        channel
            .feed(&[byte])
            .map_err(|err| frame_error("feed failed", err))?;
        if let Some(payload) = channel.try_decode() {
            debug!(size = payload.len(), "decoded frame");
            frames.push(payload.to_vec());
        }
    }

    Ok(DecodeOutput::new(
        wire.len(),
        &frames,
        channel.stats(),
        channel.last_diagnostic(),
    ))
}

/// Pull frames through a [`FrameReader`] until the input runs out.
fn decode_stream(wire: &[u8], config: FrameConfig) -> CliResult<DecodeOutput> {
    let mut reader = FrameReader::with_config(wire, config)
        .map_err(|err| frame_error("invalid configuration", err))?;
    let mut frames = Vec::new();

    loop {
        match reader.read_frame() {
            Ok(payload) => {
                debug!(size = payload.len(), "decoded frame");
                frames.push(payload.to_vec());
            }
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        }
    }

    let channel = reader.channel();
    Ok(DecodeOutput::new(
        wire.len(),
        &frames,
        channel.stats(),
        channel.last_diagnostic(),
    ))
}
