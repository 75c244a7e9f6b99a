use std::time::Instant;

use ahdlc_frame::{ChannelId, FrameConfig, Registry};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info};

use crate::cmd::StressArgs;
use crate::exit::{frame_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_stress, OutputFormat, StressOutput};

const PROGRESS_EVERY: u64 = 1000;

pub fn run(args: StressArgs, format: OutputFormat) -> CliResult<i32> {
    let out = stress(&args)?;
    print_stress(&out, format);
    Ok(if out.passed { SUCCESS } else { FAILURE })
}

fn stress(args: &StressArgs) -> CliResult<StressOutput> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let channels = usize::from(args.channels);

    let mut config = FrameConfig::with_max_payload(args.size);
    config.max_queued_bytes = config.max_queued_bytes.max(config.encode_capacity());

    let mut registry = Registry::new();
    let ids = allocate_channels(&mut registry, config, channels)?;
    info!(
        channels,
        size = args.size,
        iterations = args.iterations,
        seed,
        "stress run started"
    );

    let start = Instant::now();
    let mut payload = vec![0u8; args.size];
    let mut count = 0u64;
    let mut passed = true;

    while args.iterations == 0 || count < args.iterations {
        rng.fill_bytes(&mut payload);
        if let Err(reason) = round_trip(&mut registry, &ids, &payload)? {
            error!(iteration = count, seed, %reason, "round trip failed");
            passed = false;
            break;
        }
        count += 1;
        if count % PROGRESS_EVERY == 0 {
            debug!(count, "iterations passed");
        }
    }

    Ok(StressOutput {
        passed,
        iterations: count,
        channels,
        payload_size: args.size,
        seed,
        elapsed_ms: start.elapsed().as_millis(),
    })
}

/// Allocate and release every channel once, check that nothing is left to
/// release, then allocate the working set.
fn allocate_channels(
    registry: &mut Registry,
    config: FrameConfig,
    channels: usize,
) -> CliResult<Vec<ChannelId>> {
    for _ in 0..channels {
        let id = registry
            .allocate_with_config(config)
            .map_err(|err| frame_error("allocate failed", err))?;
        registry
            .release(id)
            .map_err(|err| frame_error("release failed", err))?;
    }

    let leftover = registry.release_all();
    if leftover != 0 {
        return Err(CliError::new(
            INTERNAL,
            format!("release_all found {leftover} channels after individual releases"),
        ));
    }

    (0..channels)
        .map(|_| {
            registry
                .allocate_with_config(config)
                .map_err(|err| frame_error("allocate failed", err))
        })
        .collect()
}

/// One iteration: the frame split in halves, then the whole frame, on every channel.
///
/// The outer `Result` carries registry errors; the inner one a round-trip mismatch.
fn round_trip(
    registry: &mut Registry,
    ids: &[ChannelId],
    payload: &[u8],
) -> CliResult<Result<(), String>> {
    let Some(&first) = ids.first() else {
        return Ok(Ok(()));
    };
    let wire = registry
        .encode(first, payload)
        .map_err(|err| frame_error("encode failed", err))?;

    if wire.len() >= 2 {
        let (head, tail) = wire.split_at(wire.len() / 2);
        feed_all(registry, ids, head)?;
        for &id in ids {
            if decode(registry, id)?.is_some() {
                return Ok(Err(format!("channel {id} produced a frame from half a frame")));
            }
        }
        feed_all(registry, ids, tail)?;
        if let Err(reason) = expect_all(registry, ids, payload)? {
            return Ok(Err(format!("split frame: {reason}")));
        }
    }

    feed_all(registry, ids, &wire)?;
    if let Err(reason) = expect_all(registry, ids, payload)? {
        return Ok(Err(format!("whole frame: {reason}")));
    }
    Ok(Ok(()))
}

fn feed_all(registry: &mut Registry, ids: &[ChannelId], bytes: &[u8]) -> CliResult<()> {
    for &id in ids {
        let accepted = registry
            .feed(id, bytes)
            .map_err(|err| frame_error("feed failed", err))?;
        if accepted != bytes.len() {
            return Err(CliError::new(
                INTERNAL,
                format!("channel {id} accepted {accepted} of {} bytes", bytes.len()),
            ));
        }
    }
    Ok(())
}

fn decode(registry: &mut Registry, id: ChannelId) -> CliResult<Option<Vec<u8>>> {
    registry
        .try_decode(id)
        .map(|frame| frame.map(|f| f.payload.to_vec()))
        .map_err(|err| frame_error("decode failed", err))
}

fn expect_all(
    registry: &mut Registry,
    ids: &[ChannelId],
    payload: &[u8],
) -> CliResult<Result<(), String>> {
    for &id in ids {
        match decode(registry, id)? {
            Some(decoded) if decoded == payload => {}
            Some(decoded) => {
                return Ok(Err(format!(
                    "channel {id} decoded {} bytes that differ from the {} sent",
                    decoded.len(),
                    payload.len()
                )))
            }
            None => {
                let diag = registry
                    .last_diagnostic(id)
                    .map_err(|err| frame_error("decode failed", err))?;
                return Ok(Err(match diag {
                    Some(diag) => format!("channel {id} produced no frame ({diag})"),
                    None => format!("channel {id} produced no frame"),
                }));
            }
        }
    }
    Ok(Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::USAGE;

    fn args(size: usize, iterations: u64, channels: u16) -> StressArgs {
        StressArgs {
            size,
            iterations,
            channels,
            seed: Some(7),
        }
    }

    #[test]
    fn short_run_passes_on_every_channel() {
        let out = stress(&args(128, 50, 3)).expect("stress should run");
        assert!(out.passed);
        assert_eq!(out.iterations, 50);
        assert_eq!(out.channels, 3);
        assert_eq!(out.seed, 7);
    }

    #[test]
    fn single_byte_payloads_pass() {
        let out = stress(&args(1, 200, 1)).expect("stress should run");
        assert!(out.passed);
    }

    #[test]
    fn too_many_channels_is_usage_error() {
        let err = stress(&args(16, 1, 6)).expect_err("registry holds five channels");
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn zero_size_is_usage_error() {
        let err = stress(&args(0, 1, 1)).expect_err("zero-size channels are invalid");
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn handles_are_fresh_after_warmup_release() {
        let mut registry = Registry::new();
        let ids = allocate_channels(&mut registry, FrameConfig::with_max_payload(8), 2)
            .expect("allocation should succeed");
        assert_eq!(registry.len(), 2);
        // Both warmup allocations reused slot 0.
        assert_eq!((ids[0].index(), ids[0].generation()), (0, 3));
        assert_eq!((ids[1].index(), ids[1].generation()), (1, 1));
    }
}
