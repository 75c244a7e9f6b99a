use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod stress;
pub mod version;

/// Payload size used when none is given.
pub const DEFAULT_BUFF_SIZE: usize = 2048;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode hex payload bytes into a single frame.
    Encode(EncodeArgs),
    /// Decode hex wire bytes (or a capture file) into payloads.
    Decode(DecodeArgs),
    /// Round-trip random payloads through one or more channels until failure.
    Stress(StressArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Stress(args) => stress::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Payload bytes in hex (e.g. "01 fe" or 0x7e).
    #[arg(required = true, value_name = "HEX")]
    pub bytes: Vec<String>,
    /// Maximum payload size; the escaped payload may use twice this.
    #[arg(long, short = 'b', default_value_t = DEFAULT_BUFF_SIZE)]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire bytes in hex (e.g. "7e 01 fe ...").
    #[arg(value_name = "HEX", required_unless_present = "file", conflicts_with = "file")]
    pub bytes: Vec<String>,
    /// Read wire bytes from a file instead.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
    /// Maximum payload size accepted by the decoder.
    #[arg(long, short = 'b', default_value_t = DEFAULT_BUFF_SIZE)]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
pub struct StressArgs {
    /// Payload size for every iteration (also the channel's maximum payload size).
    #[arg(long, short = 'b', default_value_t = DEFAULT_BUFF_SIZE)]
    pub size: usize,
    /// Number of iterations. 0 runs until failure.
    #[arg(long, short = 'i', default_value_t = 10_000)]
    pub iterations: u64,
    /// Number of channels fed in lockstep.
    #[arg(long, short = 'n', default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub channels: u16,
    /// RNG seed. Random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse hex byte tokens. Each argument may hold several whitespace or
/// comma separated tokens, with or without a `0x` prefix.
pub fn parse_hex_bytes(args: &[String]) -> CliResult<Vec<u8>> {
    let mut bytes = Vec::new();
    for token in args
        .iter()
        .flat_map(|arg| arg.split(|c: char| c.is_whitespace() || c == ','))
        .filter(|token| !token.is_empty())
    {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        let byte = u8::from_str_radix(digits, 16)
            .map_err(|_| CliError::new(USAGE, format!("invalid hex byte: {token:?}")))?;
        bytes.push(byte);
    }
    Ok(bytes)
}
