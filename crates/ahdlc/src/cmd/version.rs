use ahdlc_frame::{DEFAULT_MAX_CHANNELS, DEFAULT_MAX_PAYLOAD, FRAMING_OVERHEAD};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ahdlc {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ahdlc");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("AHDLC_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: async={}, cli=true", cfg!(feature = "async"));
    println!("max_channels: {DEFAULT_MAX_CHANNELS}");
    println!("default_max_payload: {DEFAULT_MAX_PAYLOAD}");
    println!("framing_overhead: {FRAMING_OVERHEAD}");

    Ok(SUCCESS)
}
