use simplenet_peer::{DEFAULT_HOST, DEFAULT_PORT};
use simplenet_wire::{DEFAULT_MAX_FIELD, DEFAULT_MAX_FRAME};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("simplenet {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: simplenet");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SIMPLENET_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("default_endpoint: {DEFAULT_HOST}:{DEFAULT_PORT}");
    println!("max_frame_size: {DEFAULT_MAX_FRAME}");
    println!("max_field_size: {DEFAULT_MAX_FIELD}");
    println!("features: cli=true");

    Ok(SUCCESS)
}
