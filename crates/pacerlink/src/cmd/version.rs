use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("pacerlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: pacerlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("PACERLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "profile: {}",
        option_env!("PACERLINK_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "git_hash: {}",
        option_env!("PACERLINK_GIT_HASH").unwrap_or("unknown")
    );
    println!(
        "protocol: max_payload={} max_frame={} crc=crc8-opensafety",
        pacerlink_frame::MAX_PAYLOAD,
        pacerlink_frame::MAX_FRAME_LEN
    );
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}
