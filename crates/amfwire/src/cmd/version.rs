use amfwire_codec::{CodecConfig, DEFAULT_ALIASES};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("amfwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let defaults = CodecConfig::default();
    println!("name: amfwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("AMFWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("AMFWIRE_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: async={}, cli=true", cfg!(feature = "async"));
    println!(
        "defaults: sort_dynamic_properties={}, use_array_collection={}, extended_types={}",
        defaults.sort_dynamic_properties, defaults.use_array_collection, defaults.extended_types,
    );
    println!(
        "limits: max_message_size={}, max_depth={}",
        defaults.max_message_size, defaults.max_depth
    );
    for (local, remote) in DEFAULT_ALIASES {
        println!("alias: {local} -> {remote}");
    }

    Ok(SUCCESS)
}
