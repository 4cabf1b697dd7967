use clap::{Args, Subcommand};
use std::path::PathBuf;

use amfwire_codec::{CodecConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_MESSAGE};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode AMF3 messages and print them as JSON.
    Decode(DecodeArgs),
    /// Encode a JSON value as an AMF3 message.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Input file, or `-` for stdin.
    pub input: PathBuf,
    /// Treat a trailing incomplete message as an error.
    #[arg(long)]
    pub strict: bool,
    /// Read incrementally and print each batch of complete messages as it arrives.
    #[arg(long)]
    pub stream: bool,
    /// Maximum bytes buffered for one message in --stream mode.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_MESSAGE)]
    pub max_size: usize,
    /// Deepest value nesting accepted before the input is rejected.
    #[arg(long, value_name = "LEVELS", default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
    /// Reject XML and vector markers.
    #[arg(long)]
    pub no_extended: bool,
}

impl DecodeArgs {
    pub fn config(&self) -> CodecConfig {
        CodecConfig {
            extended_types: !self.no_extended,
            max_message_size: self.max_size,
            max_depth: self.max_depth,
            ..CodecConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON value to encode.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the JSON value from a file (`-` for stdin). Default: stdin.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Write the encoded bytes to a file instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub out: Option<PathBuf>,
    /// Treat a top-level JSON array as a sequence of messages.
    #[arg(long)]
    pub each: bool,
    /// Wrap plain arrays in flex.messaging.io.ArrayCollection.
    #[arg(long)]
    pub array_collection: bool,
    /// Keep dynamic properties in input order instead of sorting by name.
    #[arg(long)]
    pub unsorted: bool,
}

impl EncodeArgs {
    pub fn config(&self) -> CodecConfig {
        CodecConfig {
            use_array_collection: self.array_collection,
            sort_dynamic_properties: !self.unsorted,
            ..CodecConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
