use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use amfwire_codec::{AmfError, Codec, MessageReader};
use tracing::{debug, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{amf_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decoded, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let codec = Codec::with_config(args.config());
    let mut input = open_input(&args.input)?;

    if args.stream {
        return run_stream(input, codec, args.strict, format);
    }

    let mut data = Vec::new();
    input
        .read_to_end(&mut data)
        .map_err(|err| io_error("failed reading input", err))?;
    debug!(bytes = data.len(), "read input");

    let decoded = codec
        .deserialize(&data[..])
        .map_err(|err| amf_error("decode failed", err))?;
    print_decoded(&decoded, codec.mapper(), format);

    let leftover = decoded.leftover.as_ref().map_or(0, |rest| rest.len());
    finish(leftover, args.strict)
}

fn run_stream(
    input: Box<dyn Read>,
    codec: Codec,
    strict: bool,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut reader = MessageReader::with_codec(input, codec);
    loop {
        match reader.read_messages() {
            Ok(decoded) => {
                debug!(messages = decoded.values.len(), "decoded batch");
                print_decoded(&decoded, reader.codec().mapper(), format);
            }
            Err(AmfError::ConnectionClosed { pending }) => return finish(pending, strict),
            Err(err) => return Err(amf_error("decode failed", err)),
        }
    }
}

fn finish(leftover: usize, strict: bool) -> CliResult<i32> {
    if leftover == 0 {
        return Ok(SUCCESS);
    }
    if strict {
        return Err(CliError::new(
            DATA_INVALID,
            format!("input ends with an incomplete message ({leftover} bytes)"),
        ));
    }
    warn!(bytes = leftover, "input ends with an incomplete message");
    Ok(SUCCESS)
}

pub(crate) fn open_input(path: &Path) -> CliResult<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path)
        .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
    Ok(Box::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::USAGE;

    #[test]
    fn trailing_bytes_fail_only_when_strict() {
        assert_eq!(finish(0, true).unwrap(), SUCCESS);
        assert_eq!(finish(3, false).unwrap(), SUCCESS);
        assert_eq!(finish(3, true).unwrap_err().code, DATA_INVALID);
    }

    #[test]
    fn missing_input_is_usage_error() {
        let err = open_input(Path::new("/nonexistent/amfwire/input.amf"))
            .err()
            .expect("missing file should fail");
        assert_eq!(err.code, USAGE);
    }
}
