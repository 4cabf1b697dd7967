use std::fs;
use std::io::Read;
use std::path::Path;

use amfwire_codec::{Codec, Graph, MessageWriter};
use tracing::debug;

use crate::cmd::decode::open_input;
use crate::cmd::EncodeArgs;
use crate::exit::{amf_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::json::from_json;
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let json = resolve_input(&args)?;
    let codec = Codec::with_config(args.config());
    let bytes = encode(&codec, &json, args.each)?;
    debug!(bytes = bytes.len(), "encoded");

    let path = match &args.out {
        Some(path) => {
            fs::write(path, &bytes)
                .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
            Some(path.display().to_string())
        }
        None => None,
    };
    print_encoded(&bytes, path.as_deref(), format);

    Ok(SUCCESS)
}

/// Encode one message, or one per element of a top-level array when `each` is set.
fn encode(codec: &Codec, json: &serde_json::Value, each: bool) -> CliResult<Vec<u8>> {
    let messages = match json {
        serde_json::Value::Array(items) if each => items.as_slice(),
        other => std::slice::from_ref(other),
    };

    let mut writer = MessageWriter::with_codec(Vec::new(), codec.clone());
    for message in messages {
        let mut graph = Graph::new();
        let value = from_json(&mut graph, codec.mapper(), message)?;
        writer
            .write_message(&graph, &value)
            .map_err(|err| amf_error("encode failed", err))?;
    }
    Ok(writer.into_inner())
}

fn resolve_input(args: &EncodeArgs) -> CliResult<serde_json::Value> {
    let text = match (&args.json, &args.file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => read_text(path)?,
        (None, None) => read_text(Path::new("-"))?,
    };
    serde_json::from_str(&text)
        .map_err(|err| CliError::new(DATA_INVALID, format!("input is not valid JSON: {err}")))
}

fn read_text(path: &Path) -> CliResult<String> {
    let mut text = String::new();
    open_input(path)?
        .read_to_string(&mut text)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    Ok(text)
}
