use std::io::{IsTerminal, Write};

use amfwire_codec::{ClassMapper, Decoded, Graph, Value};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::json::to_json;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DecodedOutput<'a> {
    schema_id: &'a str,
    messages: Vec<MessageOutput>,
    consumed: usize,
    leftover_bytes: usize,
}

#[derive(Serialize)]
struct MessageOutput {
    index: usize,
    kind: &'static str,
    value: serde_json::Value,
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    schema_id: &'a str,
    size: usize,
    hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
}

pub fn print_decoded(decoded: &Decoded, mapper: &ClassMapper, format: OutputFormat) {
    let messages: Vec<MessageOutput> = decoded
        .values
        .iter()
        .enumerate()
        .map(|(index, value)| MessageOutput {
            index,
            kind: value_kind(&decoded.graph, value),
            value: to_json(&decoded.graph, mapper, value),
        })
        .collect();
    let leftover_bytes = decoded.leftover.as_ref().map_or(0, |rest| rest.len());

    match format {
        OutputFormat::Json => {
            let out = DecodedOutput {
                schema_id: "https://schemas.3leaps.dev/amfwire/cli/v1/decoded.schema.json",
                messages,
                consumed: decoded.consumed,
                leftover_bytes,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "TYPE", "VALUE"]);
            for message in &messages {
                table.add_row(vec![
                    message.index.to_string(),
                    message.kind.to_string(),
                    message.value.to_string(),
                ]);
            }
            println!("{table}");
            if leftover_bytes > 0 {
                println!("leftover: {leftover_bytes} bytes (incomplete message)");
            }
        }
        OutputFormat::Pretty => {
            for message in &messages {
                println!(
                    "message {} ({}):\n{}",
                    message.index,
                    message.kind,
                    serde_json::to_string_pretty(&message.value)
                        .unwrap_or_else(|_| message.value.to_string())
                );
            }
            println!(
                "consumed={} leftover={} messages={}",
                decoded.consumed,
                leftover_bytes,
                messages.len()
            );
        }
        OutputFormat::Raw => {
            for message in &messages {
                println!("{}", message.value);
            }
        }
    }
}

pub fn print_encoded(bytes: &[u8], path: Option<&str>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                schema_id: "https://schemas.3leaps.dev/amfwire/cli/v1/encoded.schema.json",
                size: bytes.len(),
                hex: hex::encode(bytes),
                path,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SIZE", "PATH", "HEX"])
                .add_row(vec![
                    bytes.len().to_string(),
                    path.unwrap_or("-").to_string(),
                    hex::encode(bytes),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (row, chunk) in bytes.chunks(16).enumerate() {
                let cells: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
                println!("{:08x}  {}", row * 16, cells.join(" "));
            }
            println!("size={} path={}", bytes.len(), path.unwrap_or("-"));
        }
        OutputFormat::Raw => {
            if path.is_none() {
                print_raw(bytes);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn value_kind(graph: &Graph, value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Integer(_) => "integer",
        Value::Double(_) => "double",
        Value::String(_) => "string",
        Value::Node(id) => graph.get(*id).map_or("dangling", |node| node.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amfwire_codec::{Date, Properties};

    #[test]
    fn kinds_cover_scalars_and_nodes() {
        let mut graph = Graph::new();
        let date = graph.date(Date::from_millis(0.0));
        let object = graph.object(Properties::new());

        assert_eq!(value_kind(&graph, &Value::Integer(1)), "integer");
        assert_eq!(value_kind(&graph, &Value::from("x")), "string");
        assert_eq!(value_kind(&graph, &date), "date");
        assert_eq!(value_kind(&graph, &object), "object");
    }
}
